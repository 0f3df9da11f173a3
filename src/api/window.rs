use serde::{Deserialize, Serialize};

use crate::{api, queue};

pub use crate::queue::{ticket, window::Id};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Window {
    pub id: Id,
    pub name: String,
    pub current_ticket_id: Option<ticket::Id>,
    pub busy: bool,
    pub updated_at: i64,
}

impl From<&queue::Window> for Window {
    fn from(window: &queue::Window) -> Self {
        Self {
            id: window.id,
            name: window.name.clone(),
            current_ticket_id: window.current_ticket,
            busy: window.busy,
            updated_at: api::millis(window.updated_at),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallNextInput {
    pub service: Option<String>,
}

/// Body of recall and skip requests.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasonInput {
    pub reason: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferInput {
    pub target_window_id: Option<Id>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CallNext {
    Called {
        window: Window,
        ticket: api::Ticket,
        display: Vec<api::display::Row>,
    },
    Empty {
        message: String,
    },
}

impl CallNext {
    pub const NO_TICKETS_WAITING: &'static str = "No tickets waiting";
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Recall {
    pub ok: bool,
    pub ticket: api::Ticket,
    pub display: Vec<api::display::Row>,
}

/// Outcome of completing or skipping a ticket.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Finished {
    pub ok: bool,
    pub ticket: api::Ticket,
    pub window: Window,
    pub display: Vec<api::display::Row>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Transferred {
    pub ok: bool,
    pub ticket: api::Ticket,
    pub source: Window,
    pub target: Window,
    pub display: Vec<api::display::Row>,
}
