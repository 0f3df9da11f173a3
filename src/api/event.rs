use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::{api, queue};

pub use crate::queue::ticket::{self, Service};

/// Notification pushed to every connected display.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(content = "payload", tag = "type")]
pub enum Event {
    #[serde(rename = "init")]
    Init(Snapshot),
    #[serde(rename = "window.updated")]
    WindowUpdated(api::Window),
    #[serde(rename = "ticket.created")]
    TicketCreated(api::Ticket),
    #[serde(rename = "ticket.updated")]
    TicketUpdated(api::Ticket),
    #[serde(rename = "display.updated")]
    DisplayUpdated(Vec<api::display::Row>),
}

impl Event {
    /// Name the event is sent under on the event stream.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init(_) => "init",
            Self::WindowUpdated(_) => "window.updated",
            Self::TicketCreated(_) => "ticket.created",
            Self::TicketUpdated(_) => "ticket.updated",
            Self::DisplayUpdated(_) => "display.updated",
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Snapshot {
    pub windows: Vec<api::Window>,
    pub services: BTreeMap<Service, QueueState>,
    pub tickets: HashMap<ticket::Id, api::Ticket>,
    pub display: Vec<api::display::Row>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueState {
    pub next_number: u32,
    pub waiting_ids: Vec<ticket::Id>,
}

impl Snapshot {
    pub fn new(
        snapshot: &queue::Snapshot,
        display: &[queue::DisplayRow],
    ) -> Self {
        Self {
            windows: snapshot.windows.iter().map(api::Window::from).collect(),
            services: snapshot
                .queues
                .iter()
                .map(|(service, queue)| {
                    let state = QueueState {
                        next_number: queue.next_number,
                        waiting_ids: queue.waiting.clone(),
                    };
                    (*service, state)
                })
                .collect(),
            tickets: snapshot
                .tickets
                .iter()
                .map(|t| (t.id, api::Ticket::from(t)))
                .collect(),
            display: api::display::rows(display),
        }
    }
}
