use serde::{Deserialize, Serialize};

use crate::queue;

pub use crate::queue::{
    ticket::{Id, Service, Status},
    window,
};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: Id,
    pub service: Service,
    pub number: u32,
    pub code: String,
    pub status: Status,
    pub window_id: Option<window::Id>,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub woreda: Option<String>,
}

impl From<&queue::Ticket> for Ticket {
    fn from(ticket: &queue::Ticket) -> Self {
        Self {
            id: ticket.id,
            service: ticket.service,
            number: ticket.number,
            code: ticket.code().to_string(),
            status: ticket.status,
            window_id: ticket.window,
            created_at: super::millis(ticket.created_at),
            started_at: ticket.started_at.map(super::millis),
            completed_at: ticket.completed_at.map(super::millis),
            notes: ticket.notes.clone(),
            owner_name: ticket.owner_name.clone(),
            woreda: ticket.locality.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInput {
    /// Unknown or missing services fall back to the first one.
    pub service: Option<String>,
    pub notes: Option<String>,
    pub owner_name: Option<String>,
    pub woreda: Option<String>,
}

impl From<CreateInput> for queue::ticket::New {
    fn from(input: CreateInput) -> Self {
        Self {
            service: Service::parse_or_default(input.service.as_deref()),
            notes: input.notes,
            owner_name: input.owner_name,
            locality: input.woreda,
        }
    }
}

/// Answer to a ticket status lookup.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lookup {
    pub ticket: Ticket,
    pub position_in_queue: Option<usize>,
    pub estimated_wait_seconds: Option<u64>,
}

impl From<&queue::TicketStatus> for Lookup {
    fn from(status: &queue::TicketStatus) -> Self {
        Self {
            ticket: Ticket::from(&status.ticket),
            position_in_queue: status.position,
            estimated_wait_seconds: status.estimated_wait_seconds,
        }
    }
}
