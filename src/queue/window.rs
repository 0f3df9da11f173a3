use derive_more::Display;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::ticket;

#[derive(Clone, Debug)]
pub struct Window {
    pub id: Id,
    pub name: String,
    pub current_ticket: Option<ticket::Id>,
    pub busy: bool,
    pub updated_at: OffsetDateTime,
}

impl Window {
    pub fn idle(id: Id) -> Self {
        Self {
            id,
            name: format!("Window {id}"),
            current_ticket: None,
            busy: false,
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    pub(crate) fn assign(&mut self, ticket: ticket::Id) {
        self.current_ticket = Some(ticket);
        self.busy = true;
        self.updated_at = OffsetDateTime::now_utc();
    }

    pub(crate) fn release(&mut self) {
        self.current_ticket = None;
        self.busy = false;
        self.updated_at = OffsetDateTime::now_utc();
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
pub struct Id(pub i32);
