//! JSON shapes exchanged with the front-desk clients.

pub mod display;
pub mod event;
pub mod ticket;
pub mod window;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub use self::{event::Event, ticket::Ticket, window::Window};

/// Body of every failed request.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Error {
    pub error: String,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct Ack {
    pub ok: bool,
}

/// Milliseconds since the Unix epoch, as the clients expect timestamps.
pub(crate) fn millis(at: OffsetDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}
