//! Ticket and window bookkeeping shared by every [`Store`] implementation.

pub mod estimate;
pub mod memory;
pub mod ticket;
pub mod window;

use std::collections::BTreeMap;

use async_trait::async_trait;
use derive_more::{Display, From};

pub use self::{
    estimate::Estimator,
    ticket::{Code, Service, Ticket},
    window::Window,
};

/// Storage of tickets, windows and per-service queues.
///
/// Every operation either applies its whole transition or leaves the state
/// untouched and returns an [`Error`].
#[async_trait]
pub trait Store: Send + Sync {
    async fn windows(&self) -> Result<Vec<Window>, Error>;

    /// Allocates the next number of the service and enqueues a new waiting
    /// ticket at the tail of its queue.
    async fn create_ticket(&self, new: ticket::New) -> Result<Ticket, Error>;

    /// Assigns the oldest waiting ticket of `service` to the window.
    ///
    /// Returns [`None`] without touching anything when the queue is empty.
    async fn call_next(
        &self,
        window: window::Id,
        service: Service,
    ) -> Result<Option<Assignment>, Error>;

    /// Returns the ticket the window is serving, changing nothing.
    async fn recall(&self, window: window::Id) -> Result<Ticket, Error>;

    async fn complete(&self, window: window::Id) -> Result<Assignment, Error>;

    async fn skip(&self, window: window::Id) -> Result<Assignment, Error>;

    async fn transfer(
        &self,
        source: window::Id,
        target: window::Id,
    ) -> Result<Transfer, Error>;

    async fn display_rows(&self) -> Result<Vec<DisplayRow>, Error>;

    async fn ticket_status(&self, code: Code) -> Result<TicketStatus, Error>;

    async fn snapshot(&self) -> Result<Snapshot, Error>;
}

#[derive(Debug, Display, From)]
pub enum Error {
    #[display("Window {_0} not found")]
    WindowNotFound(window::Id),

    #[display("Ticket {_0} not found")]
    TicketNotFound(String),

    #[display("No active ticket")]
    NoActiveTicket,

    #[display("Window {_0} is already serving a ticket")]
    WindowBusy(window::Id),

    #[display("Target window {_0} is already serving a ticket")]
    TargetBusy(window::Id),

    #[display("Cannot transfer a ticket to the window serving it")]
    SameWindow,

    #[from]
    #[display("Database error: {_0}")]
    Db(tokio_postgres::Error),
}

/// A window together with the ticket a transition just applied to.
#[derive(Clone, Debug)]
pub struct Assignment {
    pub window: Window,
    pub ticket: Ticket,
}

#[derive(Clone, Debug)]
pub struct Transfer {
    pub source: Window,
    pub target: Window,
    pub ticket: Ticket,
}

/// What a status board shows for one service.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DisplayRow {
    pub service: Service,
    pub now_serving: Option<(Code, window::Id)>,
    pub next: Option<Code>,
}

#[derive(Clone, Debug)]
pub struct TicketStatus {
    pub ticket: Ticket,

    /// 1-based place in the queue, for waiting tickets only.
    pub position: Option<usize>,

    pub estimated_wait_seconds: Option<u64>,
}

/// Full state a freshly connected subscriber starts from.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub windows: Vec<Window>,
    pub queues: BTreeMap<Service, QueueState>,

    /// Tickets that are waiting or being served.
    pub tickets: Vec<Ticket>,
}

#[derive(Clone, Debug, Default)]
pub struct QueueState {
    pub next_number: u32,
    pub waiting: Vec<ticket::Id>,
}
