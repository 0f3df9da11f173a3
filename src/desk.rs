use std::sync::Arc;

use crate::{
    api,
    events::{Hub, Subscription},
    queue::{
        self, ticket, window, Assignment, Code, DisplayRow, Error, Service,
        Store, Ticket, TicketStatus, Transfer, Window,
    },
};

/// Front desk: applies queue transitions to a [`Store`] and announces them
/// to the connected displays.
#[derive(Clone)]
pub struct Desk {
    store: Arc<dyn Store>,
    hub: Hub,
}

/// Number of tickets [`Desk::seed`] creates for every service.
pub const SEED_TICKETS_PER_SERVICE: usize = 5;

impl Desk {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            hub: Hub::default(),
        }
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    pub async fn windows(&self) -> Result<Vec<Window>, Error> {
        self.store.windows().await
    }

    pub async fn create_ticket(
        &self,
        new: ticket::New,
    ) -> Result<Ticket, Error> {
        let ticket = self.store.create_ticket(new).await?;
        tracing::info!(code = %ticket.code(), "ticket created");

        self.hub
            .publish(api::Event::TicketCreated(api::Ticket::from(&ticket)));
        self.refresh_display().await?;
        Ok(ticket)
    }

    pub async fn call_next(
        &self,
        window: window::Id,
        service: Service,
    ) -> Result<Option<(Assignment, Vec<DisplayRow>)>, Error> {
        let Some(called) = self.store.call_next(window, service).await? else {
            tracing::info!(%window, %service, "no tickets waiting");
            return Ok(None);
        };
        tracing::info!(
            %window,
            code = %called.ticket.code(),
            "ticket called",
        );

        self.publish_assignment(&called);
        let display = self.refresh_display().await?;
        Ok(Some((called, display)))
    }

    /// Re-announces the ticket served at the window.
    pub async fn recall(
        &self,
        window: window::Id,
    ) -> Result<(Ticket, Vec<DisplayRow>), Error> {
        let ticket = self.store.recall(window).await?;
        tracing::info!(%window, code = %ticket.code(), "ticket recalled");

        let display = self.refresh_display().await?;
        Ok((ticket, display))
    }

    pub async fn complete(
        &self,
        window: window::Id,
    ) -> Result<(Assignment, Vec<DisplayRow>), Error> {
        let done = self.store.complete(window).await?;
        tracing::info!(%window, code = %done.ticket.code(), "ticket done");

        self.publish_assignment(&done);
        let display = self.refresh_display().await?;
        Ok((done, display))
    }

    pub async fn skip(
        &self,
        window: window::Id,
        reason: Option<&str>,
    ) -> Result<(Assignment, Vec<DisplayRow>), Error> {
        let skipped = self.store.skip(window).await?;
        tracing::info!(
            %window,
            code = %skipped.ticket.code(),
            reason,
            "ticket skipped",
        );

        self.publish_assignment(&skipped);
        let display = self.refresh_display().await?;
        Ok((skipped, display))
    }

    pub async fn transfer(
        &self,
        source: window::Id,
        target: window::Id,
    ) -> Result<(Transfer, Vec<DisplayRow>), Error> {
        let moved = self.store.transfer(source, target).await?;
        tracing::info!(
            %source,
            %target,
            code = %moved.ticket.code(),
            "ticket transferred",
        );

        self.publish_window(&moved.source);
        self.publish_window(&moved.target);
        self.publish_ticket(&moved.ticket);
        let display = self.refresh_display().await?;
        Ok((moved, display))
    }

    pub async fn display_rows(&self) -> Result<Vec<DisplayRow>, Error> {
        self.store.display_rows().await
    }

    pub async fn ticket_status(
        &self,
        code: Code,
    ) -> Result<TicketStatus, Error> {
        self.store.ticket_status(code).await
    }

    /// Fills every queue with demo tickets.
    pub async fn seed(&self) -> Result<(), Error> {
        for service in Service::ALL {
            for _ in 0..SEED_TICKETS_PER_SERVICE {
                let new = ticket::New {
                    service,
                    ..ticket::New::default()
                };
                let ticket = self.store.create_ticket(new).await?;
                self.hub.publish(api::Event::TicketCreated(
                    api::Ticket::from(&ticket),
                ));
            }
        }
        tracing::info!("queues seeded with demo tickets");

        self.refresh_display().await?;
        Ok(())
    }

    /// Registers a subscriber and builds the snapshot it starts from.
    ///
    /// The subscriber is registered first, so nothing published after the
    /// snapshot is taken can be missed.
    pub async fn subscribe(
        &self,
    ) -> Result<(api::Event, Subscription), Error> {
        let subscription = self.hub.subscribe();
        let snapshot = self.store.snapshot().await?;
        let display = self.store.display_rows().await?;
        let init = api::event::Snapshot::new(&snapshot, &display);
        Ok((api::Event::Init(init), subscription))
    }

    fn publish_assignment(&self, assignment: &Assignment) {
        self.publish_window(&assignment.window);
        self.publish_ticket(&assignment.ticket);
    }

    fn publish_window(&self, window: &Window) {
        self.hub
            .publish(api::Event::WindowUpdated(api::Window::from(window)));
    }

    fn publish_ticket(&self, ticket: &Ticket) {
        self.hub
            .publish(api::Event::TicketUpdated(api::Ticket::from(ticket)));
    }

    async fn refresh_display(&self) -> Result<Vec<DisplayRow>, Error> {
        let rows = self.store.display_rows().await?;
        self.hub
            .publish(api::Event::DisplayUpdated(api::display::rows(&rows)));
        Ok(rows)
    }
}

impl From<queue::memory::Store> for Desk {
    fn from(store: queue::memory::Store) -> Self {
        Self::new(Arc::new(store))
    }
}
