//! Process-local [`Store`](super::Store) keeping everything behind a single
//! mutex.

use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use time::OffsetDateTime;

use super::{
    ticket::{self, Status},
    window, Assignment, Code, DisplayRow, Error, Estimator, QueueState,
    Service, Snapshot, Ticket, TicketStatus, Transfer, Window,
};

pub struct Store {
    state: Mutex<State>,
    estimator: Estimator,
}

impl Store {
    /// Creates a store with idle windows numbered `1..=windows` and empty
    /// queues for every service.
    pub fn new(windows: u16, estimator: Estimator) -> Self {
        let windows = (1..=i32::from(windows))
            .map(window::Id)
            .map(|id| (id, Window::idle(id)))
            .collect();
        let queues = Service::ALL
            .into_iter()
            .map(|service| (service, Queue::default()))
            .collect();
        Self {
            state: Mutex::new(State {
                windows,
                tickets: HashMap::new(),
                codes: HashMap::new(),
                queues,
            }),
            estimator,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct State {
    windows: BTreeMap<window::Id, Window>,
    tickets: HashMap<ticket::Id, Ticket>,
    codes: HashMap<Code, ticket::Id>,
    queues: BTreeMap<Service, Queue>,
}

struct Queue {
    next_number: u32,
    waiting: VecDeque<ticket::Id>,

    /// Service times of done tickets, most recent first.
    service_times: VecDeque<Duration>,
}

impl Default for Queue {
    fn default() -> Self {
        Self {
            next_number: 1,
            waiting: VecDeque::new(),
            service_times: VecDeque::new(),
        }
    }
}

impl State {
    fn window(&self, id: window::Id) -> Result<&Window, Error> {
        self.windows.get(&id).ok_or(Error::WindowNotFound(id))
    }

    fn queue(&mut self, service: Service) -> &mut Queue {
        self.queues.entry(service).or_default()
    }

    /// Window together with the ticket it is serving.
    fn active(
        &mut self,
        id: window::Id,
    ) -> Result<(&mut Window, &mut Ticket), Error> {
        let window =
            self.windows.get_mut(&id).ok_or(Error::WindowNotFound(id))?;
        let ticket = window
            .current_ticket
            .and_then(|t| self.tickets.get_mut(&t))
            .ok_or(Error::NoActiveTicket)?;
        Ok((window, ticket))
    }

    /// Moves the ticket served at the window into a terminal status and frees
    /// the window.
    fn finish(
        &mut self,
        id: window::Id,
        status: Status,
        history: usize,
    ) -> Result<Assignment, Error> {
        let now = OffsetDateTime::now_utc();

        let (window, ticket) = self.active(id)?;
        ticket.status = status;
        ticket.completed_at = Some(now);
        window.release();

        let served = ticket
            .started_at
            .filter(|_| status == Status::Done)
            .map(|started| {
                Duration::try_from(now - started).unwrap_or_default()
            });
        let assignment = Assignment {
            window: window.clone(),
            ticket: ticket.clone(),
        };

        if let Some(served) = served {
            let service = assignment.ticket.service;
            let times = &mut self.queue(service).service_times;
            times.push_front(served);
            times.truncate(history);
        }
        Ok(assignment)
    }

    fn code_of(&self, id: &ticket::Id) -> Option<Code> {
        self.tickets.get(id).map(Ticket::code)
    }
}

#[async_trait]
impl super::Store for Store {
    async fn windows(&self) -> Result<Vec<Window>, Error> {
        Ok(self.lock().windows.values().cloned().collect())
    }

    async fn create_ticket(&self, new: ticket::New) -> Result<Ticket, Error> {
        let mut state = self.lock();

        let queue = state.queue(new.service);
        let number = queue.next_number;
        queue.next_number += 1;

        let ticket = Ticket {
            id: ticket::Id::new(),
            service: new.service,
            number,
            status: Status::Waiting,
            window: None,
            created_at: OffsetDateTime::now_utc(),
            started_at: None,
            completed_at: None,
            notes: new.notes,
            owner_name: new.owner_name,
            locality: new.locality,
        };

        queue.waiting.push_back(ticket.id);
        state.codes.insert(ticket.code(), ticket.id);
        state.tickets.insert(ticket.id, ticket.clone());

        Ok(ticket)
    }

    async fn call_next(
        &self,
        id: window::Id,
        service: Service,
    ) -> Result<Option<Assignment>, Error> {
        let mut guard = self.lock();
        let state = &mut *guard;

        if state.window(id)?.busy {
            return Err(Error::WindowBusy(id));
        }
        let Some(ticket_id) = state.queue(service).waiting.pop_front() else {
            return Ok(None);
        };
        let ticket = state
            .tickets
            .get_mut(&ticket_id)
            .ok_or_else(|| Error::TicketNotFound(ticket_id.to_string()))?;
        let window = state
            .windows
            .get_mut(&id)
            .ok_or(Error::WindowNotFound(id))?;

        ticket.status = Status::Serving;
        ticket.window = Some(id);
        ticket.started_at = Some(OffsetDateTime::now_utc());
        window.assign(ticket.id);

        Ok(Some(Assignment {
            window: window.clone(),
            ticket: ticket.clone(),
        }))
    }

    async fn recall(&self, id: window::Id) -> Result<Ticket, Error> {
        let mut state = self.lock();
        let (_, ticket) = state.active(id)?;
        Ok(ticket.clone())
    }

    async fn complete(&self, id: window::Id) -> Result<Assignment, Error> {
        self.lock().finish(id, Status::Done, self.estimator.history)
    }

    async fn skip(&self, id: window::Id) -> Result<Assignment, Error> {
        self.lock().finish(id, Status::Skipped, self.estimator.history)
    }

    async fn transfer(
        &self,
        source: window::Id,
        target: window::Id,
    ) -> Result<Transfer, Error> {
        let mut state = self.lock();

        state.window(source)?;
        let target_busy = state.window(target)?.busy;
        if source == target {
            return Err(Error::SameWindow);
        }
        state.active(source)?;
        if target_busy {
            return Err(Error::TargetBusy(target));
        }

        let (source_window, ticket) = state.active(source)?;
        source_window.release();
        ticket.status = Status::Transferred;
        ticket.window = Some(target);
        let (source_window, ticket) = (source_window.clone(), ticket.clone());

        let target_window = state
            .windows
            .get_mut(&target)
            .ok_or(Error::WindowNotFound(target))?;
        target_window.assign(ticket.id);

        Ok(Transfer {
            source: source_window,
            target: target_window.clone(),
            ticket,
        })
    }

    /// Shows the window updated last. Windows updated at the same instant
    /// are ordered by the ticket they serve, the later ticket winning.
    async fn display_rows(&self) -> Result<Vec<DisplayRow>, Error> {
        let state = self.lock();

        let rows = Service::ALL
            .into_iter()
            .map(|service| {
                let now_serving = state
                    .windows
                    .values()
                    .filter_map(|w| {
                        let ticket = state.tickets.get(&w.current_ticket?)?;
                        (ticket.service == service
                            && ticket.status.is_assigned())
                        .then_some((w, ticket))
                    })
                    .max_by_key(|(w, ticket)| (w.updated_at, ticket.number))
                    .map(|(w, ticket)| (ticket.code(), w.id));
                let next = state
                    .queues
                    .get(&service)
                    .and_then(|q| q.waiting.front())
                    .and_then(|id| state.code_of(id));
                DisplayRow {
                    service,
                    now_serving,
                    next,
                }
            })
            .collect();
        Ok(rows)
    }

    async fn ticket_status(&self, code: Code) -> Result<TicketStatus, Error> {
        let state = self.lock();

        let ticket = state
            .codes
            .get(&code)
            .and_then(|id| state.tickets.get(id))
            .ok_or_else(|| Error::TicketNotFound(code.to_string()))?;

        let mut status = TicketStatus {
            ticket: ticket.clone(),
            position: None,
            estimated_wait_seconds: None,
        };
        if ticket.status != Status::Waiting {
            return Ok(status);
        }
        if let Some(queue) = state.queues.get(&ticket.service) {
            let position = queue
                .waiting
                .iter()
                .position(|id| *id == ticket.id)
                .map(|index| index + 1);
            let average = self
                .estimator
                .average_service_time(queue.service_times.iter().copied());
            status.estimated_wait_seconds =
                position.map(|p| self.estimator.wait_seconds(p, average));
            status.position = position;
        }
        Ok(status)
    }

    async fn snapshot(&self) -> Result<Snapshot, Error> {
        let state = self.lock();

        Ok(Snapshot {
            windows: state.windows.values().cloned().collect(),
            queues: state
                .queues
                .iter()
                .map(|(service, queue)| {
                    let queue = QueueState {
                        next_number: queue.next_number,
                        waiting: queue.waiting.iter().copied().collect(),
                    };
                    (*service, queue)
                })
                .collect(),
            tickets: state
                .tickets
                .values()
                .filter(|t| !t.status.is_terminal())
                .cloned()
                .collect(),
        })
    }
}
