use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use itertools::Itertools as _;

use super::{ticket, window, Client};
use crate::queue::{
    self,
    ticket::{Id, Status},
    Assignment, Code, DisplayRow, Error, QueueState, Service, Snapshot,
    Ticket, TicketStatus, Transfer, Window,
};

#[async_trait]
impl queue::Store for Client {
    async fn windows(&self) -> Result<Vec<Window>, Error> {
        window::list(&*self.session().await).await
    }

    async fn create_ticket(
        &self,
        new: queue::ticket::New,
    ) -> Result<Ticket, Error> {
        const COUNTER_SQL: &str = "\
            INSERT INTO service_counters (service, next_number) \
            VALUES ($1, 2) \
            ON CONFLICT (service) DO UPDATE \
            SET next_number = service_counters.next_number + 1 \
            RETURNING next_number - 1";
        let insert_sql = format!(
            "INSERT INTO tickets (id, service, number, code, status, \
                                  notes, owner_name, woreda, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, clock_timestamp()) \
             RETURNING {}",
            ticket::COLUMNS,
        );

        let mut session = self.session().await;
        let tx = session.transaction().await?;

        let number: i32 =
            tx.query_one(COUNTER_SQL, &[&new.service]).await?.get(0);
        let code = Code::new(new.service, number as u32);
        let row = tx
            .query_one(
                insert_sql.as_str(),
                &[
                    &Id::new(),
                    &new.service,
                    &number,
                    &code.to_string(),
                    &Status::Waiting,
                    &new.notes,
                    &new.owner_name,
                    &new.locality,
                ],
            )
            .await?;

        tx.commit().await?;
        Ok(ticket::from_row(&row))
    }

    async fn call_next(
        &self,
        id: queue::window::Id,
        service: Service,
    ) -> Result<Option<Assignment>, Error> {
        const NEXT_SQL: &str = "\
            SELECT id FROM tickets \
            WHERE service = $1 AND status = $2 \
            ORDER BY number \
            LIMIT 1 \
            FOR UPDATE SKIP LOCKED";
        let serve_sql = format!(
            "UPDATE tickets \
             SET status = $1, window_id = $2, started_at = now() \
             WHERE id = $3 \
             RETURNING {}",
            ticket::COLUMNS,
        );

        let mut session = self.session().await;
        let tx = session.transaction().await?;

        let current = window::lock(&tx, &[id])
            .await?
            .pop()
            .ok_or(Error::WindowNotFound(id))?;
        if current.busy {
            return Err(Error::WindowBusy(id));
        }

        let Some(next) = tx
            .query_opt(NEXT_SQL, &[&service, &Status::Waiting])
            .await?
        else {
            return Ok(None);
        };
        let ticket_id: Id = next.get("id");

        let row = tx
            .query_one(serve_sql.as_str(), &[&Status::Serving, &id, &ticket_id])
            .await?;
        let window = window::assign(&tx, id, ticket_id).await?;

        tx.commit().await?;
        Ok(Some(Assignment {
            window,
            ticket: ticket::from_row(&row),
        }))
    }

    async fn recall(&self, id: queue::window::Id) -> Result<Ticket, Error> {
        let session = self.session().await;

        let current = window::get(&*session, id)
            .await?
            .current_ticket
            .ok_or(Error::NoActiveTicket)?;
        ticket::get_by_id(&*session, current)
            .await?
            .filter(|t| t.status.is_assigned())
            .ok_or(Error::NoActiveTicket)
    }

    async fn complete(
        &self,
        id: queue::window::Id,
    ) -> Result<Assignment, Error> {
        self.finish(id, Status::Done).await
    }

    async fn skip(&self, id: queue::window::Id) -> Result<Assignment, Error> {
        self.finish(id, Status::Skipped).await
    }

    async fn transfer(
        &self,
        source: queue::window::Id,
        target: queue::window::Id,
    ) -> Result<Transfer, Error> {
        let move_sql = format!(
            "UPDATE tickets \
             SET status = $1, window_id = $2 \
             WHERE id = $3 \
             RETURNING {}",
            ticket::COLUMNS,
        );

        let mut session = self.session().await;
        let tx = session.transaction().await?;

        let locked = window::lock(&tx, &[source, target]).await?;
        let find = |id: queue::window::Id| {
            locked
                .iter()
                .find(|w| w.id == id)
                .ok_or(Error::WindowNotFound(id))
        };
        let (from, to) = (find(source)?, find(target)?);
        if source == target {
            return Err(Error::SameWindow);
        }
        let ticket_id = from.current_ticket.ok_or(Error::NoActiveTicket)?;
        if to.busy {
            return Err(Error::TargetBusy(target));
        }

        let row = tx
            .query_opt(
                move_sql.as_str(),
                &[&Status::Transferred, &target, &ticket_id],
            )
            .await?
            .ok_or(Error::NoActiveTicket)?;
        let source_window = window::release(&tx, source).await?;
        let target_window = window::assign(&tx, target, ticket_id).await?;

        tx.commit().await?;
        Ok(Transfer {
            source: source_window,
            target: target_window,
            ticket: ticket::from_row(&row),
        })
    }

    async fn display_rows(&self) -> Result<Vec<DisplayRow>, Error> {
        const SERVING_SQL: &str = "\
            SELECT DISTINCT ON (t.service) t.service, t.number, w.id \
            FROM windows w \
            JOIN tickets t ON t.id = w.current_ticket_id \
            WHERE t.status IN ($1, $2) \
            ORDER BY t.service, w.updated_at DESC, t.number DESC";
        const NEXT_SQL: &str = "\
            SELECT DISTINCT ON (service) service, number \
            FROM tickets \
            WHERE status = $1 \
            ORDER BY service, number";

        let session = self.session().await;
        let serving = session
            .query(SERVING_SQL, &[&Status::Serving, &Status::Transferred])
            .await?
            .into_iter()
            .map(|row| {
                let service: Service = row.get("service");
                let number: i32 = row.get("number");
                let window: queue::window::Id = row.get("id");
                (service, (Code::new(service, number as u32), window))
            })
            .collect::<HashMap<_, _>>();
        let next = session
            .query(NEXT_SQL, &[&Status::Waiting])
            .await?
            .into_iter()
            .map(|row| {
                let service: Service = row.get("service");
                let number: i32 = row.get("number");
                (service, Code::new(service, number as u32))
            })
            .collect::<HashMap<_, _>>();

        Ok(Service::ALL
            .into_iter()
            .map(|service| DisplayRow {
                service,
                now_serving: serving.get(&service).copied(),
                next: next.get(&service).copied(),
            })
            .collect())
    }

    async fn ticket_status(&self, code: Code) -> Result<TicketStatus, Error> {
        const POSITION_SQL: &str = "\
            SELECT COUNT(*) FROM tickets \
            WHERE service = $1 AND status = $2 \
              AND number < $3";
        const HISTORY_SQL: &str = "\
            SELECT EXTRACT(EPOCH FROM completed_at - started_at)::FLOAT8 \
            FROM tickets \
            WHERE service = $1 AND status = $2 \
              AND started_at IS NOT NULL AND completed_at IS NOT NULL \
            ORDER BY completed_at DESC \
            LIMIT $3";

        let session = self.session().await;

        let ticket = ticket::get_by_code(&*session, code)
            .await?
            .ok_or_else(|| Error::TicketNotFound(code.to_string()))?;
        if ticket.status != Status::Waiting {
            return Ok(TicketStatus {
                ticket,
                position: None,
                estimated_wait_seconds: None,
            });
        }

        let number = ticket.number as i32;
        let ahead: i64 = session
            .query_one(
                POSITION_SQL,
                &[&ticket.service, &Status::Waiting, &number],
            )
            .await?
            .get(0);
        let position = usize::try_from(ahead).unwrap_or_default() + 1;

        let history = i64::try_from(self.estimator.history).unwrap_or(i64::MAX);
        let samples = session
            .query(HISTORY_SQL, &[&ticket.service, &Status::Done, &history])
            .await?
            .into_iter()
            .map(|row| Duration::from_secs_f64(row.get::<_, f64>(0).max(0.0)))
            .collect::<Vec<_>>();
        let average = self.estimator.average_service_time(samples);

        Ok(TicketStatus {
            ticket,
            position: Some(position),
            estimated_wait_seconds: Some(
                self.estimator.wait_seconds(position, average),
            ),
        })
    }

    async fn snapshot(&self) -> Result<Snapshot, Error> {
        const COUNTERS_SQL: &str = "\
            SELECT service, next_number FROM service_counters";
        let tickets_sql = format!(
            "SELECT {} FROM tickets \
             WHERE status IN ($1, $2, $3) \
             ORDER BY service, number",
            ticket::COLUMNS,
        );

        let session = self.session().await;

        let windows = window::list(&*session).await?;
        let counters = session
            .query(COUNTERS_SQL, &[])
            .await?
            .into_iter()
            .map(|row| {
                let service: Service = row.get("service");
                let next: i32 = row.get("next_number");
                (service, next as u32)
            })
            .collect::<HashMap<_, _>>();
        let tickets = session
            .query(
                tickets_sql.as_str(),
                &[&Status::Waiting, &Status::Serving, &Status::Transferred],
            )
            .await?
            .iter()
            .map(ticket::from_row)
            .collect::<Vec<_>>();

        let mut waiting = tickets
            .iter()
            .filter(|t| t.status == Status::Waiting)
            .map(|t| (t.service, t.id))
            .into_group_map();
        let queues = Service::ALL
            .into_iter()
            .map(|service| {
                let queue = QueueState {
                    next_number: counters.get(&service).copied().unwrap_or(1),
                    waiting: waiting.remove(&service).unwrap_or_default(),
                };
                (service, queue)
            })
            .collect();

        Ok(Snapshot {
            windows,
            queues,
            tickets,
        })
    }
}

impl Client {
    /// Completes or skips the ticket served at the window.
    async fn finish(
        &self,
        id: queue::window::Id,
        status: Status,
    ) -> Result<Assignment, Error> {
        let mut session = self.session().await;
        let tx = session.transaction().await?;

        let current = window::lock(&tx, &[id])
            .await?
            .pop()
            .ok_or(Error::WindowNotFound(id))?
            .current_ticket
            .ok_or(Error::NoActiveTicket)?;
        let ticket = ticket::finish(&tx, current, id, status)
            .await?
            .ok_or(Error::NoActiveTicket)?;
        let window = window::release(&tx, id).await?;

        tx.commit().await?;
        Ok(Assignment { window, ticket })
    }
}
