//! PostgreSQL-backed [`Store`](crate::queue::Store).
//!
//! Claiming a ticket runs in a transaction that selects the oldest waiting
//! row with `FOR UPDATE SKIP LOCKED`, so operators calling concurrently from
//! different windows never bind the same ticket.

mod store;
pub mod ticket;
pub mod window;

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex, MutexGuard};
use tokio_postgres::{tls::NoTlsStream, NoTls, Socket};

use crate::{
    config,
    queue::{Estimator, Service},
};

pub use tokio_postgres::Error;

pub type Connection = tokio_postgres::Connection<Socket, NoTlsStream>;

const SCHEMA: &str = "\
    CREATE TABLE IF NOT EXISTS windows ( \
        id INT4 PRIMARY KEY, \
        name TEXT NOT NULL, \
        current_ticket_id UUID, \
        busy BOOLEAN NOT NULL DEFAULT FALSE, \
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now() \
    ); \
    CREATE TABLE IF NOT EXISTS tickets ( \
        id UUID PRIMARY KEY, \
        service TEXT NOT NULL, \
        number INT4 NOT NULL, \
        code TEXT NOT NULL UNIQUE, \
        status INT2 NOT NULL, \
        window_id INT4, \
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(), \
        started_at TIMESTAMPTZ, \
        completed_at TIMESTAMPTZ, \
        notes TEXT, \
        owner_name TEXT, \
        woreda TEXT \
    ); \
    CREATE INDEX IF NOT EXISTS tickets_queue_idx \
        ON tickets (service, status, number); \
    CREATE TABLE IF NOT EXISTS service_counters ( \
        service TEXT PRIMARY KEY, \
        next_number INT4 NOT NULL \
    );";

/// Opens `config.connections` sessions to the database.
///
/// Every returned [`Connection`] has to be polled (usually spawned) for its
/// session to make progress.
pub async fn connect(
    config: config::Db,
    estimator: Estimator,
) -> Result<(Client, Vec<Connection>), Error> {
    let mut sessions = Vec::new();
    let mut connections = Vec::new();
    for _ in 0..config.connections.max(1) {
        let (client, connection) =
            tokio_postgres::connect(&config.url, NoTls).await?;
        sessions.push(Mutex::new(client));
        connections.push(connection);
    }

    let client = Client {
        sessions,
        next: AtomicUsize::new(0),
        estimator,
    };
    Ok((client, connections))
}

/// Fixed set of database sessions, each used by one operation at a time.
pub struct Client {
    sessions: Vec<Mutex<tokio_postgres::Client>>,
    next: AtomicUsize,
    estimator: Estimator,
}

impl Client {
    /// Creates missing tables and seeds windows `1..=windows` and the
    /// counters of every service. Existing rows are left untouched.
    pub async fn init(&self, windows: u16) -> Result<(), Error> {
        const WINDOWS_SQL: &str = "\
            INSERT INTO windows (id, name) \
            SELECT n, 'Window ' || n FROM generate_series(1, $1) AS n \
            ON CONFLICT (id) DO NOTHING";
        const COUNTERS_SQL: &str = "\
            INSERT INTO service_counters (service, next_number) \
            VALUES ($1, 1) \
            ON CONFLICT (service) DO NOTHING";

        let client = self.session().await;
        client.batch_execute(SCHEMA).await?;
        client
            .execute(WINDOWS_SQL, &[&i32::from(windows)])
            .await?;
        for service in Service::ALL {
            client.execute(COUNTERS_SQL, &[&service]).await?;
        }
        tracing::info!(windows, "database schema ready");
        Ok(())
    }

    /// Waits for a free session, preferring an idle one.
    async fn session(&self) -> MutexGuard<'_, tokio_postgres::Client> {
        for session in &self.sessions {
            if let Ok(guard) = session.try_lock() {
                return guard;
            }
        }
        let next = self.next.fetch_add(1, Ordering::Relaxed);
        self.sessions[next % self.sessions.len()].lock().await
    }
}
