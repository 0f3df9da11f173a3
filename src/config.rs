use std::{net, time};

use serde::Deserialize;

#[derive(Deserialize)]
pub struct Config {
    /// In-memory storage is used when absent.
    pub db: Option<Db>,
    pub http: Http,
    #[serde(default)]
    pub queue: Queue,
}

#[derive(Deserialize)]
pub struct Db {
    pub url: String,
    #[serde(default = "Db::default_connections")]
    pub connections: usize,
}

impl Db {
    fn default_connections() -> usize {
        4
    }
}

#[derive(Deserialize)]
pub struct Http {
    pub server: Server,
    pub cors: Cors,
    #[serde(default)]
    pub events: Events,
}

#[derive(Deserialize)]
pub struct Server {
    pub addr: net::SocketAddr,
}

#[derive(Deserialize)]
pub struct Cors {
    pub allowed_origins: Vec<String>,
}

#[derive(Deserialize)]
#[serde(default)]
pub struct Events {
    #[serde(with = "humantime_serde")]
    pub keep_alive: time::Duration,
}

impl Default for Events {
    fn default() -> Self {
        Self {
            keep_alive: time::Duration::from_secs(15),
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
pub struct Queue {
    /// Windows are numbered from 1 up to this count.
    pub windows: u16,
    pub estimate: Estimate,
}

impl Default for Queue {
    fn default() -> Self {
        Self {
            windows: 6,
            estimate: Estimate::default(),
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
pub struct Estimate {
    #[serde(with = "humantime_serde")]
    pub default_service_time: time::Duration,
    #[serde(with = "humantime_serde")]
    pub min_service_time: time::Duration,
    pub history: usize,
}

impl Default for Estimate {
    fn default() -> Self {
        Self {
            default_service_time: time::Duration::from_secs(300),
            min_service_time: time::Duration::from_secs(60),
            history: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let config = toml::from_str::<Config>(
            r#"
            [db]
            url = "postgres://queue@localhost/queue"

            [http.server]
            addr = "127.0.0.1:8080"

            [http.cors]
            allowed_origins = ["http://localhost:5173"]

            [http.events]
            keep_alive = "30s"

            [queue]
            windows = 4

            [queue.estimate]
            default_service_time = "4m"
            min_service_time = "90s"
            history = 10
            "#,
        )
        .unwrap();

        let db = config.db.unwrap();
        assert_eq!(db.url, "postgres://queue@localhost/queue");
        assert_eq!(db.connections, 4);
        assert_eq!(config.http.server.addr.port(), 8080);
        assert_eq!(config.http.events.keep_alive.as_secs(), 30);
        assert_eq!(config.queue.windows, 4);
        assert_eq!(config.queue.estimate.default_service_time.as_secs(), 240);
        assert_eq!(config.queue.estimate.min_service_time.as_secs(), 90);
        assert_eq!(config.queue.estimate.history, 10);
    }

    #[test]
    fn defaults_to_memory_store() {
        let config = toml::from_str::<Config>(
            r#"
            [http.server]
            addr = "0.0.0.0:8080"

            [http.cors]
            allowed_origins = []
            "#,
        )
        .unwrap();

        assert!(config.db.is_none());
        assert_eq!(config.queue.windows, 6);
        assert_eq!(config.http.events.keep_alive.as_secs(), 15);
        assert_eq!(config.queue.estimate.history, 20);
    }
}
