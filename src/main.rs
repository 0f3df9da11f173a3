use std::{error::Error, sync::Arc};

use axum::http::{header::CONTENT_TYPE, HeaderValue, Method};
use tokio::{fs, net, task};
use tower_http::cors::CorsLayer;
use tracing_subscriber::{
    layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

use queue_desk::{db, http, queue, Config, Desk};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = fs::read_to_string("config.toml").await?;
    let config = toml::from_str::<Config>(&config)?;

    let estimator = queue::Estimator::from(&config.queue.estimate);
    let store: Arc<dyn queue::Store> = match config.db {
        Some(db_config) => {
            let (db_client, db_connections) =
                db::connect(db_config, estimator).await?;
            for db_connection in db_connections {
                task::spawn(async move {
                    if let Err(e) = db_connection.await {
                        panic!("database connection failed: {e}");
                    }
                });
            }
            db_client.init(config.queue.windows).await?;
            tracing::info!("using PostgreSQL store");
            Arc::new(db_client)
        }
        None => {
            tracing::info!("using in-memory store");
            Arc::new(queue::memory::Store::new(config.queue.windows, estimator))
        }
    };

    let origins = config
        .http
        .cors
        .allowed_origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
        .allow_origin(origins);

    let app = http::router(Desk::new(store), config.http.events.keep_alive)
        .layer(cors);

    let listener = net::TcpListener::bind(config.http.server.addr).await?;
    tracing::info!(addr = %config.http.server.addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
