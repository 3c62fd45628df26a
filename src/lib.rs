//! Backend for an event invitation site: RSVP confirmations, a guestbook wall
//! and a countdown to the event.
//!
//! | Method | Path | |
//! |---|---|---|
//! | GET | `/api/confirmacao` | guests, newest first, with totals |
//! | POST | `/api/confirmacao` | confirm presence `{ name, quantity?, note? }` |
//! | GET | `/api/recados` | the 20 newest messages |
//! | POST | `/api/recados` | leave a message `{ name, content }` |
//! | GET | `/api/contagem` | time left until the event |
//!
//! Every response is wrapped in `{ ok, data?, error?: { message } }`.

pub mod appresult;
pub mod config;
pub mod confirmations;
pub mod countdown;
pub mod db;
pub mod guestbook;
pub mod res;
pub mod store;
pub mod validate;

use std::time::Duration;

use axum::{
    Router,
    http::{HeaderValue, Method, header::CONTENT_TYPE},
};
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

pub use appresult::{AppError, AppResult, Reply};
pub use config::Config;
pub use confirmations::ConfirmationService;
pub use guestbook::GuestbookService;
pub use store::{MemoryStore, RecordStore, SqliteStore};

#[derive(Clone)]
pub struct AppState<S> {
    pub confirmations: ConfirmationService<S>,
    pub guestbook: GuestbookService<S>,
}

impl<S: RecordStore> AppState<S> {
    pub fn new(store: S) -> Self {
        Self {
            confirmations: ConfirmationService::new(store.clone()),
            guestbook: GuestbookService::new(store),
        }
    }
}

pub fn app<S: RecordStore>(state: AppState<S>, config: &Config) -> anyhow::Result<Router> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));
    let cors = match &config.cors_origin {
        Some(origin) => cors.allow_origin(origin.parse::<HeaderValue>()?),
        None => cors.allow_origin(Any),
    };

    Ok(Router::new()
        .merge(confirmations::router::<S>())
        .merge(guestbook::router::<S>())
        .with_state(state)
        .merge(countdown::router(config.event_at))
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

pub async fn serve(config: Config) -> anyhow::Result<()> {
    info!("Opening {}", config.database_url);
    let store = SqliteStore::connect(&config.database_url, config.max_connections).await?;

    let app = app(AppState::new(store), &config)?;

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!("Server running on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
