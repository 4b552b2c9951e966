//! HTTP server setup and shared state.

use std::sync::Arc;

use axum::{
    extract::State,
    response::Json,
    routing::{get, put},
    Router,
};
use serde::Serialize;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::board::{SharedBoard, TaskBoard};
use crate::clock::{SharedClock, SystemClock};
use crate::config::{Config, StoreTarget};
use crate::remote::{HttpTaskBackend, InMemoryBackend, SharedBackend};
use crate::store::{self, TaskStore};
use crate::ticker::{TickSummary, Ticker};

use super::tasks;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub board: SharedBoard,
    /// Summaries published by the running ticker
    pub ticks: watch::Receiver<TickSummary>,
}

/// Build the API router over existing state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/filter", put(tasks::set_filter))
        .nest("/api/tasks", tasks::routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn backend_for(config: &Config) -> SharedBackend {
    match &config.store {
        StoreTarget::Http(url) => {
            tracing::info!("Using remote task store at {}", url);
            Arc::new(HttpTaskBackend::new(url))
        }
        StoreTarget::Memory => {
            tracing::info!("Using in-memory task store");
            Arc::new(InMemoryBackend::new())
        }
    }
}

/// Start the board, its ticker, and the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let clock: SharedClock = Arc::new(SystemClock);
    let store = store::shared(TaskStore::new());
    let board: SharedBoard = Arc::new(TaskBoard::new(
        Arc::clone(&store),
        backend_for(&config),
        Arc::clone(&clock),
        config.default_filter,
    ));

    // Start empty rather than refuse to run when the store is down.
    if let Err(e) = board.load().await {
        tracing::error!("Initial task load failed, starting with an empty list: {}", e);
    }

    let ticker = Ticker::new(store, clock, config.tick_period);
    let ticks = ticker.subscribe();
    let ticker_handle = ticker.spawn();

    let state = Arc::new(AppState {
        config: config.clone(),
        board,
        ticks,
    });
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    ticker_handle.abort();
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub tasks: usize,
    pub last_tick: u64,
    pub tick_period_ms: u64,
}

/// GET /api/health
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let tasks = state.board.store().read().await.len();
    let last_tick = state.ticks.borrow().tick;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        tasks,
        last_tick,
        tick_period_ms: state.config.tick_period.as_millis() as u64,
    })
}
