//! The HTTP gateway: an axum `Router` over a cloneable [`AppState`].
//!
//! Grounded on the teacher's `gateway/mod.rs` `run_server` (the same
//! `Router::new().route(...).with_state(...)` plus `TcpListener`/`axum::serve`
//! wiring), adapted to this crate's own routes and response shapes.

mod handlers;
pub mod state;
mod types;

pub use state::AppState;
pub use types::ApiError;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ticket", get(handlers::buy))
        .route("/cancel", get(handlers::cancel))
        .route("/admin/recover-dlq", post(handlers::recover_dlq))
        .route("/healthz", get(handlers::healthz))
        .with_state(state)
}

/// Binds `addr` and serves the router until the process is terminated.
pub async fn run_server(addr: &str, state: AppState) -> std::io::Result<()> {
    let app = router(state);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr, "gateway listening");
    axum::serve(listener, app).await
}
