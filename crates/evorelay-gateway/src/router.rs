use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use bytes::Bytes;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::error::RelayError;
use crate::state::SharedState;

/// Build the application router.
///
/// `/webhook` only accepts POST; other methods get 405 from the method router.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhook", post(webhook))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "ok"
}

async fn webhook(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<StatusCode, RelayError> {
    let outcomes = state.orchestrator.handle_event(&body).await?;
    debug!(?outcomes, "webhook handled");
    Ok(StatusCode::OK)
}
