//! Router configuration.
//!
//! Action messages arrive as JSON on `POST /saml`. Dispatch is CPU-bound
//! (XML parsing and public-key operations) and runs on the blocking pool.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use sp_protocol_saml::SamlError;

use crate::dispatcher::{ActionRequest, Reply};
use crate::state::AppState;

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    let health = Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness_check));

    Router::new()
        .route("/saml", post(handle_action))
        .with_state(state)
        .merge(health)
        .layer(TraceLayer::new_for_http())
}

/// Runs one action message.
///
/// A body that is not an action message gets an `invalid_request` reply.
async fn handle_action(
    State(state): State<AppState>,
    request: Result<Json<ActionRequest>, JsonRejection>,
) -> (StatusCode, Json<Reply>) {
    let reply = match request {
        Ok(Json(request)) => {
            let dispatcher = Arc::clone(&state.dispatcher);
            tokio::task::spawn_blocking(move || dispatcher.dispatch(&request))
                .await
                .unwrap_or_else(|e| {
                    tracing::error!(error = %e, "dispatch task failed");
                    Reply::internal("action could not be completed")
                })
        }
        Err(rejection) => {
            tracing::warn!(error = %rejection, "malformed action message");
            Reply::from_error(&SamlError::InvalidRequest(rejection.body_text()))
        }
    };
    let status =
        StatusCode::from_u16(reply.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(reply))
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
}

/// Basic health check.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
    })
}

/// Liveness probe.
async fn liveness_check() -> StatusCode {
    StatusCode::OK
}
