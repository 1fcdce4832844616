//! Session status and explicit close endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tracing::info;

use relay_answer_stream::selectors;
use relay_cdp_adapter::SessionStatus;

use crate::server::ServeState;

pub(crate) fn router() -> Router<ServeState> {
    Router::new()
        .route("/api/status", get(status_handler))
        .route("/api/close_session", post(close_session_handler))
}

async fn status_handler(State(state): State<ServeState>) -> impl IntoResponse {
    match state.sessions.status().await {
        SessionStatus::Inactive => (
            StatusCode::OK,
            Json(json!({ "browser_active": false, "status": "inactive" })),
        ),
        SessionStatus::Busy => (
            StatusCode::OK,
            Json(json!({ "browser_active": true, "status": "busy" })),
        ),
        SessionStatus::Active {
            current_url,
            page_title,
        } => {
            let status = if selectors::is_signin_address(&current_url) {
                "authentication_required"
            } else {
                "ready"
            };
            (
                StatusCode::OK,
                Json(json!({
                    "browser_active": true,
                    "status": status,
                    "current_url": current_url,
                    "page_title": page_title,
                })),
            )
        }
        SessionStatus::Stale { error } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "browser_active": false,
                "status": "error",
                "error": error,
            })),
        ),
    }
}

async fn close_session_handler(State(state): State<ServeState>) -> impl IntoResponse {
    let was_active = state.sessions.close().await;
    info!(was_active, "close session requested");
    Json(json!({ "status": "closed", "was_active": was_active }))
}
