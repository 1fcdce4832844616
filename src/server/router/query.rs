//! Submit-query endpoint: one POST in, one server-sent event stream out.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use futures::StreamExt;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{info, warn};

use relay_answer_stream::{stream_query, StreamConfig};
use relay_core_types::QueryRequest;

use crate::server::ServeState;

/// Events buffered between the engine and a slow consumer.
const EVENT_CHANNEL_CAPACITY: usize = 64;

pub(crate) fn router() -> Router<ServeState> {
    Router::new().route("/api/process_query", post(process_query_handler))
}

async fn process_query_handler(
    State(state): State<ServeState>,
    body: Option<Json<Value>>,
) -> impl IntoResponse {
    let Some(Json(body)) = body else {
        return bad_request("Missing request body");
    };
    let request: QueryRequest = match serde_json::from_value(body) {
        Ok(request) => request,
        Err(err) => {
            warn!(%err, "rejecting malformed query request");
            return bad_request("Missing \"query\" in request body");
        }
    };

    let config = StreamConfig {
        query: request.query,
        target_url: request
            .notebooklm_url
            .unwrap_or_else(|| state.config.target_url.clone()),
        timeout: Duration::from_secs(
            request.timeout.unwrap_or(state.config.default_timeout_secs),
        ),
        keep_session_alive: request.keep_session_alive,
    };
    info!(target_url = %config.target_url, "query accepted");

    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        // Failures surface to the consumer as events; the run's result is
        // only interesting for logging here.
        if let Err(err) = stream_query(&sessions, config, tx).await {
            warn!(%err, "query stream ended in error");
        }
    });

    let stream = futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|event| (event, rx))
    })
    .map(|event| {
        let payload = serde_json::to_string(&event)
            .unwrap_or_else(|_| r#"{"error":"event serialization failure"}"#.to_string());
        Ok::<_, Infallible>(Event::default().data(payload))
    });

    Sse::new(stream).into_response()
}

fn bad_request(message: &str) -> axum::response::Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}
