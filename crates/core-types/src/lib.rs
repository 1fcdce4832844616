//! Wire-level types shared between the streaming engine and the HTTP facade.

use serde::{Deserialize, Serialize};

/// Lifecycle status markers pushed onto the event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamStatus {
    OpeningBrowser,
    AuthenticationRequired,
    LoginSuccess,
    BrowserReady,
    WaitingForResponse,
    Streaming,
    EndOfStream,
    Complete,
    Timeout,
    BrowserClosed,
    DevModeActive,
}

/// One event on the answer stream.
///
/// Serializes to the exact wire shapes consumers expect:
/// `{"status": "...", "message": "..."}`, `{"chunk": "..."}` or
/// `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamEvent {
    Status {
        status: StreamStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Chunk {
        chunk: String,
    },
    Error {
        error: String,
    },
}

impl StreamEvent {
    pub fn status(status: StreamStatus) -> Self {
        Self::Status {
            status,
            message: None,
        }
    }

    pub fn status_with_message(status: StreamStatus, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: Some(message.into()),
        }
    }

    pub fn chunk(text: impl Into<String>) -> Self {
        Self::Chunk { chunk: text.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    pub fn is_terminal_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// Body of a submit-query request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    /// Target notebook address; falls back to the configured default.
    #[serde(default, alias = "target_url")]
    pub notebooklm_url: Option<String>,
    /// Per-query streaming budget in seconds.
    #[serde(default)]
    pub timeout: Option<u64>,
    /// Retain the browser session after the query for back-to-back calls.
    #[serde(default)]
    pub keep_session_alive: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_event_serializes_to_wire_shape() {
        let event = StreamEvent::status(StreamStatus::OpeningBrowser);
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"status":"opening_browser"}"#);
    }

    #[test]
    fn status_event_with_message_keeps_both_fields() {
        let event = StreamEvent::status_with_message(
            StreamStatus::AuthenticationRequired,
            "Redirected to sign-in. Waiting for manual login...",
        );
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["status"], "authentication_required");
        assert!(value["message"].as_str().unwrap().contains("sign-in"));
    }

    #[test]
    fn chunk_and_error_events_serialize_flat() {
        assert_eq!(
            serde_json::to_string(&StreamEvent::chunk("hello")).unwrap(),
            r#"{"chunk":"hello"}"#
        );
        assert_eq!(
            serde_json::to_string(&StreamEvent::error("boom")).unwrap(),
            r#"{"error":"boom"}"#
        );
    }

    #[test]
    fn query_request_accepts_minimal_body() {
        let req: QueryRequest = serde_json::from_str(r#"{"query": "what is this about?"}"#).unwrap();
        assert_eq!(req.query, "what is this about?");
        assert!(req.notebooklm_url.is_none());
        assert!(req.timeout.is_none());
        assert!(!req.keep_session_alive);
    }

    #[test]
    fn query_request_accepts_target_url_alias() {
        let req: QueryRequest =
            serde_json::from_str(r#"{"query": "q", "target_url": "https://example.test/"}"#)
                .unwrap();
        assert_eq!(req.notebooklm_url.as_deref(), Some("https://example.test/"));
    }
}
