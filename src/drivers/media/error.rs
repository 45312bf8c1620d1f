//! Media driver error types.

use thiserror::Error;

/// Errors that can occur when talking to the remote media app.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("event stream: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown action: {0}")]
    UnknownAction(String),
}
