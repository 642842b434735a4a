//! Error types for the docchat client.

use docchat_core::{ConnectionState, CoreError};
use thiserror::Error;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Failed to establish connection.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Websocket protocol or transport error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// HTTP error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Local file error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File type the backend does not ingest.
    #[error("unsupported file type: {0}")]
    UnsupportedFile(String),

    /// Frame sent while the channel was not open.
    #[error("chat channel is not open (state: {0})")]
    NotOpen(ConnectionState),

    /// Invalid base URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Domain error.
    #[error(transparent)]
    Core(#[from] CoreError),
}
