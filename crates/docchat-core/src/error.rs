//! Core domain errors.

use thiserror::Error;

/// Core domain errors for docchat.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invalid connection state transition.
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    /// Inbound frame could not be decoded as JSON.
    #[error("Malformed frame: {0}")]
    MalformedFrame(#[from] serde_json::Error),
}
