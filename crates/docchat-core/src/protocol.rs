//! Wire frames exchanged over the `/ws/chat` channel.
//!
//! Outbound frames are plain structs. Inbound frames are decoded
//! defensively into [`InboundFrame`]: the decode step returns a `Result`
//! instead of failing loudly, so callers decide what a malformed frame
//! means for their state.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::chat::SourceExcerpt;
use crate::error::CoreError;

/// Number of excerpts requested from the backend for every question.
pub const DEFAULT_TOP_K: u32 = 5;

/// Question sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundQuestion {
    pub question: String,
    pub top_k: u32,
    /// Documents that scope the question. Always serialized, empty when
    /// nothing is selected.
    pub file_paths: Vec<String>,
}

impl OutboundQuestion {
    pub fn new(question: impl Into<String>, file_paths: Vec<String>) -> Self {
        Self {
            question: question.into(),
            top_k: DEFAULT_TOP_K,
            file_paths,
        }
    }

    /// Serialize to the JSON text sent on the wire.
    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Frame received from the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// The backend failed to answer.
    Error(String),
    /// An answer, optionally with the excerpts it was built from.
    Answer {
        answer: String,
        sources: Option<Vec<SourceExcerpt>>,
    },
    /// Valid JSON with neither field set. Ignored by the session.
    Unrecognized,
}

impl InboundFrame {
    /// Decode a raw text frame.
    ///
    /// Only invalid JSON is an error. Any JSON value that is not an
    /// error or answer payload decodes to [`InboundFrame::Unrecognized`].
    pub fn decode(raw: &str) -> Result<Self, CoreError> {
        let value: Value = serde_json::from_str(raw)?;
        Ok(Self::from_value(value))
    }

    fn from_value(value: Value) -> Self {
        let Value::Object(mut fields) = value else {
            return Self::Unrecognized;
        };

        // `error` wins over `answer` when both are present.
        if let Some(error) = fields.remove("error").and_then(truthy_text) {
            return Self::Error(error);
        }

        if let Some(answer) = fields.remove("answer").and_then(truthy_text) {
            let sources = fields.remove("sources").and_then(decode_sources);
            return Self::Answer { answer, sources };
        }

        Self::Unrecognized
    }
}

/// Text of a field that counts as "present": missing, null, false, zero and
/// empty strings do not.
fn truthy_text(value: Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

fn decode_sources(value: Value) -> Option<Vec<SourceExcerpt>> {
    if value.is_null() {
        return None;
    }
    match serde_json::from_value::<Vec<SourceExcerpt>>(value) {
        Ok(sources) => Some(sources),
        Err(e) => {
            warn!(error = %e, "Ignoring undecodable sources field");
            None
        }
    }
}
