//! docchat Core Domain Types
//!
//! This crate contains the chat session state machine and the pure types
//! around it, with no dependencies on:
//! - Network/websocket transports
//! - HTTP clients
//! - Terminal rendering
//!
//! Everything here is driven by the caller: the transport layer feeds
//! frames in and sends out whatever the session hands back.

pub mod chat;
pub mod connection;
pub mod document;
pub mod endpoint;
pub mod error;
pub mod format;
pub mod ids;
pub mod protocol;
pub mod session;

// Re-export commonly used types
pub use chat::{ChatMessage, ChatRole, SourceExcerpt};
pub use connection::ConnectionState;
pub use document::{DocumentInfo, DocumentRegistry, DocumentSelection};
pub use endpoint::{BuildEnvironment, Origin, PRODUCTION_HOST};
pub use error::CoreError;
pub use format::format_text;
pub use ids::MessageId;
pub use protocol::{InboundFrame, OutboundQuestion, DEFAULT_TOP_K};
pub use session::{ChatSession, FrameOutcome, SessionOptions, ERROR_LABEL};
