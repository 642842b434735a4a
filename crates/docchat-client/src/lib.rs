//! Client library for the docchat backend.
//!
//! Provides the websocket chat channel and the HTTP client for the
//! document listing and upload endpoints.

pub mod endpoint;
pub mod error;
pub mod http;
pub mod ws;

pub use endpoint::origin_from_base_url;
pub use error::ClientError;
pub use http::{HttpClient, UploadProgress, UploadReceipt};
pub use ws::{ChatChannel, ChatFrames};
