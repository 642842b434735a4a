//! Event types for communication between the backend thread and the UI.

use std::path::PathBuf;

use docchat_client::UploadReceipt;
use docchat_core::{DocumentInfo, OutboundQuestion};

/// Events sent from the backend thread to the UI thread.
#[derive(Debug)]
pub enum UiEvent {
    /// Chat channel handshake started.
    ChannelConnecting,

    /// Chat channel is open.
    ChannelOpened,

    /// Chat channel closed (remote close or failed handshake).
    ChannelClosed,

    /// Raw text frame from the chat channel.
    FrameReceived(String),

    /// The chat session was torn down; a fresh one follows.
    SessionReset,

    /// Document listing fetch started.
    DocumentsFetching,

    /// Document listing fetched.
    DocumentsUpdated(Vec<DocumentInfo>),

    /// Document listing fetch failed.
    DocumentsFailed(String),

    /// Upload of the named file started.
    UploadStarted(String),

    /// Upload progress in percent.
    UploadProgress(u8),

    /// Upload finished.
    UploadFinished(Result<UploadReceipt, String>),
}

/// Commands sent from the UI thread to the backend.
#[derive(Debug)]
pub enum BackendCommand {
    /// Transmit a question over the chat channel.
    SendQuestion(OutboundQuestion),

    /// Fetch the document listing now.
    RefreshDocuments,

    /// Upload a local file.
    Upload(PathBuf),

    /// Tear down the chat session and open a new one.
    Remount,

    /// Close the channel if open and stop.
    Quit,
}
