//! Lifecycle of the realtime chat connection.

use std::fmt;

use crate::error::CoreError;

/// State of the chat connection for one mounted session.
///
/// `Disconnected -> Connecting -> Open -> Closed`. `Closed` is terminal:
/// there is no reconnect, a new session has to be mounted instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Session mounted, no connection attempted yet.
    #[default]
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Handshake done, frames can flow.
    Open,
    /// Closed by either side.
    Closed,
}

impl ConnectionState {
    /// Returns true if questions can be sent.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns true if the connection can never carry frames again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// `Disconnected -> Connecting`.
    pub fn begin_connect(&mut self) -> Result<(), CoreError> {
        self.transition(Self::Connecting, matches!(self, Self::Disconnected))
    }

    /// `Connecting -> Open`.
    pub fn mark_open(&mut self) -> Result<(), CoreError> {
        self.transition(Self::Open, matches!(self, Self::Connecting))
    }

    /// `Connecting | Open -> Closed`, on remote close or failed handshake.
    pub fn mark_closed(&mut self) -> Result<(), CoreError> {
        self.transition(Self::Closed, matches!(self, Self::Connecting | Self::Open))
    }

    /// Local close request.
    ///
    /// Returns true when a close must actually be issued on the wire, which
    /// is only the case for an open connection. Any other state is left
    /// untouched.
    pub fn request_close(&mut self) -> bool {
        if self.is_open() {
            *self = Self::Closed;
            true
        } else {
            false
        }
    }

    fn transition(&mut self, to: Self, allowed: bool) -> Result<(), CoreError> {
        if !allowed {
            return Err(CoreError::InvalidStateTransition {
                from: self.to_string(),
                to: to.to_string(),
            });
        }
        *self = to;
        Ok(())
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}
