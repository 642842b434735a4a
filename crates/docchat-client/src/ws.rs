//! Websocket chat channel.
//!
//! The connection is split in two halves: [`ChatChannel`] owns the write
//! side and the connection state, [`ChatFrames`] owns the read side, so a
//! caller can wait on inbound frames and send questions from the same
//! `select!` loop.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use docchat_core::{ConnectionState, OutboundQuestion};

use crate::error::ClientError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Write side of the chat connection plus its lifecycle state.
pub struct ChatChannel {
    url: String,
    state: ConnectionState,
    writer: SplitSink<WsStream, Message>,
}

/// Read side of the chat connection.
pub struct ChatFrames {
    reader: SplitStream<WsStream>,
}

impl ChatChannel {
    /// Open the chat channel at `url` (e.g. `ws://localhost:8000/ws/chat`).
    ///
    /// A failed handshake is returned as an error; the caller treats the
    /// session as closed.
    pub async fn connect(url: &str) -> Result<(Self, ChatFrames), ClientError> {
        let mut state = ConnectionState::default();
        state.begin_connect()?;
        info!(url = %url, "Connecting to chat channel");

        let (stream, response) = connect_async(url)
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        state.mark_open()?;
        info!(url = %url, status = %response.status(), "Chat channel connected");

        let (writer, reader) = stream.split();
        Ok((
            Self {
                url: url.to_string(),
                state,
                writer,
            },
            ChatFrames { reader },
        ))
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Serialize and send a question.
    pub async fn send_question(&mut self, question: &OutboundQuestion) -> Result<(), ClientError> {
        if !self.state.is_open() {
            return Err(ClientError::NotOpen(self.state));
        }

        let json = question.to_json()?;
        debug!(bytes = json.len(), documents = question.file_paths.len(), "Sending question frame");
        self.writer.send(Message::Text(json)).await?;
        Ok(())
    }

    /// Close the channel from this side.
    ///
    /// Only an open channel sends a close frame; returns whether one was
    /// sent. Closing a channel that is already closed is a no-op.
    pub async fn close(&mut self) -> Result<bool, ClientError> {
        if !self.state.request_close() {
            debug!(state = %self.state, "Close skipped, channel not open");
            return Ok(false);
        }

        info!(url = %self.url, "Closing chat channel");
        self.writer.send(Message::Close(None)).await?;
        Ok(true)
    }

    /// Record that the remote side closed the connection.
    pub fn mark_remote_closed(&mut self) {
        if let Err(e) = self.state.mark_closed() {
            debug!(error = %e, "Remote close on a channel that was not open");
        }
    }
}

impl ChatFrames {
    /// Wait for the next text frame.
    ///
    /// Returns `None` once the remote side closed the connection or the
    /// stream ended. Control and binary frames are skipped.
    pub async fn next_frame(&mut self) -> Option<Result<String, ClientError>> {
        loop {
            let message = match self.reader.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(e.into())),
            };

            match message {
                Message::Text(text) => return Some(Ok(text)),
                Message::Binary(bytes) => {
                    warn!(bytes = bytes.len(), "Binary chat frame ignored");
                    continue;
                }
                Message::Close(frame) => {
                    info!(frame = ?frame, "Chat channel closed by remote");
                    return None;
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
    }
}
