//! Chat session controller.
//!
//! [`ChatSession`] is the single owner of a mounted chat view's state: the
//! connection lifecycle, the append-only message log, the pending flag and
//! the sources of the latest answer. It never touches the network. Callers
//! report connection events and inbound frames, and transmit whatever
//! [`ChatSession::send_question`] hands back.

use tracing::{debug, info, warn};

use crate::chat::{ChatMessage, SourceExcerpt};
use crate::connection::ConnectionState;
use crate::error::CoreError;
use crate::protocol::{InboundFrame, OutboundQuestion};

/// Prefix of assistant messages that carry a backend error.
pub const ERROR_LABEL: &str = "Erro: ";

/// Behavior switches for a session.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    /// Clear the pending flag when an undecodable frame arrives.
    ///
    /// Off by default: a malformed frame leaves the session waiting, and
    /// only a remount gets it back.
    pub release_pending_on_malformed: bool,
}

/// What an inbound frame did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// An answer was appended.
    Answered,
    /// A backend error was appended.
    Failed,
    /// Valid frame with nothing to act on.
    Ignored,
    /// Frame could not be decoded.
    Malformed,
}

/// State of one mounted chat view.
#[derive(Debug, Default)]
pub struct ChatSession {
    options: SessionOptions,
    connection: ConnectionState,
    messages: Vec<ChatMessage>,
    pending: bool,
    sources: Vec<SourceExcerpt>,
    draft: String,
}

impl ChatSession {
    /// Create an unmounted-connection session.
    pub fn new(options: SessionOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    /// Message log, oldest first.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Sources of the latest answer that carried any.
    pub fn sources(&self) -> &[SourceExcerpt] {
        &self.sources
    }

    /// True between a sent question and its answer or error.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Current input text.
    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn push_draft(&mut self, ch: char) {
        self.draft.push(ch);
    }

    pub fn pop_draft(&mut self) {
        self.draft.pop();
    }

    /// Whether `text` would be accepted by [`Self::send_question`] right now.
    pub fn can_send(&self, text: &str) -> bool {
        !text.trim().is_empty() && !self.pending && self.connection.is_open()
    }

    /// The connection attempt started.
    pub fn connection_started(&mut self) -> Result<(), CoreError> {
        self.connection.begin_connect()
    }

    /// The handshake completed.
    pub fn connection_opened(&mut self) -> Result<(), CoreError> {
        self.connection.mark_open()?;
        info!("Chat connection open");
        Ok(())
    }

    /// The remote side closed the connection, or the handshake failed.
    pub fn connection_closed(&mut self) -> Result<(), CoreError> {
        self.connection.mark_closed()?;
        info!(pending = self.pending, "Chat connection closed");
        Ok(())
    }

    /// Local teardown. Returns true if a close must be sent on the wire.
    pub fn request_close(&mut self) -> bool {
        let issue = self.connection.request_close();
        debug!(issue_close = issue, state = %self.connection, "Close requested");
        issue
    }

    /// Send a question scoped to `selected` documents.
    ///
    /// Returns the frame to transmit, or `None` without touching any state
    /// when the text is blank, a question is already pending, or the
    /// connection is not open.
    pub fn send_question(&mut self, text: &str, selected: &[String]) -> Option<OutboundQuestion> {
        if !self.can_send(text) {
            debug!(
                pending = self.pending,
                state = %self.connection,
                "Send refused"
            );
            return None;
        }

        let question = text.trim();
        self.append(ChatMessage::user(question));
        self.pending = true;
        self.sources.clear();

        let frame = OutboundQuestion::new(question, selected.to_vec());
        info!(
            question_len = question.len(),
            documents = frame.file_paths.len(),
            "Question sent"
        );
        Some(frame)
    }

    /// Send the current draft, clearing it when the send goes through.
    pub fn submit_draft(&mut self, selected: &[String]) -> Option<OutboundQuestion> {
        let draft = std::mem::take(&mut self.draft);
        let frame = self.send_question(&draft, selected);
        if frame.is_none() {
            self.draft = draft;
        }
        frame
    }

    /// Handle one raw inbound text frame.
    pub fn handle_frame(&mut self, raw: &str) -> FrameOutcome {
        match InboundFrame::decode(raw) {
            Ok(frame) => self.apply_frame(frame),
            Err(e) => {
                warn!(error = %e, raw_len = raw.len(), "Failed to parse chat frame");
                if self.options.release_pending_on_malformed {
                    self.pending = false;
                }
                FrameOutcome::Malformed
            }
        }
    }

    /// Apply an already decoded frame.
    pub fn apply_frame(&mut self, frame: InboundFrame) -> FrameOutcome {
        match frame {
            InboundFrame::Error(error) => {
                warn!(error = %error, "Backend reported an error");
                self.append(ChatMessage::assistant(format!("{}{}", ERROR_LABEL, error)));
                self.pending = false;
                FrameOutcome::Failed
            }
            InboundFrame::Answer { answer, sources } => {
                self.append(ChatMessage::assistant(answer));
                if let Some(sources) = sources {
                    debug!(count = sources.len(), "Sources replaced");
                    self.sources = sources;
                }
                self.pending = false;
                FrameOutcome::Answered
            }
            InboundFrame::Unrecognized => {
                debug!("Ignoring unrecognized frame");
                FrameOutcome::Ignored
            }
        }
    }

    fn append(&mut self, message: ChatMessage) {
        debug!(message_id = %message.id, role = ?message.role, "Message appended");
        self.messages.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatRole;
    use serde_json::json;

    fn open_session() -> ChatSession {
        let mut session = ChatSession::new(SessionOptions::default());
        session.connection_started().unwrap();
        session.connection_opened().unwrap();
        session
    }

    fn answer_with_sources(answer: &str, sources: &[&str]) -> String {
        let sources: Vec<_> = sources.iter().map(|s| json!({ "content": s })).collect();
        json!({ "answer": answer, "sources": sources }).to_string()
    }

    #[test]
    fn test_send_appends_and_marks_pending() {
        let mut session = open_session();
        let selected = vec!["docs/a.pdf".to_string(), "docs/b.md".to_string()];

        let frame = session.send_question("  hello  ", &selected).unwrap();

        assert_eq!(frame.question, "hello");
        assert_eq!(frame.top_k, 5);
        assert_eq!(frame.file_paths, selected);
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, ChatRole::User);
        assert_eq!(session.messages()[0].content, "hello");
        assert!(session.is_pending());
    }

    #[test]
    fn test_send_without_selection_has_empty_paths() {
        let mut session = open_session();
        let frame = session.send_question("hi", &[]).unwrap();
        assert!(frame.file_paths.is_empty());
        let value: serde_json::Value = serde_json::from_str(&frame.to_json().unwrap()).unwrap();
        assert_eq!(value["file_paths"], json!([]));
    }

    #[test]
    fn test_send_clears_sources() {
        let mut session = open_session();
        session.send_question("first", &[]).unwrap();
        session.handle_frame(&answer_with_sources("a", &["s1"]));
        assert_eq!(session.sources().len(), 1);

        session.send_question("second", &[]).unwrap();
        assert!(session.sources().is_empty());
    }

    #[test]
    fn test_send_refused_for_blank_input() {
        let mut session = open_session();
        assert!(session.send_question("", &[]).is_none());
        assert!(session.send_question(" \n\t ", &[]).is_none());
        assert!(session.messages().is_empty());
        assert!(!session.is_pending());
    }

    #[test]
    fn test_send_refused_while_pending() {
        let mut session = open_session();
        session.send_question("first", &[]).unwrap();
        assert!(session.send_question("second", &[]).is_none());
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn test_send_refused_unless_open() {
        let mut session = ChatSession::new(SessionOptions::default());
        assert!(session.send_question("hi", &[]).is_none());

        session.connection_started().unwrap();
        assert!(session.send_question("hi", &[]).is_none());
        assert!(session.messages().is_empty());
        assert!(!session.is_pending());
    }

    #[test]
    fn test_answer_resolves_pending() {
        let mut session = open_session();
        session.send_question("q", &[]).unwrap();

        let outcome = session.handle_frame(r#"{"answer": "It contains X."}"#);

        assert_eq!(outcome, FrameOutcome::Answered);
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[1].role, ChatRole::Assistant);
        assert_eq!(session.messages()[1].content, "It contains X.");
        assert!(!session.is_pending());
    }

    #[test]
    fn test_sources_replaced_not_merged() {
        let mut session = open_session();
        session.handle_frame(&answer_with_sources("a", &["s1", "s2"]));
        session.handle_frame(&answer_with_sources("b", &["s3"]));

        let contents: Vec<_> = session.sources().iter().map(|s| s.content.as_str()).collect();
        assert_eq!(contents, vec!["s3"]);
    }

    #[test]
    fn test_missing_sources_leave_previous_set() {
        let mut session = open_session();
        session.handle_frame(&answer_with_sources("a", &["s1"]));
        session.handle_frame(r#"{"answer": "b"}"#);
        assert_eq!(session.sources().len(), 1);
        assert_eq!(session.sources()[0].content, "s1");
    }

    #[test]
    fn test_error_frame_is_labelled() {
        let mut session = open_session();
        session.send_question("q", &[]).unwrap();

        let outcome = session.handle_frame(r#"{"error": "Question is required"}"#);

        assert_eq!(outcome, FrameOutcome::Failed);
        let last = session.messages().last().unwrap();
        assert_eq!(last.role, ChatRole::Assistant);
        assert!(last.content.starts_with(ERROR_LABEL));
        assert_eq!(last.content, "Erro: Question is required");
        assert!(!session.is_pending());

        // The session stays usable after a backend error.
        assert!(session.send_question("again", &[]).is_some());
    }

    #[test]
    fn test_malformed_frame_keeps_pending() {
        let mut session = open_session();
        session.send_question("q", &[]).unwrap();

        assert_eq!(session.handle_frame("{oops"), FrameOutcome::Malformed);
        assert_eq!(session.messages().len(), 1);
        assert!(session.is_pending());
    }

    #[test]
    fn test_malformed_frame_can_release_pending() {
        let mut session = ChatSession::new(SessionOptions {
            release_pending_on_malformed: true,
        });
        session.connection_started().unwrap();
        session.connection_opened().unwrap();
        session.send_question("q", &[]).unwrap();

        assert_eq!(session.handle_frame("not json"), FrameOutcome::Malformed);
        assert_eq!(session.messages().len(), 1);
        assert!(!session.is_pending());
    }

    #[test]
    fn test_unrecognized_frame_changes_nothing() {
        let mut session = open_session();
        session.send_question("q", &[]).unwrap();

        assert_eq!(
            session.handle_frame(r#"{"status": "working"}"#),
            FrameOutcome::Ignored
        );
        assert_eq!(session.messages().len(), 1);
        assert!(session.is_pending());
    }

    #[test]
    fn test_question_and_answer_scenario() {
        let mut session = open_session();
        let selected = vec!["docs/a.pdf".to_string()];

        let frame = session.send_question("What is in doc A?", &selected).unwrap();
        let wire: serde_json::Value = serde_json::from_str(&frame.to_json().unwrap()).unwrap();
        assert_eq!(
            wire,
            json!({
                "question": "What is in doc A?",
                "top_k": 5,
                "file_paths": ["docs/a.pdf"]
            })
        );

        session.handle_frame(&answer_with_sources("It contains X.", &["X details"]));

        let roles: Vec<_> = session.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![ChatRole::User, ChatRole::Assistant]);
        assert_eq!(session.sources().len(), 1);
        assert_eq!(session.sources()[0].content, "X details");
        assert!(!session.is_pending());
    }

    #[test]
    fn test_closed_connection_refuses_sends() {
        let mut session = open_session();
        session.send_question("q", &[]).unwrap();
        session.handle_frame(r#"{"answer": "a"}"#);
        session.connection_closed().unwrap();

        assert!(session.send_question("after close", &[]).is_none());
        assert_eq!(session.messages().len(), 2);
        assert!(!session.is_pending());
        assert!(!session.request_close());
    }

    #[test]
    fn test_request_close_from_open() {
        let mut session = open_session();
        assert!(session.request_close());
        assert_eq!(session.connection(), ConnectionState::Closed);
        assert!(session.connection_closed().is_err());
    }

    #[test]
    fn test_submit_draft_clears_only_on_send() {
        let mut session = ChatSession::new(SessionOptions::default());
        session.set_draft("waiting for connection");
        assert!(session.submit_draft(&[]).is_none());
        assert_eq!(session.draft(), "waiting for connection");

        session.connection_started().unwrap();
        session.connection_opened().unwrap();
        let frame = session.submit_draft(&[]).unwrap();
        assert_eq!(frame.question, "waiting for connection");
        assert_eq!(session.draft(), "");
    }

    #[test]
    fn test_draft_editing() {
        let mut session = ChatSession::default();
        session.push_draft('h');
        session.push_draft('i');
        session.pop_draft();
        assert_eq!(session.draft(), "h");
    }
}
