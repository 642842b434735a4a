//! UI state for rendering.

use std::time::{Duration, Instant};

use docchat_core::{ChatSession, DocumentRegistry, SessionOptions};

/// How long the upload outcome stays on screen.
pub const UPLOAD_STATUS_TTL: Duration = Duration::from_secs(5);

/// How long the progress bar stays on screen after an upload ends.
pub const UPLOAD_PROGRESS_TTL: Duration = Duration::from_secs(3);

pub const UPLOAD_SUCCESS_MESSAGE: &str = "Documento enviado com sucesso!";

pub const UPLOAD_FAILED_MESSAGE: &str =
    "Falha ao fazer upload dos arquivos. Por favor, tente novamente.";

/// Which pane receives key presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Input,
    Documents,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Focus::Input => Focus::Documents,
            Focus::Documents => Focus::Input,
        }
    }
}

/// Outcome line shown in the uploader.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UploadStatus {
    #[default]
    Idle,
    Uploading { filename: String },
    Succeeded { message: String },
    Failed { message: String },
}

/// Uploader state: status line, progress bar and their expiry.
#[derive(Debug, Clone, Default)]
pub struct UploadState {
    pub status: UploadStatus,
    pub progress: u8,
    status_until: Option<Instant>,
    progress_until: Option<Instant>,
}

impl UploadState {
    pub fn is_uploading(&self) -> bool {
        matches!(self.status, UploadStatus::Uploading { .. })
    }

    pub fn start(&mut self, filename: String) {
        self.status = UploadStatus::Uploading { filename };
        self.progress = 0;
        self.status_until = None;
        self.progress_until = None;
    }

    pub fn advance(&mut self, percent: u8) {
        if self.is_uploading() {
            self.progress = percent.min(100);
        }
    }

    pub fn succeed(&mut self, now: Instant) {
        self.status = UploadStatus::Succeeded {
            message: UPLOAD_SUCCESS_MESSAGE.to_string(),
        };
        self.progress = 100;
        self.schedule_reset(now);
    }

    pub fn fail(&mut self, now: Instant) {
        self.status = UploadStatus::Failed {
            message: UPLOAD_FAILED_MESSAGE.to_string(),
        };
        self.schedule_reset(now);
    }

    /// Clear the status and progress once their time is up.
    pub fn expire(&mut self, now: Instant) {
        if self.status_until.is_some_and(|t| now >= t) {
            self.status = UploadStatus::Idle;
            self.status_until = None;
        }
        if self.progress_until.is_some_and(|t| now >= t) {
            self.progress = 0;
            self.progress_until = None;
        }
    }

    fn schedule_reset(&mut self, now: Instant) {
        self.status_until = Some(now + UPLOAD_STATUS_TTL);
        self.progress_until = Some(now + UPLOAD_PROGRESS_TTL);
    }
}

/// Everything the UI thread owns (no async, no locks).
#[derive(Debug)]
pub struct UiState {
    /// Chat session for the current mount.
    pub session: ChatSession,

    /// Polled documents plus selection.
    pub registry: DocumentRegistry,

    /// Pane receiving keys.
    pub focus: Focus,

    /// Highlighted row in the document list.
    pub doc_cursor: usize,

    /// Chat scroll offset (usize::MAX = follow the latest message).
    pub chat_scroll: usize,

    pub upload: UploadState,

    /// Path being typed in the upload dialog, when open.
    pub upload_prompt: Option<String>,

    /// Backend base URL, shown in the header.
    pub server: String,

    session_options: SessionOptions,
}

impl UiState {
    pub fn new(session_options: SessionOptions, server: impl Into<String>) -> Self {
        Self {
            session: ChatSession::new(session_options),
            registry: DocumentRegistry::new(),
            focus: Focus::default(),
            doc_cursor: 0,
            chat_scroll: usize::MAX,
            upload: UploadState::default(),
            upload_prompt: None,
            server: server.into(),
            session_options,
        }
    }

    /// Replace the chat session with a fresh one. Document selection survives.
    pub fn reset_session(&mut self) {
        self.session = ChatSession::new(self.session_options);
        self.chat_scroll = usize::MAX;
    }

    pub fn select_next_doc(&mut self) {
        if self.doc_cursor + 1 < self.registry.documents.len() {
            self.doc_cursor += 1;
        }
    }

    pub fn select_prev_doc(&mut self) {
        self.doc_cursor = self.doc_cursor.saturating_sub(1);
    }

    /// Keep the cursor inside the listing after a refresh.
    pub fn clamp_doc_cursor(&mut self) {
        let len = self.registry.documents.len();
        if self.doc_cursor >= len {
            self.doc_cursor = len.saturating_sub(1);
        }
    }

    pub fn toggle_current_doc(&mut self) -> Option<bool> {
        self.registry.toggle_at(self.doc_cursor)
    }

    pub fn scroll_chat_up(&mut self, lines: usize, max_scroll: usize) {
        let current = self.chat_scroll.min(max_scroll);
        self.chat_scroll = current.saturating_sub(lines);
    }

    pub fn scroll_chat_down(&mut self, lines: usize, max_scroll: usize) {
        let target = self.chat_scroll.saturating_add(lines);
        self.chat_scroll = if target >= max_scroll { usize::MAX } else { target };
    }

    /// "N documento(s) selecionado(s)" or the empty-selection text.
    pub fn selection_summary(&self) -> String {
        selection_summary(self.registry.selection.len())
    }
}

pub fn selection_summary(count: usize) -> String {
    if count == 0 {
        "Nenhum documento selecionado".to_string()
    } else {
        format!("{} documento(s) selecionado(s)", count)
    }
}
