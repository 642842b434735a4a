//! Application state and main event loop.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::DefaultTerminal;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::event::{BackendCommand, UiEvent};
use crate::state::{Focus, UiState};
use crate::ui;

/// Rows moved per PageUp/PageDown.
const SCROLL_STEP: usize = 5;

/// Main application with UI state and channel handles.
pub struct App {
    /// Current UI state for rendering.
    state: UiState,

    /// Receiver for events from the backend.
    ui_rx: mpsc::Receiver<UiEvent>,

    /// Sender for commands to the backend.
    cmd_tx: mpsc::Sender<BackendCommand>,

    /// Rows of chat that do not fit on screen, from the last draw.
    chat_overflow: usize,
}

impl App {
    /// Create a new application instance with channel handles.
    pub fn new(
        state: UiState,
        ui_rx: mpsc::Receiver<UiEvent>,
        cmd_tx: mpsc::Sender<BackendCommand>,
    ) -> Self {
        Self {
            state,
            ui_rx,
            cmd_tx,
            chat_overflow: 0,
        }
    }

    /// Run the main event loop.
    ///
    /// This runs on the main thread and handles:
    /// - Drawing the UI
    /// - Processing keyboard input
    /// - Receiving updates from the backend
    pub fn run(&mut self, mut terminal: DefaultTerminal) -> std::io::Result<()> {
        loop {
            self.state.upload.expire(Instant::now());

            let completed = terminal.draw(|frame| ui::render(frame, &self.state))?;
            self.chat_overflow = chat_overflow(&self.state, completed.area);

            // Poll terminal events (non-blocking with short timeout)
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press && self.handle_key(key) {
                        break; // quit requested
                    }
                }
            }

            // Process backend events (non-blocking)
            while let Ok(event) = self.ui_rx.try_recv() {
                self.apply_event(event, Instant::now());
            }
        }

        // Close the channel (if open) and stop the backend
        let _ = self.cmd_tx.blocking_send(BackendCommand::Quit);

        Ok(())
    }

    fn send(&self, command: BackendCommand) {
        if let Err(e) = self.cmd_tx.blocking_send(command) {
            warn!(error = %e, "Backend is gone, command dropped");
        }
    }

    /// Apply an event from the backend to the UI state.
    fn apply_event(&mut self, event: UiEvent, now: Instant) {
        let session = &mut self.state.session;
        match event {
            UiEvent::ChannelConnecting => {
                if let Err(e) = session.connection_started() {
                    warn!(error = %e, "Unexpected connecting event");
                }
            }
            UiEvent::ChannelOpened => {
                if let Err(e) = session.connection_opened() {
                    warn!(error = %e, "Unexpected open event");
                }
            }
            UiEvent::ChannelClosed => {
                if let Err(e) = session.connection_closed() {
                    warn!(error = %e, "Unexpected close event");
                }
            }
            UiEvent::FrameReceived(raw) => {
                let outcome = session.handle_frame(&raw);
                debug!(outcome = ?outcome, "Frame applied");
                self.state.chat_scroll = usize::MAX;
            }
            UiEvent::SessionReset => {
                info!("Chat session reset");
                self.state.reset_session();
            }
            UiEvent::DocumentsFetching => {
                self.state.registry.begin_fetch();
            }
            UiEvent::DocumentsUpdated(documents) => {
                self.state.registry.apply_listing(documents);
                self.state.clamp_doc_cursor();
            }
            UiEvent::DocumentsFailed(error) => {
                debug!(error = %error, "Document listing failed");
                self.state.registry.apply_failure();
            }
            UiEvent::UploadStarted(filename) => {
                self.state.upload.start(filename);
            }
            UiEvent::UploadProgress(percent) => {
                self.state.upload.advance(percent);
            }
            UiEvent::UploadFinished(Ok(receipt)) => {
                info!(chunks = ?receipt.chunks, saved = ?receipt.file_saved, "Upload finished");
                self.state.upload.succeed(now);
                self.send(BackendCommand::RefreshDocuments);
            }
            UiEvent::UploadFinished(Err(error)) => {
                warn!(error = %error, "Upload failed");
                self.state.upload.fail(now);
            }
        }
    }

    /// Handle a key press.
    ///
    /// Returns true if the app should quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if ctrl && key.code == KeyCode::Char('c') {
            return true;
        }
        if self.state.upload_prompt.is_some() {
            self.handle_upload_prompt_key(key.code);
            return false;
        }

        match key.code {
            KeyCode::Esc => return true,
            KeyCode::Tab | KeyCode::BackTab => {
                self.state.focus = self.state.focus.next();
            }
            KeyCode::PageUp => {
                self.state.scroll_chat_up(SCROLL_STEP, self.chat_overflow);
            }
            KeyCode::PageDown => {
                self.state.scroll_chat_down(SCROLL_STEP, self.chat_overflow);
            }
            KeyCode::Char('r') if ctrl => {
                info!("Remount requested");
                self.send(BackendCommand::Remount);
            }
            KeyCode::Char('u') if ctrl => self.open_upload_prompt(),
            _ => match self.state.focus {
                Focus::Input => self.handle_input_key(key.code),
                Focus::Documents => self.handle_documents_key(key.code),
            },
        }
        false
    }

    fn handle_input_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Enter => {
                let selected = self.state.registry.selected_paths().to_vec();
                if let Some(question) = self.state.session.submit_draft(&selected) {
                    self.state.chat_scroll = usize::MAX;
                    self.send(BackendCommand::SendQuestion(question));
                }
            }
            KeyCode::Char(c) => self.state.session.push_draft(c),
            KeyCode::Backspace => self.state.session.pop_draft(),
            _ => {}
        }
    }

    fn handle_documents_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Up | KeyCode::Char('k') => self.state.select_prev_doc(),
            KeyCode::Down | KeyCode::Char('j') => self.state.select_next_doc(),
            KeyCode::Char(' ') | KeyCode::Enter => {
                self.state.toggle_current_doc();
            }
            KeyCode::Char('a') => self.state.registry.toggle_all(),
            KeyCode::Char('r') => self.send(BackendCommand::RefreshDocuments),
            KeyCode::Char('u') => self.open_upload_prompt(),
            _ => {}
        }
    }

    fn open_upload_prompt(&mut self) {
        if self.state.upload.is_uploading() {
            debug!("Upload already running");
            return;
        }
        self.state.upload_prompt = Some(String::new());
    }

    fn handle_upload_prompt_key(&mut self, code: KeyCode) {
        let Some(prompt) = self.state.upload_prompt.as_mut() else {
            return;
        };
        match code {
            KeyCode::Esc => {
                self.state.upload_prompt = None;
            }
            KeyCode::Enter => {
                let path = prompt.trim().to_string();
                self.state.upload_prompt = None;
                if !path.is_empty() {
                    self.send(BackendCommand::Upload(PathBuf::from(path)));
                }
            }
            KeyCode::Char(c) => prompt.push(c),
            KeyCode::Backspace => {
                prompt.pop();
            }
            _ => {}
        }
    }
}

/// Chat rows hidden above the viewport when following the bottom.
fn chat_overflow(state: &UiState, area: ratatui::layout::Rect) -> usize {
    // Mirrors the chat pane geometry in `ui::render`: header 3, footer 1,
    // sidebar 35%, borders 2, input 3 and the sources pane when shown.
    let body_height = area.height.saturating_sub(4);
    let chat_width = area.width - (u32::from(area.width) * 35 / 100) as u16;
    let sources_height = if state.session.sources().is_empty() {
        0
    } else {
        (body_height / 3).max(4)
    };
    let visible = body_height.saturating_sub(3 + sources_height + 2) as usize;
    let total = ui::chat_lines(state, chat_width.saturating_sub(2) as usize).len();
    total.saturating_sub(visible)
}
