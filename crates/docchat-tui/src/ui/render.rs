//! Main render function for the TUI.

use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph};
use ratatui::Frame;

use docchat_core::document::{format_file_size, RegistryView};
use docchat_core::{format_text, ChatRole, ConnectionState, DocumentRegistry};

use super::markup::{render_markup, render_plain};
use crate::state::{selection_summary, Focus, UiState, UploadStatus};

const WELCOME_TITLE: &str = "Bem-vindo ao IA do Super Cérebro!";
const WELCOME_TEXT: &str =
    "Faça perguntas sobre os documentos carregados e receba respostas baseadas no conteúdo.";

/// Render the entire UI.
pub fn render(frame: &mut Frame, state: &UiState) {
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    render_header(frame, header_area, state);

    let [sidebar_area, chat_area] =
        Layout::horizontal([Constraint::Percentage(35), Constraint::Fill(1)]).areas(body_area);
    render_sidebar(frame, sidebar_area, state);
    render_chat_column(frame, chat_area, state);

    render_footer(frame, footer_area, state);

    if let Some(prompt) = &state.upload_prompt {
        render_upload_dialog(frame, prompt);
    }
}

fn connection_span(connection: ConnectionState) -> Span<'static> {
    match connection {
        ConnectionState::Disconnected => {
            Span::styled("Desconectado", Style::default().fg(Color::Gray))
        }
        ConnectionState::Connecting => {
            Span::styled("Conectando...", Style::default().fg(Color::Yellow))
        }
        ConnectionState::Open => Span::styled("Conectado", Style::default().fg(Color::Green)),
        ConnectionState::Closed => Span::styled(
            "Conexão encerrada (Ctrl-R para reconectar)",
            Style::default().fg(Color::Red),
        ),
    }
}

/// Header: title, connection state and the selection filter.
fn render_header(frame: &mut Frame, area: Rect, state: &UiState) {
    let mut spans = vec![
        connection_span(state.session.connection()),
        Span::styled(format!("  {}", state.server), Style::default().fg(Color::DarkGray)),
    ];
    let selected = state.registry.selection.len();
    if selected > 0 {
        spans.push(Span::styled(
            format!("  ({} documento(s) selecionado(s))", selected),
            Style::default().fg(Color::Cyan),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" IA do Super Cérebro ")
            .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
    );
    frame.render_widget(header, area);
}

fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

/// Sidebar: document list above the uploader.
fn render_sidebar(frame: &mut Frame, area: Rect, state: &UiState) {
    let [list_area, upload_area] =
        Layout::vertical([Constraint::Fill(1), Constraint::Length(5)]).areas(area);
    render_documents(frame, list_area, state);
    render_uploader(frame, upload_area, state);
}

/// A poll over an existing listing keeps the rows and flags it in the title.
fn documents_title(registry: &DocumentRegistry) -> &'static str {
    if registry.is_loading() && !registry.documents.is_empty() {
        " Documentos Carregados (atualizando...) "
    } else {
        " Documentos Carregados "
    }
}

fn render_documents(frame: &mut Frame, area: Rect, state: &UiState) {
    let focused = state.focus == Focus::Documents;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(focused))
        .title(documents_title(&state.registry));

    let registry = &state.registry;
    let lines: Vec<Line> = match registry.view() {
        RegistryView::Loading => vec![Line::from(Span::styled(
            "Carregando documentos...",
            Style::default().fg(Color::Yellow),
        ))],
        RegistryView::Error(message) => vec![Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(Color::Red),
        ))],
        RegistryView::Empty => vec![Line::from(Span::styled(
            "Nenhum documento carregado ainda.",
            Style::default().fg(Color::Gray),
        ))],
        RegistryView::Listing => {
            let visible = area.height.saturating_sub(4) as usize;
            let offset = state.doc_cursor.saturating_sub(visible.saturating_sub(1));

            let mut lines = vec![
                Line::from(format!(
                    "{} Desmarcar/Selecionar todos",
                    checkbox(registry.all_selected())
                )),
                Line::from(Span::styled(
                    selection_summary(registry.selection.len()),
                    Style::default().fg(Color::DarkGray),
                )),
            ];
            for (index, doc) in registry
                .documents
                .iter()
                .enumerate()
                .skip(offset)
                .take(visible)
            {
                let selected = registry.selection.contains(&doc.file_path);
                let row_style = if focused && index == state.doc_cursor {
                    Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                lines.push(
                    Line::from(vec![
                        Span::raw(format!("{} {} ", checkbox(selected), doc.icon())),
                        Span::styled(doc.filename.clone(), Style::default().fg(Color::White)),
                        Span::styled(
                            format!("  {}  {}", doc.upload_time, format_file_size(doc.size)),
                            Style::default().fg(Color::DarkGray),
                        ),
                    ])
                    .style(row_style),
                );
            }
            lines
        }
    };

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn checkbox(checked: bool) -> &'static str {
    if checked {
        "[x]"
    } else {
        "[ ]"
    }
}

fn render_uploader(frame: &mut Frame, area: Rect, state: &UiState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(false))
        .title(" Enviar Documento ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [status_area, gauge_area] =
        Layout::vertical([Constraint::Length(2), Constraint::Length(1)]).areas(inner);

    let status = match &state.upload.status {
        UploadStatus::Idle => Line::from(Span::styled(
            "u: escolher arquivo (.pdf, .md, .txt)",
            Style::default().fg(Color::DarkGray),
        )),
        UploadStatus::Uploading { filename } => Line::from(Span::styled(
            format!("Enviando {}...", filename),
            Style::default().fg(Color::Yellow),
        )),
        UploadStatus::Succeeded { message } => {
            Line::from(Span::styled(message.clone(), Style::default().fg(Color::Green)))
        }
        UploadStatus::Failed { message } => {
            Line::from(Span::styled(message.clone(), Style::default().fg(Color::Red)))
        }
    };
    frame.render_widget(Paragraph::new(status), status_area);

    if state.upload.progress > 0 {
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(Color::Cyan))
            .percent(u16::from(state.upload.progress));
        frame.render_widget(gauge, gauge_area);
    }
}

/// Chat column: messages, optional sources, input.
fn render_chat_column(frame: &mut Frame, area: Rect, state: &UiState) {
    let sources_height = if state.session.sources().is_empty() {
        0
    } else {
        (area.height / 3).max(4)
    };
    let [messages_area, sources_area, input_area] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(sources_height),
        Constraint::Length(3),
    ])
    .areas(area);

    render_messages(frame, messages_area, state);
    if sources_height > 0 {
        render_sources(frame, sources_area, state);
    }
    render_input(frame, input_area, state);
}

/// All chat rows for a pane of `width` columns.
pub fn chat_lines(state: &UiState, width: usize) -> Vec<Line<'static>> {
    let session = &state.session;
    let mut lines: Vec<Line<'static>> = Vec::new();

    if session.messages().is_empty() {
        lines.push(Line::from(Span::styled(
            WELCOME_TITLE,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )));
        let scope = match state.registry.selection.len() {
            0 => " Você está conversando com todos os documentos disponíveis.".to_string(),
            n => format!(" Você está conversando com {} documento(s) selecionado(s).", n),
        };
        lines.extend(render_plain(&format!("{}{}", WELCOME_TEXT, scope), width, ""));
    }

    for message in session.messages() {
        let (label, style) = match message.role {
            ChatRole::User => ("Você", Style::default().fg(Color::Green)),
            ChatRole::Assistant => ("Assistente", Style::default().fg(Color::Magenta)),
        };
        let mut header = vec![Span::styled(label, style.add_modifier(Modifier::BOLD))];
        if let Some(created_at) = message.created_at {
            header.push(Span::styled(
                format!(" {}", created_at.format("%H:%M:%S")),
                Style::default().fg(Color::DarkGray),
            ));
        }
        lines.push(Line::from(header));

        match message.role {
            ChatRole::User => lines.extend(render_plain(&message.content, width, "  ")),
            ChatRole::Assistant => {
                lines.extend(render_markup(&format_text(&message.content), width, "  "))
            }
        }
        lines.push(Line::from(""));
    }

    if session.is_pending() {
        lines.push(Line::from(vec![
            Span::styled(
                "Assistente",
                Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
            ),
            Span::styled(" digitando...", Style::default().fg(Color::DarkGray)),
        ]));
    }

    lines
}

fn render_messages(frame: &mut Frame, area: Rect, state: &UiState) {
    let visible_height = area.height.saturating_sub(2) as usize;
    let text_width = area.width.saturating_sub(2) as usize;

    let all_lines = chat_lines(state, text_width);
    let total_lines = all_lines.len();

    let max_scroll = total_lines.saturating_sub(visible_height);
    let scroll_offset = state.chat_scroll.min(max_scroll);

    let lines: Vec<Line> = all_lines
        .into_iter()
        .skip(scroll_offset)
        .take(visible_height)
        .collect();

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style(state.focus == Focus::Input))
            .title(" Chat "),
    );
    frame.render_widget(paragraph, area);
}

fn render_sources(frame: &mut Frame, area: Rect, state: &UiState) {
    let text_width = area.width.saturating_sub(2) as usize;
    let mut lines: Vec<Line> = Vec::new();

    for (index, source) in state.session.sources().iter().enumerate() {
        let mut title = vec![Span::styled(
            format!("Fonte {}", index + 1),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )];
        if let Some(origin) = source.origin() {
            title.push(Span::styled(
                format!("  {}", origin),
                Style::default().fg(Color::DarkGray),
            ));
        }
        lines.push(Line::from(title));
        lines.extend(render_markup(&format_text(&source.content), text_width, "  "));
    }

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style(false))
            .title(" Fontes de Informação "),
    );
    frame.render_widget(paragraph, area);
}

fn render_input(frame: &mut Frame, area: Rect, state: &UiState) {
    let focused = state.focus == Focus::Input;
    let draft = state.session.draft();

    let line = if draft.is_empty() {
        Line::from(Span::styled(
            "Digite sua pergunta...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from(draft.to_string())
    };

    let title = if state.session.can_send(draft) {
        " Pergunta (Enter: Enviar) "
    } else {
        " Pergunta "
    };

    let input = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style(focused))
            .title(title),
    );
    frame.render_widget(input, area);

    if focused && state.upload_prompt.is_none() {
        let cursor_x = area.x + 1 + unicode_width::UnicodeWidthStr::width(draft) as u16;
        frame.set_cursor_position((cursor_x.min(area.right().saturating_sub(2)), area.y + 1));
    }
}

fn render_footer(frame: &mut Frame, area: Rect, state: &UiState) {
    let help = match state.focus {
        Focus::Input => " Tab: documentos | Enter: enviar | Ctrl-U: upload | Ctrl-R: reconectar | Esc: sair ",
        Focus::Documents => " Tab: chat | Espaço: marcar | a: todos | u: upload | r: atualizar | Esc: sair ",
    };

    let footer = Line::from(vec![
        Span::styled(
            state.selection_summary(),
            Style::default().fg(Color::Green),
        ),
        Span::raw(" | "),
        Span::styled(help, Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(footer), area);
}

/// Create a centered rectangle within the given area.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

fn render_upload_dialog(frame: &mut Frame, prompt: &str) {
    let area = centered_rect(60, 5, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(Span::styled(
            "Caminho do arquivo (.pdf, .md, .txt):",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(prompt.to_string()),
    ];
    let dialog = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Enviar Documento (Enter: enviar, Esc: cancelar) "),
    );
    frame.render_widget(dialog, area);

    let cursor_x = area.x + 1 + unicode_width::UnicodeWidthStr::width(prompt) as u16;
    frame.set_cursor_position((cursor_x.min(area.right().saturating_sub(2)), area.y + 2));
}

#[cfg(test)]
mod tests {
    use super::*;
    use docchat_core::{DocumentInfo, SessionOptions};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn text_of(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn open_state() -> UiState {
        let mut state = UiState::new(SessionOptions::default(), "http://localhost:8000");
        state.session.connection_started().unwrap();
        state.session.connection_opened().unwrap();
        state
    }

    #[test]
    fn test_welcome_when_empty() {
        let state = open_state();
        let lines = chat_lines(&state, 200);
        assert_eq!(text_of(&lines[0]), WELCOME_TITLE);
        assert!(text_of(&lines[1]).contains("todos os documentos disponíveis"));
    }

    #[test]
    fn test_assistant_markup_and_typing_indicator() {
        let mut state = open_state();
        state.session.send_question("Q?", &[]).unwrap();
        let lines = chat_lines(&state, 80);
        assert_eq!(text_of(&lines[1]), "  Q?");
        assert!(text_of(lines.last().unwrap()).contains("digitando"));

        state.session.handle_frame(r#"{"answer": "**A**"}"#);
        let lines = chat_lines(&state, 80);
        let answer = &lines[4];
        assert_eq!(text_of(answer), "  A");
        assert!(answer.spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert!(!text_of(lines.last().unwrap()).contains("digitando"));
    }

    #[test]
    fn test_user_text_not_formatted() {
        let mut state = open_state();
        state.session.send_question("**raw**", &[]).unwrap();
        let lines = chat_lines(&state, 80);
        assert_eq!(text_of(&lines[1]), "  **raw**");
    }

    #[test]
    fn test_documents_title_marks_refresh() {
        let mut registry = DocumentRegistry::new();
        assert_eq!(documents_title(&registry), " Documentos Carregados ");

        registry.apply_listing(vec![DocumentInfo {
            filename: "a.pdf".to_string(),
            upload_time: "2024-01-01 10:00:00".to_string(),
            file_path: "uploads/a.pdf".to_string(),
            size: 2048,
        }]);
        assert_eq!(documents_title(&registry), " Documentos Carregados ");

        registry.begin_fetch();
        assert_eq!(
            documents_title(&registry),
            " Documentos Carregados (atualizando...) "
        );
    }

    #[test]
    fn test_full_render_smoke() {
        let mut state = open_state();
        state.session.send_question("What is in doc A?", &[]).unwrap();
        state.session.handle_frame(
            r#"{"answer": "It contains X.", "sources": [{"content": "X details", "metadata": {"source": "a.pdf"}}]}"#,
        );
        state.upload_prompt = Some("/tmp/notes.md".to_string());

        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|frame| render(frame, &state)).unwrap();

        let buffer = terminal.backend().buffer();
        let content: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(content.contains("Fontes de Informação"));
        assert!(content.contains("Fonte 1"));
        assert!(content.contains("/tmp/notes.md"));
    }
}
