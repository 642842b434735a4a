//! Styled terminal lines from formatter markup.
//!
//! Understands the tags produced by `docchat_core::format_text` (`<br>`,
//! `<strong>`, `<em>`, inline `<code>`, `<pre>` code blocks and `<a>`
//! links). Backend content is trusted: any other tag and all text are
//! shown verbatim.

use std::mem;
use std::sync::OnceLock;

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use regex::Regex;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

fn tag_pattern() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"<(/?)([a-zA-Z]+)([^<>]*)>").expect("valid tag pattern"))
}

fn href_pattern() -> &'static Regex {
    static HREF: OnceLock<Regex> = OnceLock::new();
    HREF.get_or_init(|| Regex::new(r#"href="([^"]*)""#).expect("valid href pattern"))
}

#[derive(Debug, Clone, Copy, Default)]
struct Marks {
    bold: bool,
    italic: bool,
    code: bool,
    block: bool,
    link: bool,
}

impl Marks {
    fn style(&self) -> Style {
        let mut style = Style::default();
        if self.block {
            return style.fg(Color::Cyan);
        }
        if self.code {
            style = style.fg(Color::Yellow);
        }
        if self.link {
            style = style.fg(Color::Blue).add_modifier(Modifier::UNDERLINED);
        }
        if self.bold {
            style = style.add_modifier(Modifier::BOLD);
        }
        if self.italic {
            style = style.add_modifier(Modifier::ITALIC);
        }
        style
    }
}

#[derive(Default)]
struct LineBuilder {
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    marks: Marks,
    href: Option<String>,
}

impl LineBuilder {
    fn text(&mut self, text: &str) {
        if !text.is_empty() {
            self.current
                .push(Span::styled(text.to_string(), self.marks.style()));
        }
    }

    fn break_line(&mut self) {
        self.lines.push(Line::from(mem::take(&mut self.current)));
    }

    /// Apply a known tag. Returns false for tags shown verbatim.
    fn tag(&mut self, closing: bool, name: &str, attrs: &str) -> bool {
        match (name, closing) {
            ("br", _) => self.break_line(),
            ("strong" | "b", _) => self.marks.bold = !closing,
            ("em" | "i", _) => self.marks.italic = !closing,
            ("code", _) => self.marks.code = !closing,
            ("pre", false) => {
                if !self.current.is_empty() {
                    self.break_line();
                }
                self.marks.block = true;
            }
            ("pre", true) => {
                self.break_line();
                self.marks.block = false;
            }
            ("a", false) => {
                self.marks.link = true;
                self.href = href_pattern()
                    .captures(attrs)
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().to_string());
            }
            ("a", true) => {
                self.marks.link = false;
                if let Some(href) = self.href.take() {
                    self.current.push(Span::styled(
                        format!(" ({})", href),
                        Style::default().fg(Color::DarkGray),
                    ));
                }
            }
            _ => return false,
        }
        true
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        if !self.current.is_empty() || self.lines.is_empty() {
            self.break_line();
        }
        self.lines
    }
}

/// Convert markup into logical lines (one per `<br>` or block edge).
pub fn markup_lines(markup: &str) -> Vec<Line<'static>> {
    let mut builder = LineBuilder::default();
    let mut last = 0;

    for caps in tag_pattern().captures_iter(markup) {
        let Some(whole) = caps.get(0) else { continue };
        builder.text(&markup[last..whole.start()]);
        last = whole.end();

        let closing = &caps[1] == "/";
        let name = caps[2].to_ascii_lowercase();
        if !builder.tag(closing, &name, &caps[3]) {
            builder.text(whole.as_str());
        }
    }
    builder.text(&markup[last..]);

    builder.finish()
}

/// Wrap a styled line to `width` columns, prefixing every row with `indent`.
pub fn wrap_line(line: Line<'static>, width: usize, indent: &str) -> Vec<Line<'static>> {
    if width == 0 {
        return vec![];
    }

    let available = width.saturating_sub(indent.width()).max(1);
    let mut rows = Vec::new();
    let mut row: Vec<Span<'static>> = vec![Span::raw(indent.to_string())];
    let mut row_width = 0;

    for span in line.spans {
        let mut chunk = String::new();
        for ch in span.content.chars() {
            let ch_width = UnicodeWidthChar::width(ch).unwrap_or(1);
            if row_width + ch_width > available && row_width > 0 {
                if !chunk.is_empty() {
                    row.push(Span::styled(mem::take(&mut chunk), span.style));
                }
                rows.push(Line::from(mem::replace(
                    &mut row,
                    vec![Span::raw(indent.to_string())],
                )));
                row_width = 0;
            }
            chunk.push(ch);
            row_width += ch_width;
        }
        if !chunk.is_empty() {
            row.push(Span::styled(chunk, span.style));
        }
    }

    rows.push(Line::from(row));
    rows
}

/// Markup to wrapped, indented terminal rows.
pub fn render_markup(markup: &str, width: usize, indent: &str) -> Vec<Line<'static>> {
    markup_lines(markup)
        .into_iter()
        .flat_map(|line| wrap_line(line, width, indent))
        .collect()
}

/// Plain text (no markup) to wrapped, indented terminal rows.
pub fn render_plain(text: &str, width: usize, indent: &str) -> Vec<Line<'static>> {
    text.split('\n')
        .flat_map(|line| wrap_line(Line::from(line.to_string()), width, indent))
        .collect()
}
