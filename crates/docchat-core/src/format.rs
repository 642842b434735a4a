//! Text-to-markup transform for assistant messages and source excerpts.
//!
//! The transform is pure: raw text in, markup out. Nothing is escaped, so
//! the output carries backend content verbatim; whoever renders it decides
//! how far to trust it. It is not idempotent and must be applied exactly
//! once per raw message.

use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Marker every newline is turned into.
pub const LINE_BREAK: &str = "<br>";

/// Delimiters of the stand-in left where a code segment was lifted out.
/// Private-use code points, so the emphasis and link patterns never see them
/// as markup.
const SLOT_OPEN: char = '\u{E000}';
const SLOT_CLOSE: char = '\u{E001}';

struct Patterns {
    fenced: Regex,
    inline_code: Regex,
    bold: Regex,
    italic: Regex,
    link: Regex,
    slot: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        fenced: Regex::new(r"```([\s\S]*?)```").expect("valid fenced block pattern"),
        inline_code: Regex::new(r"`([^`]+)`").expect("valid inline code pattern"),
        bold: Regex::new(r"\*\*([^*]+)\*\*").expect("valid bold pattern"),
        italic: Regex::new(r"\*([^*]+)\*").expect("valid italic pattern"),
        link: Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("valid link pattern"),
        slot: Regex::new("\u{E000}([0-9]+)\u{E001}").expect("valid slot pattern"),
    })
}

/// Format raw message text as markup.
///
/// Steps, in order:
/// 1. newlines become `<br>`
/// 2. fenced blocks become `<pre class="code-block"><code>..</code></pre>`
/// 3. backtick spans become `<code class="inline-code">..</code>`
/// 4. `**..**` becomes `<strong>`
/// 5. `*..*` becomes `<em>`
/// 6. `[label](url)` becomes a link opening in a new context
///
/// Code produced by steps 2 and 3 is lifted out before steps 4 to 6 and put
/// back afterwards: markup inside code stays literal, while emphasis and
/// links around code still apply.
pub fn format_text(text: &str) -> String {
    let p = patterns();
    let text = text
        .replace([SLOT_OPEN, SLOT_CLOSE], "")
        .replace('\n', LINE_BREAK);
    let mut code = CodeSlots::default();

    let text = p.fenced.replace_all(&text, |caps: &Captures<'_>| {
        code.stash(format!(
            r#"<pre class="code-block"><code>{}</code></pre>"#,
            trim_code_edges(&caps[1])
        ))
    });
    let text = p.inline_code.replace_all(&text, |caps: &Captures<'_>| {
        code.stash(format!(r#"<code class="inline-code">{}</code>"#, &caps[1]))
    });

    let text = p.bold.replace_all(&text, "<strong>${1}</strong>");
    let text = p.italic.replace_all(&text, "<em>${1}</em>");
    let text = p.link.replace_all(
        &text,
        r#"<a href="${2}" target="_blank" rel="noopener noreferrer">${1}</a>"#,
    );

    code.restore(&text)
}

/// Code segments lifted out of the text, in order of appearance.
#[derive(Default)]
struct CodeSlots(Vec<String>);

impl CodeSlots {
    /// Keep `markup` and return the stand-in to leave in the text.
    fn stash(&mut self, markup: String) -> String {
        self.0.push(markup);
        format!("{}{}{}", SLOT_OPEN, self.0.len() - 1, SLOT_CLOSE)
    }

    fn restore(&self, text: &str) -> String {
        patterns()
            .slot
            .replace_all(text, |caps: &Captures<'_>| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| self.0.get(i))
                    .cloned()
                    .unwrap_or_default()
            })
            .into_owned()
    }
}

/// Trim whitespace and line-break markers from both edges of a code block.
fn trim_code_edges(code: &str) -> &str {
    let mut code = code.trim();
    loop {
        let rest = code
            .strip_prefix(LINE_BREAK)
            .or_else(|| code.strip_suffix(LINE_BREAK));
        match rest {
            Some(rest) => code = rest.trim(),
            None => return code,
        }
    }
}
