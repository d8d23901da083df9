//! Converts message text into renderable blocks.
//!
//! The passes run in a fixed order: fenced code is cut out first, then inline
//! code, bold, italic, inline math and finally line breaks. Each pass only
//! looks at plain text left over by the previous ones, so code never gets
//! emphasis or math applied to it.

use regex::Regex;
use std::sync::LazyLock;

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(\w+)?\n?([\s\S]*?)```").unwrap());
static INLINE_CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").unwrap());
static BOLD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());
static ITALIC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*(.+?)\*").unwrap());
static MATH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$([^$\n]+?)\$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Code {
        language: Option<String>,
        code: String,
    },
    Paragraph(Vec<Span>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Text(String),
    Code(String),
    Bold(String),
    Italic(String),
    Math(String),
    LineBreak,
}

pub fn render(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut cursor = 0;

    for captures in FENCE_RE.captures_iter(text) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        push_paragraph(&mut blocks, &text[cursor..whole.start()]);
        let language = captures.get(1).map(|m| m.as_str().to_string());
        let code = captures
            .get(2)
            .map(|m| m.as_str().trim_end_matches('\n').to_string())
            .unwrap_or_default();
        blocks.push(Block::Code { language, code });
        cursor = whole.end();
    }
    push_paragraph(&mut blocks, &text[cursor..]);

    blocks
}

fn push_paragraph(blocks: &mut Vec<Block>, text: &str) {
    let text = text.trim_matches('\n');
    if text.trim().is_empty() {
        return;
    }
    blocks.push(Block::Paragraph(render_inline(text)));
}

pub fn render_inline(text: &str) -> Vec<Span> {
    let passes: [(&Regex, fn(String) -> Span); 4] = [
        (&*INLINE_CODE_RE, Span::Code),
        (&*BOLD_RE, Span::Bold),
        (&*ITALIC_RE, Span::Italic),
        (&*MATH_RE, Span::Math),
    ];

    let mut spans = vec![Span::Text(text.to_string())];
    for (pattern, wrap) in passes {
        spans = split_text_spans(spans, pattern, wrap);
    }
    split_line_breaks(spans)
}

fn split_text_spans(spans: Vec<Span>, pattern: &Regex, wrap: fn(String) -> Span) -> Vec<Span> {
    let mut out = Vec::with_capacity(spans.len());
    for span in spans {
        let Span::Text(text) = span else {
            out.push(span);
            continue;
        };

        let mut cursor = 0;
        for captures in pattern.captures_iter(&text) {
            let (Some(whole), Some(inner)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            if whole.start() > cursor {
                out.push(Span::Text(text[cursor..whole.start()].to_string()));
            }
            out.push(wrap(inner.as_str().to_string()));
            cursor = whole.end();
        }
        if cursor < text.len() {
            out.push(Span::Text(text[cursor..].to_string()));
        }
    }
    out
}

fn split_line_breaks(spans: Vec<Span>) -> Vec<Span> {
    let mut out = Vec::with_capacity(spans.len());
    for span in spans {
        let Span::Text(text) = span else {
            out.push(span);
            continue;
        };
        for (index, line) in text.split('\n').enumerate() {
            if index > 0 {
                out.push(Span::LineBreak);
            }
            if !line.is_empty() {
                out.push(Span::Text(line.to_string()));
            }
        }
    }
    out
}
