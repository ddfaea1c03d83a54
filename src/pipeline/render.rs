//! Inline markdown rendering: sanitized text → [`StyledLine`].
//!
//! A banner line is a single row of pixels, so only inline markdown is
//! honoured: `**bold**`, `*italic*`, `~~strike~~`, `` `code` ``, links and
//! image alt text (drawn as their text). Soft and hard line breaks collapse
//! to spaces. Raw inline HTML is shown literally, never interpreted.
//!
//! Anything block-level (headings, lists, quotes, code blocks, tables,
//! rules) cannot be shown on one line. Such an item is *not* dropped: it
//! falls back to its sanitized text, unstyled, and carries a
//! [`RenderWarning`]. The fallback is always the sanitized text, never the
//! raw input, so a render failure cannot reintroduce stripped markup.
//!
//! ## Concurrency
//!
//! [`render_items`] fans items out to the blocking pool, at most
//! `render_concurrency` at a time, tagging each task with its index. Results
//! land in a slot vector indexed by position, so output order is input order
//! whatever order the tasks finish in. A task that panics only degrades its
//! own item.

use crate::config::BannerConfig;
use crate::error::RenderWarning;
use crate::model::ChecklistItem;
use crate::pipeline::sanitize::sanitize_with_limit;
use futures::stream::{self, StreamExt};
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ── Styled text ──────────────────────────────────────────────────────────

/// Emphasis flags for a run of text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanStyle {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub code: bool,
}

impl SpanStyle {
    pub const PLAIN: SpanStyle = SpanStyle {
        bold: false,
        italic: false,
        strikethrough: false,
        code: false,
    };
}

/// A run of text sharing one style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyledSpan {
    pub text: String,
    pub style: SpanStyle,
}

/// One drawable line of styled text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyledLine {
    pub spans: Vec<StyledSpan>,
}

impl StyledLine {
    /// A single unstyled span (or an empty line for empty text).
    pub fn plain(text: impl Into<String>) -> Self {
        let mut line = Self::default();
        line.push(text.into(), SpanStyle::PLAIN);
        line
    }

    /// Append text, merging with the last span when the style matches.
    pub fn push(&mut self, text: impl AsRef<str>, style: SpanStyle) {
        let text = text.as_ref();
        if text.is_empty() {
            return;
        }
        match self.spans.last_mut() {
            Some(last) if last.style == style => last.text.push_str(text),
            _ => self.spans.push(StyledSpan {
                text: text.to_string(),
                style,
            }),
        }
    }

    /// Prepend unstyled text.
    pub fn prefixed(self, prefix: &str) -> Self {
        let mut line = StyledLine::plain(prefix);
        for span in self.spans {
            line.push(span.text, span.style);
        }
        line
    }

    /// The text without any styling.
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Inline HTML for the line (`<strong>`, `<em>`, `<del>`, `<code>`),
    /// with all text escaped.
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        for span in &self.spans {
            let s = span.style;
            if s.bold {
                html.push_str("<strong>");
            }
            if s.italic {
                html.push_str("<em>");
            }
            if s.strikethrough {
                html.push_str("<del>");
            }
            if s.code {
                html.push_str("<code>");
            }
            escape_html_into(&span.text, &mut html);
            if s.code {
                html.push_str("</code>");
            }
            if s.strikethrough {
                html.push_str("</del>");
            }
            if s.italic {
                html.push_str("</em>");
            }
            if s.bold {
                html.push_str("</strong>");
            }
        }
        html
    }
}

fn escape_html_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

// ── Rendered items ───────────────────────────────────────────────────────

/// A checklist item after sanitization and rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedItem {
    /// Plain text of `line`, as drawn. Markdown entities are decoded here,
    /// so `&lt;b&gt;` comes out as a literal `<b>`: this is display text,
    /// not markup. Use [`StyledLine::to_html`] (or [`render`]) for output
    /// that is embedded in HTML.
    pub text: String,
    pub line: StyledLine,
    /// Copied unchanged from the source item.
    pub is_checked: bool,
    /// Set when the item fell back to unstyled sanitized text.
    pub warning: Option<RenderWarning>,
}

impl RenderedItem {
    pub fn is_fallback(&self) -> bool {
        self.warning.is_some()
    }

    fn fallback(sanitized: String, is_checked: bool, warning: RenderWarning) -> Self {
        Self {
            line: StyledLine::plain(sanitized.as_str()),
            text: sanitized,
            is_checked,
            warning: Some(warning),
        }
    }
}

/// Keeps the plain display text; see [`RenderedItem::text`].
impl From<RenderedItem> for ChecklistItem {
    fn from(r: RenderedItem) -> Self {
        ChecklistItem {
            text: r.text,
            is_checked: r.is_checked,
        }
    }
}

/// Why inline rendering refused a text. Turned into a [`RenderWarning`]
/// once the item index is known.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RenderFailure {
    Block(&'static str),
    Control(char),
}

impl RenderFailure {
    fn at(self, index: usize) -> RenderWarning {
        match self {
            RenderFailure::Block(construct) => RenderWarning::BlockMarkup {
                index,
                construct: construct.to_string(),
            },
            RenderFailure::Control(c) => RenderWarning::ControlCharacter {
                index,
                code: c as u32,
            },
        }
    }
}

fn block_name(tag: &Tag<'_>) -> &'static str {
    match tag {
        Tag::Heading { .. } => "heading",
        Tag::BlockQuote(_) => "block quote",
        Tag::CodeBlock(_) => "code block",
        Tag::HtmlBlock => "HTML block",
        Tag::List(_) | Tag::Item => "list",
        Tag::Table(_) | Tag::TableHead | Tag::TableRow | Tag::TableCell => "table",
        Tag::FootnoteDefinition(_) => "footnote definition",
        _ => "block element",
    }
}

/// Render already-sanitized text into a styled line.
fn render_inline(text: &str) -> Result<StyledLine, RenderFailure> {
    if let Some(c) = text
        .chars()
        .find(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
    {
        return Err(RenderFailure::Control(c));
    }

    let mut line = StyledLine::default();
    let mut style = SpanStyle::PLAIN;
    let (mut bold, mut italic, mut strike) = (0u32, 0u32, 0u32);
    let mut paragraphs = 0usize;

    for event in Parser::new_ext(text, Options::ENABLE_STRIKETHROUGH) {
        match event {
            Event::Start(Tag::Paragraph) => {
                if paragraphs > 0 {
                    line.push(" ", style);
                }
                paragraphs += 1;
            }
            Event::Start(Tag::Strong) => bold += 1,
            Event::Start(Tag::Emphasis) => italic += 1,
            Event::Start(Tag::Strikethrough) => strike += 1,
            Event::Start(Tag::Link { .. }) | Event::Start(Tag::Image { .. }) => {}
            Event::Start(other) => return Err(RenderFailure::Block(block_name(&other))),
            Event::End(TagEnd::Strong) => bold = bold.saturating_sub(1),
            Event::End(TagEnd::Emphasis) => italic = italic.saturating_sub(1),
            Event::End(TagEnd::Strikethrough) => strike = strike.saturating_sub(1),
            Event::End(_) => {}
            Event::Text(t) | Event::InlineHtml(t) | Event::Html(t) => line.push(&t, style),
            Event::Code(t) => line.push(&t, SpanStyle { code: true, ..style }),
            Event::SoftBreak | Event::HardBreak => line.push(" ", style),
            Event::FootnoteReference(label) => line.push(format!("[^{label}]"), style),
            Event::Rule => return Err(RenderFailure::Block("horizontal rule")),
            _ => {}
        }
        style = SpanStyle {
            bold: bold > 0,
            italic: italic > 0,
            strikethrough: strike > 0,
            code: false,
        };
    }

    Ok(line)
}

/// Sanitize and render one item. Never fails: on a render failure the
/// sanitized text is kept unstyled and the warning recorded.
pub fn render_item(index: usize, item: &ChecklistItem, max_chars: usize) -> RenderedItem {
    let sanitized = sanitize_with_limit(&item.text, max_chars);
    match render_inline(&sanitized) {
        Ok(line) => RenderedItem {
            text: line.plain_text(),
            line,
            is_checked: item.is_checked,
            warning: None,
        },
        Err(failure) => {
            let warning = failure.at(index);
            warn!("{}", warning);
            RenderedItem::fallback(sanitized, item.is_checked, warning)
        }
    }
}

/// Sanitize and render the banner title.
pub fn render_header(header: &str, max_chars: usize) -> StyledLine {
    let sanitized = sanitize_with_limit(header, max_chars);
    match render_inline(&sanitized) {
        Ok(line) => line,
        Err(failure) => {
            warn!("Header: {:?}; drawing sanitized text", failure);
            StyledLine::plain(sanitized)
        }
    }
}

/// Render every item concurrently, preserving input order.
pub async fn render_items(items: &[ChecklistItem], config: &BannerConfig) -> Vec<RenderedItem> {
    let max_chars = config.max_text_chars;
    let mut slots: Vec<Option<RenderedItem>> = (0..items.len()).map(|_| None).collect();

    let mut tasks = stream::iter(items.iter().cloned().enumerate().map(|(index, item)| {
        async move {
            let is_checked = item.is_checked;
            let text = item.text.clone();
            let result =
                tokio::task::spawn_blocking(move || render_item(index, &item, max_chars)).await;
            let rendered = match result {
                Ok(rendered) => rendered,
                Err(e) => {
                    let warning = RenderWarning::Aborted {
                        index,
                        detail: e.to_string(),
                    };
                    warn!("{}", warning);
                    RenderedItem::fallback(
                        sanitize_with_limit(&text, max_chars),
                        is_checked,
                        warning,
                    )
                }
            };
            (index, rendered)
        }
    }))
    .buffer_unordered(config.render_concurrency);

    while let Some((index, rendered)) = tasks.next().await {
        slots[index] = Some(rendered);
    }

    let rendered: Vec<RenderedItem> = slots.into_iter().flatten().collect();
    debug!(
        "Rendered {} items ({} fell back to plain text)",
        rendered.len(),
        rendered.iter().filter(|r| r.is_fallback()).count()
    );
    rendered
}

/// Render every item to its inline HTML form, preserving order and
/// `is_checked`. Fallback items carry their escaped sanitized text.
pub async fn render(items: &[ChecklistItem], config: &BannerConfig) -> Vec<ChecklistItem> {
    render_items(items, config)
        .await
        .into_iter()
        .map(|r| ChecklistItem::new(r.line.to_html(), r.is_checked))
        .collect()
}
