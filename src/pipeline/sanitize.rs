//! Text sanitization: strip dangerous markup, cap the length.
//!
//! User text ends up rasterised, not injected into a page, but the same
//! strings are also echoed back as rendered HTML ([`super::render::StyledLine::to_html`])
//! and may be logged or forwarded. So every raw field goes through
//! [`sanitize`] first:
//!
//! 1. Remove every blocklisted element *together with its content*
//!    (`<script>…</script>`, `<iframe>…</iframe>`, …), case-insensitively
//!    and across newlines.
//! 2. Remove any blocklisted tag left without a partner (`<script src=x>`,
//!    a stray `</style>`, a dangling `<iframe` at the end of the text).
//! 3. Repeat until nothing changes, so that nesting tricks such as
//!    `<scr<script></script>ipt>` cannot reassemble a tag.
//! 4. Truncate to `max_chars` characters and append `...`.
//!
//! The function is total: regex replacement cannot fail, and truncation
//! works on char boundaries.

use once_cell::sync::Lazy;
use regex::Regex;

/// Element names removed by the sanitizer.
pub const BLOCKED_TAGS: [&str; 12] = [
    "script", "style", "iframe", "object", "embed", "applet", "base", "bgsound", "link", "meta",
    "frame", "frameset",
];

/// Appended when text is truncated.
pub const ELLIPSIS: &str = "...";

/// Default truncation point, in characters.
pub const MAX_TEXT_CHARS: usize = 280;

// One pattern per element: the regex crate has no backreferences, so a
// single alternation could pair `<script>` with `</style>`.
static RE_ELEMENTS: Lazy<Vec<Regex>> = Lazy::new(|| {
    BLOCKED_TAGS
        .iter()
        .map(|tag| Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).unwrap())
        .collect()
});

static RE_ORPHAN_TAGS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)</?\s*(?:{})\b[^>]*>?",
        BLOCKED_TAGS.join("|")
    ))
    .unwrap()
});

/// Sanitize with the default 280-character limit.
pub fn sanitize(raw: &str) -> String {
    sanitize_with_limit(raw, MAX_TEXT_CHARS)
}

/// Strip blocklisted markup from `raw` and truncate it to `max_chars`
/// characters (plus [`ELLIPSIS`] when truncation happened).
pub fn sanitize_with_limit(raw: &str, max_chars: usize) -> String {
    let cleaned = strip_blocked_markup(raw);
    truncate_chars(&cleaned, max_chars)
}

fn strip_blocked_markup(input: &str) -> String {
    let mut current = input.to_string();
    loop {
        let mut next = current.clone();
        for re in RE_ELEMENTS.iter() {
            next = re.replace_all(&next, "").into_owned();
        }
        next = RE_ORPHAN_TAGS.replace_all(&next, "").into_owned();
        if next == current {
            return next;
        }
        current = next;
    }
}

fn truncate_chars(input: &str, max_chars: usize) -> String {
    match input.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            let mut out = String::with_capacity(cut + ELLIPSIS.len());
            out.push_str(&input[..cut]);
            out.push_str(ELLIPSIS);
            out
        }
        None => input.to_string(),
    }
}
