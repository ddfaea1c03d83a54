//! Content validation: is this checklist worth publishing?
//!
//! Composition does not enforce these rules; a banner can be drawn for an
//! empty checklist. Callers that want to refuse thin or oversized content
//! before paying for a composition call [`validate`] (or use
//! [`crate::compose_checked`], which turns violations into
//! [`crate::BannerError::ContentRejected`]).

use crate::model::ChecklistData;
use std::fmt;
use tracing::warn;

/// Longest item text accepted by [`validate`], in characters.
pub const MAX_ITEM_CHARS: usize = 100;

/// One rule a checklist broke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentViolation {
    EmptyHeader,
    NoItems,
    EmptyItem { index: usize },
    ItemTooLong { index: usize, chars: usize, max: usize },
}

impl fmt::Display for ContentViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentViolation::EmptyHeader => write!(f, "header is empty"),
            ContentViolation::NoItems => write!(f, "checklist has no items"),
            ContentViolation::EmptyItem { index } => write!(f, "item {index} is empty"),
            ContentViolation::ItemTooLong { index, chars, max } => {
                write!(f, "item {index} is {chars} characters (max {max})")
            }
        }
    }
}

/// Every violation in `data`, in header-then-items order.
///
/// Lengths are counted in characters on the raw text, before sanitization.
pub fn check(data: &ChecklistData, max_item_chars: usize) -> Vec<ContentViolation> {
    let mut violations = Vec::new();

    if data.header.trim().is_empty() {
        violations.push(ContentViolation::EmptyHeader);
    }
    if data.items.is_empty() {
        violations.push(ContentViolation::NoItems);
    }
    for (index, item) in data.items.iter().enumerate() {
        if item.text.trim().is_empty() {
            violations.push(ContentViolation::EmptyItem { index });
            continue;
        }
        let chars = item.text.chars().count();
        if chars > max_item_chars {
            violations.push(ContentViolation::ItemTooLong {
                index,
                chars,
                max: max_item_chars,
            });
        }
    }

    violations
}

/// `true` when `data` meets the minimum content rules. Never fails.
pub fn validate(data: &ChecklistData) -> bool {
    let violations = check(data, MAX_ITEM_CHARS);
    for v in &violations {
        warn!("Checklist rejected: {}", v);
    }
    violations.is_empty()
}
