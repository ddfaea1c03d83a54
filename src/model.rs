//! Checklist data supplied by the caller.
//!
//! Both types are plain values: the pipeline never mutates them, it reads
//! them and produces rendered copies. Field names serialise in camelCase so
//! request bodies like `{"header": "...", "items": [{"text": "...",
//! "isChecked": true}]}` deserialise directly.

use crate::error::BannerError;
use serde::{Deserialize, Serialize};

/// One line of the checklist.
///
/// `text` is untrusted user input; it is sanitized and rendered before it
/// reaches the canvas. `is_checked` only selects the status glyph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub text: String,
    #[serde(default)]
    pub is_checked: bool,
}

impl ChecklistItem {
    pub fn new(text: impl Into<String>, is_checked: bool) -> Self {
        Self {
            text: text.into(),
            is_checked,
        }
    }

    pub fn checked(text: impl Into<String>) -> Self {
        Self::new(text, true)
    }

    pub fn unchecked(text: impl Into<String>) -> Self {
        Self::new(text, false)
    }
}

/// One banner request: a title and its items, top to bottom.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistData {
    pub header: String,
    #[serde(default)]
    pub items: Vec<ChecklistItem>,
}

impl ChecklistData {
    pub fn new(header: impl Into<String>, items: Vec<ChecklistItem>) -> Self {
        Self {
            header: header.into(),
            items,
        }
    }

    /// Parse checklist JSON as sent by clients.
    pub fn from_json(json: &str) -> Result<Self, BannerError> {
        serde_json::from_str(json).map_err(|e| BannerError::InvalidChecklist {
            reason: e.to_string(),
        })
    }
}
