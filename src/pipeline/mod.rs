//! Pipeline stages for banner composition.
//!
//! Each submodule implements exactly one transformation step, so each is
//! independently testable and [`crate::compose`] only sequences them.
//!
//! ## Data Flow
//!
//! ```text
//!            text ──▶ sanitize ──▶ render ──┐
//!                                           ├──▶ draw ──▶ encode
//! input ──▶ bytes ──▶ normalize ────────────┘     ▲
//!                                        font ────┘
//! ```
//!
//! 1. [`input`]     — fetch background bytes from a path, URL or blob key,
//!    enforcing the size ceiling and content-type allow-list
//! 2. [`sanitize`]  — strip blocklisted markup and truncate; total function
//! 3. [`render`]    — inline markdown to styled spans, per item and
//!    concurrently; failures degrade to sanitized text
//! 4. [`normalize`] — decode and fit-resize; runs in `spawn_blocking`
//! 5. [`font`]      — built-in bitmap font or a BMFont from disk
//! 6. [`draw`]      — blend styled glyph runs onto the canvas
//! 7. [`encode`]    — PNG bytes and data-URI previews
//!
//! [`validate`] sits outside the flow: an advisory check callers run before
//! composing.

pub mod draw;
pub mod encode;
pub mod font;
pub mod input;
pub mod normalize;
pub mod render;
pub mod sanitize;
pub mod validate;
