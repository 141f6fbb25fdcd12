//! Pipeline stages for one PDF.
//!
//! Each submodule implements exactly one step and is tested on its own with
//! fake collaborators; only [`crate::backend`] talks to pdfium.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ strategy ──▶ tables ──▶ normalize ──▶ writer
//! (list)    (fallback)   (3 tiers)  (cleanup)     (atomic)
//! ```
//!
//! 1. [`input`]     resolve the batch directories and list `*.pdf` files
//! 2. [`strategy`]  layout Markdown, then page-wise Markdown; plain text for `.txt`
//! 3. [`tables`]    lattice, then stream, then the per-page scanner;
//!    [`grid`] holds the geometry and [`layout`] the line-to-Markdown rules
//! 4. [`normalize`] whitespace, blank lines and line-end hyphenation
//! 5. [`writer`]    UTF-8 output through a temp file and rename

pub mod grid;
pub mod input;
pub mod layout;
pub mod normalize;
pub mod strategy;
pub mod tables;
pub mod writer;
