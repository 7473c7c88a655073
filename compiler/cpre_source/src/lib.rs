//! Source text acquisition for the cpre preprocessing pipeline.
//!
//! This crate is the leaf of the workspace: it resolves include paths,
//! reads and canonicalizes file text exactly once per canonical path
//! ([`FileRegistry`]), and interns source locations into compact ids
//! ([`LocTable`]) so that repeated macro expansions share storage.
//!
//! Canonicalization happens in two phases applied on first load:
//!
//! 1. BOM stripping, newline normalization (`\r\n` and lone `\r` become
//!    `\n`), and trigraph replacement.
//! 2. Backslash-newline splicing, with the removed newlines re-inserted
//!    at the next real line break so diagnostics keep accurate line
//!    numbers.

mod canon;
mod loc;
mod registry;

pub use canon::{
    canonicalize, canonicalize_newlines, replace_trigraphs, splice_continued_lines, strip_bom,
};
pub use loc::{FileId, LocId, LocTable, SourceLoc};
pub use registry::{FileRegistry, SourceError, SourceFile};
