//! Diagnostic collection and rendering for the cpre pipeline.
//!
//! Errors are carried as sticky state rather than raised: every phase
//! records into a [`Diagnostics`] collector and keeps going, so one run
//! can surface multiple problems. Callers inspect [`Diagnostics::has_errors`]
//! (and the last message) to decide whether to keep pulling tokens.

mod diagnostic;
mod emitter;

pub use diagnostic::{Diagnostic, Diagnostics, Severity};
pub use emitter::TerminalEmitter;
