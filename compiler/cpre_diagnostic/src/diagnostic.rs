//! Core diagnostic types and the sticky collector.

use std::fmt;

use cpre_source::LocId;

/// Severity level for diagnostics.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// One reported message, tied to an optional interned source location.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub loc: Option<LocId>,
}

/// Sticky diagnostic state.
///
/// Recording never interrupts control flow; the error flag and last
/// message stay queryable so a caller can keep pulling tokens and
/// accumulate several diagnostics in one pass.
#[derive(Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    error_count: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, loc: Option<LocId>, message: impl Into<String>) {
        self.push(Diagnostic {
            severity: Severity::Error,
            message: message.into(),
            loc,
        });
    }

    pub fn warning(&mut self, loc: Option<LocId>, message: impl Into<String>) {
        self.push(Diagnostic {
            severity: Severity::Warning,
            message: message.into(),
            loc,
        });
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        if diagnostic.severity == Severity::Error {
            self.error_count += 1;
        }
        self.entries.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// The most recently recorded message, if any.
    pub fn last_message(&self) -> Option<&str> {
        self.entries.last().map(|d| d.message.as_str())
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_flag_is_sticky() {
        let mut diags = Diagnostics::new();
        assert!(!diags.has_errors());
        diags.warning(None, "odd but fine");
        assert!(!diags.has_errors());
        diags.error(None, "bad");
        diags.warning(None, "still going");
        assert!(diags.has_errors());
        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.last_message(), Some("still going"));
    }
}
