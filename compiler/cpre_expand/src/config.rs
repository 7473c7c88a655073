//! Driver configuration.

use std::path::PathBuf;

/// Knobs for [`crate::Preprocessor`] construction. `Default` gives a
/// driver with no search paths, suitable for self-contained input.
#[derive(Clone, Debug)]
pub struct PpConfig {
    /// Directories searched for `#include` names after the directory of
    /// the requesting file.
    pub include_paths: Vec<PathBuf>,
    /// Initial capacity of the macro definition table.
    pub macro_capacity: usize,
}

impl Default for PpConfig {
    fn default() -> Self {
        PpConfig {
            include_paths: Vec::new(),
            macro_capacity: 64,
        }
    }
}
