//! Terminal emitter: `file:line:col` headers, the offending line, and a
//! `^` caret at the column, with optional ANSI color.

use std::io::{self, Write};

use cpre_source::{FileRegistry, LocTable, SourceLoc};

use crate::{Diagnostic, Severity};

mod colors {
    pub const ERROR: &str = "\x1b[1;31m";
    pub const WARNING: &str = "\x1b[1;33m";
    pub const NOTE: &str = "\x1b[1;36m";
    pub const BOLD: &str = "\x1b[1m";
    pub const RESET: &str = "\x1b[0m";
}

/// Renders diagnostics to a writer.
pub struct TerminalEmitter<W: Write> {
    writer: W,
    colors: bool,
}

impl<W: Write> TerminalEmitter<W> {
    pub fn new(writer: W, colors: bool) -> Self {
        TerminalEmitter { writer, colors }
    }

    fn severity_color(&self, severity: Severity) -> &'static str {
        if !self.colors {
            return "";
        }
        match severity {
            Severity::Error => colors::ERROR,
            Severity::Warning => colors::WARNING,
            Severity::Note => colors::NOTE,
        }
    }

    fn reset(&self) -> &'static str {
        if self.colors {
            colors::RESET
        } else {
            ""
        }
    }

    fn bold(&self) -> &'static str {
        if self.colors {
            colors::BOLD
        } else {
            ""
        }
    }

    /// Render one diagnostic: header, source line, caret, and one note
    /// per macro-expansion level in the location chain.
    pub fn emit(
        &mut self,
        diagnostic: &Diagnostic,
        locs: &LocTable,
        files: &FileRegistry,
    ) -> io::Result<()> {
        match diagnostic.loc {
            Some(loc) => {
                self.emit_at(diagnostic.severity, &diagnostic.message, loc, locs, files)?;
                // Walk outward through expansion wrappers so the user can
                // see where each level was invoked from.
                for (_, entry) in locs.chain(loc).skip(1) {
                    if let SourceLoc::File { file, line, col, .. } = entry {
                        let name = &files.file(file).name;
                        writeln!(
                            self.writer,
                            "{}{}:{}:{}:{} {}note:{} in expansion here",
                            self.bold(),
                            name,
                            line,
                            col,
                            self.reset(),
                            self.severity_color(Severity::Note),
                            self.reset(),
                        )?;
                    }
                }
                Ok(())
            }
            None => writeln!(
                self.writer,
                "{}{}:{} {}",
                self.severity_color(diagnostic.severity),
                diagnostic.severity,
                self.reset(),
                diagnostic.message
            ),
        }
    }

    fn emit_at(
        &mut self,
        severity: Severity,
        message: &str,
        loc: cpre_source::LocId,
        locs: &LocTable,
        files: &FileRegistry,
    ) -> io::Result<()> {
        let Some((file, line, col)) = locs.resolve_file(loc) else {
            return writeln!(self.writer, "{severity}: {message}");
        };
        let name = &files.file(file).name;
        writeln!(
            self.writer,
            "{}{}:{}:{}:{} {}{}:{} {}",
            self.bold(),
            name,
            line,
            col,
            self.reset(),
            self.severity_color(severity),
            severity,
            self.reset(),
            message
        )?;
        if let Some(text) = files.line_text(file, line) {
            writeln!(self.writer, "  {text}")?;
            let pad = " ".repeat(col.saturating_sub(1) as usize);
            writeln!(self.writer, "  {pad}^")?;
        }
        Ok(())
    }

    /// Render every collected diagnostic in order.
    pub fn emit_all(
        &mut self,
        diagnostics: &crate::Diagnostics,
        locs: &LocTable,
        files: &FileRegistry,
    ) -> io::Result<()> {
        for d in diagnostics.entries() {
            self.emit(d, locs, files)?;
        }
        Ok(())
    }
}
