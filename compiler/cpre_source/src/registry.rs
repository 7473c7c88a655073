//! File registry: include resolution and one-read-per-path caching.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::canon::canonicalize;
use crate::loc::FileId;

/// Registry errors. Include-target failures are fatal only to the
/// directive that requested them; preprocessing continues.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("cannot find include file {name:?}")]
    NotFound { name: String },
    #[error("cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A loaded, canonicalized source file.
pub struct SourceFile {
    /// The name by which the file was requested (as spelled in source).
    pub name: String,
    /// Resolved canonical path. Virtual files keep their given name.
    pub path: PathBuf,
    /// Size of the raw file in bytes, before canonicalization.
    pub raw_size: u64,
    /// Canonicalized text (phases 1 and 2 applied).
    contents: Rc<str>,
}

impl SourceFile {
    /// The canonicalized text. The returned handle is cheap to clone and
    /// shares storage with the registry's cache.
    pub fn contents(&self) -> Rc<str> {
        Rc::clone(&self.contents)
    }

    pub fn text(&self) -> &str {
        &self.contents
    }
}

/// Resolves include names to files, reading and canonicalizing each
/// canonical path at most once per run.
///
/// Search order for `resolve_and_load`:
/// 1. the directory of the requesting file,
/// 2. each configured include search path, in order,
/// 3. the literal path relative to the working directory.
#[derive(Default)]
pub struct FileRegistry {
    files: Vec<SourceFile>,
    by_path: FxHashMap<PathBuf, FileId>,
    include_paths: Vec<PathBuf>,
}

impl FileRegistry {
    pub fn new(include_paths: Vec<PathBuf>) -> Self {
        FileRegistry {
            files: Vec::new(),
            by_path: FxHashMap::default(),
            include_paths,
        }
    }

    pub fn add_include_path(&mut self, path: impl Into<PathBuf>) {
        self.include_paths.push(path.into());
    }

    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.0 as usize]
    }

    /// The text of 1-based `line` in `id`, without its trailing newline.
    /// Used by the caret renderer.
    pub fn line_text(&self, id: FileId, line: u32) -> Option<&str> {
        let text = self.file(id).text();
        let mut start = 0usize;
        let mut remaining = line.checked_sub(1)?;
        while remaining > 0 {
            let nl = memchr::memchr(b'\n', &text.as_bytes()[start..])?;
            start += nl + 1;
            remaining -= 1;
        }
        let rest = &text[start..];
        Some(match memchr::memchr(b'\n', rest.as_bytes()) {
            Some(end) => &rest[..end],
            None => rest,
        })
    }

    /// Resolve `name` against the search order and load it, returning a
    /// cached id if the resolved path was loaded before.
    pub fn resolve_and_load(
        &mut self,
        name: &str,
        requesting: Option<FileId>,
    ) -> Result<FileId, SourceError> {
        let resolved = self
            .resolve(name, requesting)
            .ok_or_else(|| SourceError::NotFound {
                name: name.to_owned(),
            })?;
        let canonical = std::fs::canonicalize(&resolved).unwrap_or(resolved);
        if let Some(&id) = self.by_path.get(&canonical) {
            return Ok(id);
        }
        let raw = std::fs::read(&canonical).map_err(|source| SourceError::Io {
            path: canonical.clone(),
            source,
        })?;
        Ok(self.insert(name.to_owned(), canonical, raw))
    }

    /// Register an in-memory file under `name`. Intended for tests and
    /// for feeding the initial translation unit from non-file sources;
    /// the text still goes through both canonicalization phases.
    pub fn load_virtual(&mut self, name: &str, text: &str) -> FileId {
        let path = PathBuf::from(name);
        if let Some(&id) = self.by_path.get(&path) {
            return id;
        }
        self.insert(name.to_owned(), path, text.as_bytes().to_vec())
    }

    fn insert(&mut self, name: String, path: PathBuf, raw: Vec<u8>) -> FileId {
        let contents: Rc<str> = Rc::from(canonicalize(&raw));
        let id = FileId(u32::try_from(self.files.len()).unwrap_or(u32::MAX));
        self.by_path.insert(path.clone(), id);
        self.files.push(SourceFile {
            name,
            path,
            raw_size: raw.len() as u64,
            contents,
        });
        id
    }

    fn resolve(&self, name: &str, requesting: Option<FileId>) -> Option<PathBuf> {
        if let Some(req) = requesting {
            let dir = self.file(req).path.parent().unwrap_or(Path::new("."));
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        for dir in &self.include_paths {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        let literal = PathBuf::from(name);
        if literal.is_file() {
            return Some(literal);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(text.as_bytes()).unwrap();
        path
    }

    #[test]
    fn virtual_files_are_canonicalized() {
        let mut reg = FileRegistry::default();
        let id = reg.load_virtual("tu.c", "int x;\\\nint y;\r\n");
        assert_eq!(reg.file(id).text(), "int x;int y;\n\n");
    }

    #[test]
    fn same_path_is_read_once() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.h", "A\n");
        let mut reg = FileRegistry::new(vec![dir.path().to_path_buf()]);
        let first = reg.resolve_and_load("a.h", None).unwrap();
        let second = reg.resolve_and_load("a.h", None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn requesting_file_directory_wins_over_include_paths() {
        let outer = tempfile::tempdir().unwrap();
        let inner = tempfile::tempdir().unwrap();
        write_file(outer.path(), "shared.h", "outer\n");
        write_file(inner.path(), "shared.h", "inner\n");
        let requester = write_file(inner.path(), "main.c", "\n");

        let mut reg = FileRegistry::new(vec![outer.path().to_path_buf()]);
        let main = reg
            .resolve_and_load(requester.to_str().unwrap(), None)
            .unwrap();
        let shared = reg.resolve_and_load("shared.h", Some(main)).unwrap();
        assert_eq!(reg.file(shared).text(), "inner\n");
    }

    #[test]
    fn missing_include_is_reported() {
        let mut reg = FileRegistry::default();
        assert!(matches!(
            reg.resolve_and_load("no_such_file.h", None),
            Err(SourceError::NotFound { .. })
        ));
    }

    #[test]
    fn line_text_finds_lines() {
        let mut reg = FileRegistry::default();
        let id = reg.load_virtual("tu.c", "first\nsecond\nthird");
        assert_eq!(reg.line_text(id, 1), Some("first"));
        assert_eq!(reg.line_text(id, 2), Some("second"));
        assert_eq!(reg.line_text(id, 3), Some("third"));
        assert_eq!(reg.line_text(id, 4), None);
    }
}
