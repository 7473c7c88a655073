//! Interned source locations with expansion-history chains.
//!
//! Every token carries a [`LocId`] into a [`LocTable`]. A location is
//! either a direct file position or a position inside a macro expansion
//! (or a macro argument), each optionally linking to a parent location.
//! Walking the parent chain reconstructs the full expansion history for
//! diagnostics. Locations are deduplicated by structural value so that
//! repeated expansions of the same macro share storage.

use rustc_hash::FxHashMap;

/// Identifier of a loaded source file within a [`crate::FileRegistry`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct FileId(pub u32);

/// Index into a [`LocTable`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct LocId(u32);

/// A source location: a tagged variant over file / macro-expansion /
/// macro-argument positions, each with an optional parent forming a chain.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum SourceLoc {
    /// A position directly in a file. `parent` links to the `#include`
    /// site when the file was reached through an include directive.
    File {
        file: FileId,
        /// 1-based physical line.
        line: u32,
        /// 1-based column.
        col: u32,
        parent: Option<LocId>,
    },
    /// A position inside a macro replacement list. `macro_loc` is the
    /// defining macro's location, `parent` the invocation site.
    Expansion {
        macro_loc: LocId,
        /// Column within the expansion.
        col: u32,
        parent: Option<LocId>,
    },
    /// A position inside a collected macro argument. `arg_loc` is where
    /// the argument token was spelled, `parent` the invocation site.
    MacroArg {
        arg_loc: LocId,
        col: u32,
        parent: Option<LocId>,
    },
}

impl SourceLoc {
    /// The parent link of any variant.
    pub fn parent(&self) -> Option<LocId> {
        match *self {
            SourceLoc::File { parent, .. }
            | SourceLoc::Expansion { parent, .. }
            | SourceLoc::MacroArg { parent, .. } => parent,
        }
    }
}

/// Interning table for [`SourceLoc`] values.
///
/// Structurally equal locations intern to the same [`LocId`].
#[derive(Default)]
pub struct LocTable {
    locs: Vec<SourceLoc>,
    dedup: FxHashMap<SourceLoc, LocId>,
}

impl LocTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a location, returning the id of an existing structural
    /// duplicate when one is present.
    pub fn intern(&mut self, loc: SourceLoc) -> LocId {
        if let Some(&id) = self.dedup.get(&loc) {
            return id;
        }
        let id = LocId(u32::try_from(self.locs.len()).unwrap_or(u32::MAX));
        self.locs.push(loc);
        self.dedup.insert(loc, id);
        id
    }

    /// Shorthand for interning a plain file position.
    pub fn file_loc(&mut self, file: FileId, line: u32, col: u32, parent: Option<LocId>) -> LocId {
        self.intern(SourceLoc::File {
            file,
            line,
            col,
            parent,
        })
    }

    pub fn get(&self, id: LocId) -> SourceLoc {
        self.locs[id.0 as usize]
    }

    /// Number of distinct interned locations.
    pub fn len(&self) -> usize {
        self.locs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locs.is_empty()
    }

    /// Resolve a location to the underlying file position, looking
    /// through expansion and argument wrappers.
    pub fn resolve_file(&self, id: LocId) -> Option<(FileId, u32, u32)> {
        let mut cur = id;
        // Chains are acyclic by construction (a location can only
        // reference previously interned ids), so this terminates.
        loop {
            match self.get(cur) {
                SourceLoc::File { file, line, col, .. } => return Some((file, line, col)),
                SourceLoc::Expansion { macro_loc, .. } => cur = macro_loc,
                SourceLoc::MacroArg { arg_loc, .. } => cur = arg_loc,
            }
        }
    }

    /// Iterate the parent chain starting at `id` (inclusive).
    pub fn chain(&self, id: LocId) -> Chain<'_> {
        Chain {
            table: self,
            next: Some(id),
        }
    }
}

/// Iterator over a location's parent chain, outermost first.
pub struct Chain<'a> {
    table: &'a LocTable,
    next: Option<LocId>,
}

impl Iterator for Chain<'_> {
    type Item = (LocId, SourceLoc);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let loc = self.table.get(id);
        self.next = loc.parent();
        Some((id, loc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_deduplicates() {
        let mut table = LocTable::new();
        let a = table.file_loc(FileId(0), 1, 1, None);
        let b = table.file_loc(FileId(0), 1, 1, None);
        let c = table.file_loc(FileId(0), 1, 2, None);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn resolve_looks_through_expansions() {
        let mut table = LocTable::new();
        let def = table.file_loc(FileId(3), 10, 5, None);
        let call = table.file_loc(FileId(0), 2, 1, None);
        let exp = table.intern(SourceLoc::Expansion {
            macro_loc: def,
            col: 4,
            parent: Some(call),
        });
        assert_eq!(table.resolve_file(exp), Some((FileId(3), 10, 5)));
    }

    #[test]
    fn chain_walks_to_the_root() {
        let mut table = LocTable::new();
        let root = table.file_loc(FileId(0), 1, 1, None);
        let mid = table.file_loc(FileId(1), 7, 2, Some(root));
        let leaf = table.intern(SourceLoc::Expansion {
            macro_loc: mid,
            col: 1,
            parent: Some(mid),
        });
        let ids: Vec<LocId> = table.chain(leaf).map(|(id, _)| id).collect();
        assert_eq!(ids, vec![leaf, mid, root]);
    }
}
