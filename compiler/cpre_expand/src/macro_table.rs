//! The macro table.
//!
//! A hash map keyed by macro name with an explicit absent result,
//! rather than a reserved-sentinel open-addressed table. Redefinition
//! silently overwrites; `#undef` removes the entry. Definitions live
//! until the table is dropped with the translation unit.

use cpre_lexer::PpToken;
use cpre_source::LocId;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// The variadic parameter's spelling inside replacement lists.
pub const VA_ARGS: &str = "__VA_ARGS__";

#[derive(Clone, Debug)]
pub struct MacroDef {
    pub name: String,
    pub function_like: bool,
    pub variadic: bool,
    /// Parameter names in declaration order; a variadic macro's last
    /// parameter is [`VA_ARGS`].
    pub params: SmallVec<[String; 4]>,
    pub body: Vec<PpToken>,
    pub loc: Option<LocId>,
    /// Painted while an expansion of this macro is on the buffer
    /// stack; the driver refuses to re-expand a painted name, which
    /// breaks self-referential macro loops.
    pub expanding: bool,
}

#[derive(Debug, Default)]
pub struct MacroTable {
    map: FxHashMap<String, MacroDef>,
}

impl MacroTable {
    pub fn with_capacity(capacity: usize) -> Self {
        MacroTable {
            map: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Insert or overwrite a definition.
    pub fn define(&mut self, def: MacroDef) {
        self.map.insert(def.name.clone(), def);
    }

    /// Remove a definition. Returns whether the name was defined.
    pub fn undef(&mut self, name: &str) -> bool {
        self.map.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&MacroDef> {
        self.map.get(name)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn set_expanding(&mut self, name: &str, expanding: bool) {
        if let Some(def) = self.map.get_mut(name) {
            def.expanding = expanding;
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
