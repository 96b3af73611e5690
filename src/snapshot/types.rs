//! Record and snapshot types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A discovered module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRecord {
    /// Fully-qualified module name.
    pub name: String,
    pub docstring: String,
    /// Source file relative to the import-search root.
    pub filename: String,
}

/// A discovered class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KlassRecord {
    pub name: String,
    /// Name of the owning module.
    pub module: String,
    pub docstring: String,
    /// `None` when the runtime has no source lines for the class.
    pub line_number: Option<u32>,
    /// Canonical `module.Name` path.
    pub path: String,
    /// Shortest module path that re-exposes this exact class.
    pub best_import_path: String,
    /// Canonical paths of direct bases, in declaration order. Only used to
    /// compute inheritance edges; the persisted lattice is the edge list.
    #[serde(skip)]
    pub bases: Vec<String>,
}

/// A method defined directly on a class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodRecord {
    pub name: String,
    /// Canonical path of the owning class.
    pub klass_path: String,
    pub docstring: String,
    /// Dedented source text.
    pub code: String,
    /// Argument names without receiver and catch-all.
    pub kwargs: Vec<String>,
    pub line_number: u32,
}

/// An attribute value seen on a class, before shadowing resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeCandidate {
    pub name: String,
    /// Stringified value.
    pub value: String,
    pub klass_path: String,
    pub line_number: Option<u32>,
}

/// An attribute attributed to the class that introduces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KlassAttribute {
    pub klass_path: String,
    pub name: String,
    pub value: String,
    pub line_number: Option<u32>,
}

/// A direct inheritance edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inheritance {
    pub parent: String,
    pub child: String,
    /// Position of `parent` in the child's base list.
    pub order: usize,
}

/// One item of the walker's output stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Module(ModuleRecord),
    Klass(KlassRecord),
    Method(MethodRecord),
    Attribute(AttributeCandidate),
}

/// Everything imported for one (project, version).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub project: String,
    pub version: String,
    pub imported_at: DateTime<Utc>,
    pub modules: Vec<ModuleRecord>,
    pub klasses: Vec<KlassRecord>,
    pub methods: Vec<MethodRecord>,
    pub attributes: Vec<KlassAttribute>,
    pub inheritance: Vec<Inheritance>,
}

/// Row counts of a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotStats {
    pub modules: usize,
    pub klasses: usize,
    pub methods: usize,
    pub attributes: usize,
    pub inheritance: usize,
}

/// Classes and methods that differ between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotDiff {
    pub added_klasses: Vec<String>,
    pub removed_klasses: Vec<String>,
    /// `klass_path.method_name`
    pub added_methods: Vec<String>,
    pub removed_methods: Vec<String>,
}

impl SnapshotDiff {
    pub fn is_empty(&self) -> bool {
        self.added_klasses.is_empty()
            && self.removed_klasses.is_empty()
            && self.added_methods.is_empty()
            && self.removed_methods.is_empty()
    }
}
