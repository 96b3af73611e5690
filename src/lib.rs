//! # cbv
//!
//! Class-based view inspector.
//!
//! cbv walks the loaded object graph of a web framework, starting from a
//! handful of root modules, and records every module, class, method and
//! class attribute it finds. Inherited attributes are attributed to the class
//! that introduces them, and each class gets the shortest public import path
//! that still reaches it. The result is stored per (project, version) so
//! releases can be browsed and compared.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cbv::{Cbv, DumpReflector, LazyFunctions};
//! use std::path::Path;
//!
//! let mut cbv = Cbv::init(".cbv").unwrap();
//! let reflector = DumpReflector::load(Path::new("django-4.2.json")).unwrap();
//! let roots = vec!["django.views.generic".to_string()];
//!
//! let summary = cbv
//!     .import(&reflector, &roots, "Django", "4.2", LazyFunctions::default())
//!     .unwrap();
//! println!("{} classes", summary.stats.klasses);
//!
//! let snapshot = cbv.snapshot("django", "4.2").unwrap();
//! ```

pub mod config;
pub mod error;
pub mod inspect;
pub mod reflect;
pub mod resolve;
pub mod snapshot;
pub mod storage;

// Re-exports for convenience
pub use config::CbvConfig;
pub use error::{CbvError, Result};
pub use inspect::{best_import_path, LazyFunctions, Walker};
pub use reflect::{DumpReflector, ObjectId, ObjectKind, Reflector};
pub use snapshot::{Record, Snapshot, SnapshotDiff, SnapshotStats};
pub use storage::{JsonStore, MemoryStore, Sink, StoredVersion};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// What one import run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportSummary {
    pub project: String,
    pub version: String,
    pub roots: Vec<String>,
    pub imported_at: DateTime<Utc>,
    pub stats: SnapshotStats,
}

/// Walk `roots`, resolve the result and hand it to `sink`.
///
/// Nothing reaches the sink unless the whole walk succeeds.
pub fn import_project_version<S, R>(
    sink: &mut S,
    reflector: &R,
    roots: &[String],
    project: &str,
    version: &str,
    lazy: LazyFunctions,
) -> Result<ImportSummary>
where
    S: Sink + ?Sized,
    R: Reflector + ?Sized,
{
    info!(project, version, roots = ?roots, "importing");

    let walker = Walker::new(reflector, roots, lazy);
    let snapshot = Snapshot::from_records(project, version, walker)?;
    sink.replace_snapshot(&snapshot)?;

    Ok(ImportSummary {
        project: snapshot.project.clone(),
        version: snapshot.version.clone(),
        roots: roots.to_vec(),
        imported_at: snapshot.imported_at,
        stats: snapshot.stats(),
    })
}

/// The main cbv instance: a handle on a snapshot store.
pub struct Cbv {
    /// Root directory for storage (.cbv/)
    root: PathBuf,
    store: JsonStore,
}

impl Cbv {
    /// Initialize a store in the specified directory.
    ///
    /// Creates the `.cbv/` directory structure if it doesn't exist:
    /// ```text
    /// .cbv/
    /// ├── snapshots/      # One JSON file per (project, version)
    /// └── index.json      # Master index
    /// ```
    pub fn init<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let root = path.into();
        let store = JsonStore::init(&root)?;

        Ok(Self { root, store })
    }

    /// Open an existing store.
    ///
    /// Returns an error if the directory doesn't exist or isn't a valid store.
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let root = path.into();
        let store = JsonStore::open(&root)?;

        Ok(Self { root, store })
    }

    /// Import one (project, version), replacing any earlier import of it.
    pub fn import<R: Reflector + ?Sized>(
        &mut self,
        reflector: &R,
        roots: &[String],
        project: &str,
        version: &str,
        lazy: LazyFunctions,
    ) -> Result<ImportSummary> {
        import_project_version(&mut self.store, reflector, roots, project, version, lazy)
    }

    /// Load a stored snapshot. Project names match case-insensitively.
    pub fn snapshot(&self, project: &str, version: &str) -> Result<Snapshot> {
        self.store.load_snapshot(project, version)
    }

    /// Every stored (project, version).
    pub fn versions(&self) -> Result<Vec<StoredVersion>> {
        self.store.list_versions()
    }

    pub fn delete(&self, project: &str, version: &str) -> Result<()> {
        self.store.delete_snapshot(project, version)
    }

    /// Compare two stored versions of a project.
    pub fn diff(&self, project: &str, old: &str, new: &str) -> Result<SnapshotDiff> {
        let old = self.snapshot(project, old)?;
        let new = self.snapshot(project, new)?;
        Ok(old.diff(&new))
    }

    /// Get the root path of this store.
    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::fixture::GraphBuilder;
    use crate::reflect::{DeferredCall, Literal, Value};
    use tempfile::tempdir;

    const FILE: &str = "/site/app/views.py";

    fn graph(with_setup: bool) -> DumpReflector {
        let mut b = GraphBuilder::new();
        let module = b.module("app.views", FILE);
        let view = b.class("app.views", "View", FILE, 1, 8);
        let dispatch = b.function("app.views", "dispatch", FILE, 3, "    def dispatch(self, request):\n        pass\n", &["self", "request"]);
        b.add_member(view, "dispatch", dispatch);
        if with_setup {
            let setup = b.function("app.views", "setup", FILE, 6, "    def setup(self, request):\n        pass\n", &["self", "request"]);
            b.add_member(view, "setup", setup);
        }
        let title = b.value(Value::Deferred(DeferredCall {
            function: "gettext".into(),
            args: vec![Literal::Str("View".into())],
            kwargs: vec![],
        }));
        b.add_member(view, "title", title);
        b.add_member(module, "View", view);
        b.build()
    }

    #[test]
    fn test_import_and_read_back() {
        let dir = tempdir().unwrap();
        let mut cbv = Cbv::init(dir.path().join(".cbv")).unwrap();
        let roots = vec!["app.views".to_string()];

        let summary = cbv
            .import(&graph(false), &roots, "Django", "1.0", LazyFunctions::default())
            .unwrap();
        assert_eq!(summary.stats.modules, 1);
        assert_eq!(summary.stats.klasses, 1);
        assert_eq!(summary.stats.methods, 1);
        assert_eq!(summary.stats.attributes, 1);

        let snapshot = cbv.snapshot("django", "1.0").unwrap();
        assert_eq!(snapshot.attributes[0].value, "gettext_lazy('View')");
        assert_eq!(cbv.versions().unwrap().len(), 1);
    }

    #[test]
    fn test_diff_between_versions() {
        let dir = tempdir().unwrap();
        let mut cbv = Cbv::init(dir.path()).unwrap();
        let roots = vec!["app.views".to_string()];
        cbv.import(&graph(false), &roots, "Django", "1.0", LazyFunctions::default())
            .unwrap();
        cbv.import(&graph(true), &roots, "Django", "1.1", LazyFunctions::default())
            .unwrap();

        let diff = cbv.diff("Django", "1.0", "1.1").unwrap();
        assert_eq!(diff.added_methods, vec!["app.views.View.setup"]);
        assert!(diff.removed_methods.is_empty());
    }

    #[test]
    fn test_failed_import_keeps_previous_snapshot() {
        let dir = tempdir().unwrap();
        let mut cbv = Cbv::init(dir.path()).unwrap();
        let roots = vec!["app.views".to_string()];
        cbv.import(&graph(true), &roots, "Django", "1.0", LazyFunctions::default())
            .unwrap();

        let mut b = GraphBuilder::new();
        let module = b.module("app.views", FILE);
        let view = b.class("app.views", "View", FILE, 1, 2);
        let bad = b.value(Value::Deferred(DeferredCall {
            function: "format_html".into(),
            args: vec![],
            kwargs: vec![],
        }));
        b.add_member(view, "label", bad);
        b.add_member(module, "View", view);

        let err = cbv
            .import(&b.build(), &roots, "Django", "1.0", LazyFunctions::default())
            .unwrap_err();
        assert!(matches!(err, CbvError::UnknownLazyFunction { .. }));
        assert_eq!(cbv.snapshot("Django", "1.0").unwrap().methods.len(), 2);
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemoryStore::new();
        let roots = vec!["app.views".to_string()];
        import_project_version(&mut sink, &graph(false), &roots, "Django", "1.0", LazyFunctions::default())
            .unwrap();
        assert_eq!(sink.get("DJANGO", "1.0").unwrap().klasses.len(), 1);
    }
}
