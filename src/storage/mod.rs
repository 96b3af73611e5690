//! Storage layer for cbv.
//!
//! A [`Sink`] receives the finished snapshot of one import run and replaces
//! whatever it held for the same (project, version). Project names compare
//! case-insensitively.
//!
//! - [`JsonStore`] persists snapshots under a `.cbv/` directory.
//! - [`MemoryStore`] keeps them in a map, for tests and dry runs.

mod fs;

pub use fs::{JsonStore, ProjectEntry, StoreIndex, StoredVersion, VersionEntry};

use std::collections::BTreeMap;

use crate::error::Result;
use crate::snapshot::Snapshot;

/// Destination for import results.
pub trait Sink {
    /// Replace everything stored for the snapshot's (project, version) with
    /// the snapshot's contents.
    fn replace_snapshot(&mut self, snapshot: &Snapshot) -> Result<()>;
}

/// Key under which a project is stored.
pub fn project_key(project: &str) -> String {
    project.to_lowercase()
}

/// In-memory sink.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshots: BTreeMap<(String, String), Snapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, project: &str, version: &str) -> Option<&Snapshot> {
        self.snapshots
            .get(&(project_key(project), version.to_string()))
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl Sink for MemoryStore {
    fn replace_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.snapshots.insert(
            (project_key(&snapshot.project), snapshot.version.clone()),
            snapshot.clone(),
        );
        Ok(())
    }
}
