//! File system store for snapshots.

use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{project_key, Sink};
use crate::error::{CbvError, Result};
use crate::snapshot::{Snapshot, SnapshotStats};

const INDEX_FORMAT: &str = "1";

/// Bytes escaped when a label becomes a path component.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Contents of `index.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreIndex {
    pub format: String,
    /// Keyed by lowercased project name.
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectEntry>,
}

impl Default for StoreIndex {
    fn default() -> Self {
        Self {
            format: INDEX_FORMAT.to_string(),
            projects: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectEntry {
    /// Display name as last imported.
    pub name: String,
    #[serde(default)]
    pub versions: BTreeMap<String, VersionEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionEntry {
    pub imported_at: DateTime<Utc>,
    pub stats: SnapshotStats,
}

/// One row of [`JsonStore::list_versions`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredVersion {
    pub project: String,
    pub version: String,
    pub imported_at: DateTime<Utc>,
    pub stats: SnapshotStats,
}

/// Snapshot store rooted at a `.cbv/` directory.
pub struct JsonStore {
    /// Snapshots directory (.cbv/snapshots/)
    snapshots_dir: PathBuf,
    /// Index file path (.cbv/index.json)
    index_path: PathBuf,
}

impl JsonStore {
    /// Initialize a store directory.
    ///
    /// Creates the directory structure:
    /// ```text
    /// .cbv/
    /// ├── snapshots/
    /// │   └── <project>/<version>.json   (percent-encoded)
    /// └── index.json
    /// ```
    pub fn init(root: &Path) -> Result<Self> {
        let snapshots_dir = root.join("snapshots");
        let index_path = root.join("index.json");

        fs::create_dir_all(&snapshots_dir)?;

        let store = Self {
            snapshots_dir,
            index_path,
        };
        if !store.index_path.exists() {
            store.write_index(&StoreIndex::default())?;
        }
        info!(root = %root.display(), "initialized store");
        Ok(store)
    }

    /// Open an existing store directory.
    pub fn open(root: &Path) -> Result<Self> {
        if !root.exists() {
            return Err(CbvError::NotFound(root.to_path_buf()));
        }

        let snapshots_dir = root.join("snapshots");
        let index_path = root.join("index.json");

        if !snapshots_dir.is_dir() {
            return Err(CbvError::InvalidStructure(
                "Missing snapshots directory".into(),
            ));
        }
        if !index_path.is_file() {
            return Err(CbvError::InvalidStructure("Missing index.json".into()));
        }

        Ok(Self {
            snapshots_dir,
            index_path,
        })
    }

    /// Read a snapshot. The project name is matched case-insensitively.
    pub fn load_snapshot(&self, project: &str, version: &str) -> Result<Snapshot> {
        Self::validate_name(project)?;
        Self::validate_name(version)?;

        let path = self.snapshot_path(project, version);
        if !path.is_file() {
            return Err(CbvError::SnapshotNotFound {
                project: project.to_string(),
                version: version.to_string(),
            });
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Every stored (project, version), ordered by project key then version.
    pub fn list_versions(&self) -> Result<Vec<StoredVersion>> {
        let index = self.read_index()?;
        Ok(index
            .projects
            .into_values()
            .flat_map(|entry| {
                let name = entry.name;
                entry
                    .versions
                    .into_iter()
                    .map(move |(version, v)| StoredVersion {
                        project: name.clone(),
                        version,
                        imported_at: v.imported_at,
                        stats: v.stats,
                    })
            })
            .collect())
    }

    pub fn has_snapshot(&self, project: &str, version: &str) -> bool {
        Self::validate_name(project).is_ok()
            && Self::validate_name(version).is_ok()
            && self.snapshot_path(project, version).is_file()
    }

    /// Remove a stored snapshot and its index entry.
    pub fn delete_snapshot(&self, project: &str, version: &str) -> Result<()> {
        Self::validate_name(project)?;
        Self::validate_name(version)?;

        let path = self.snapshot_path(project, version);
        if !path.is_file() {
            return Err(CbvError::SnapshotNotFound {
                project: project.to_string(),
                version: version.to_string(),
            });
        }
        fs::remove_file(&path)?;

        let key = project_key(project);
        let mut index = self.read_index()?;
        let now_empty = match index.projects.get_mut(&key) {
            Some(entry) => {
                entry.versions.remove(version);
                entry.versions.is_empty()
            }
            None => false,
        };
        if now_empty {
            index.projects.remove(&key);
            let dir = self.snapshots_dir.join(path_component(&key));
            if fs::read_dir(&dir)?.next().is_none() {
                fs::remove_dir(&dir)?;
            }
        }
        self.write_index(&index)?;

        info!(project, version, "deleted snapshot");
        Ok(())
    }

    fn snapshot_path(&self, project: &str, version: &str) -> PathBuf {
        self.snapshots_dir
            .join(path_component(&project_key(project)))
            .join(format!("{}.json", path_component(version)))
    }

    /// Any non-empty label is accepted; it is encoded on its way to disk.
    fn validate_name(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(CbvError::InvalidName("name cannot be empty".to_string()));
        }
        Ok(())
    }

    fn read_index(&self) -> Result<StoreIndex> {
        let content = fs::read_to_string(&self.index_path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write_index(&self, index: &StoreIndex) -> Result<()> {
        write_atomic(&self.index_path, serde_json::to_string_pretty(index)?.as_bytes())
    }
}

impl Sink for JsonStore {
    fn replace_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        Self::validate_name(&snapshot.project)?;
        Self::validate_name(&snapshot.version)?;

        let path = self.snapshot_path(&snapshot.project, &snapshot.version);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        write_atomic(&path, serde_json::to_string(snapshot)?.as_bytes())?;
        debug!(path = %path.display(), "wrote snapshot");

        let mut index = self.read_index()?;
        let entry = index
            .projects
            .entry(project_key(&snapshot.project))
            .or_insert_with(|| ProjectEntry {
                name: snapshot.project.clone(),
                versions: BTreeMap::new(),
            });
        entry.name = snapshot.project.clone();
        entry.versions.insert(
            snapshot.version.clone(),
            VersionEntry {
                imported_at: snapshot.imported_at,
                stats: snapshot.stats(),
            },
        );
        self.write_index(&index)?;

        info!(
            project = %snapshot.project,
            version = %snapshot.version,
            "replaced snapshot"
        );
        Ok(())
    }
}

/// Encode a label as a single file name. Separators, `%` and a leading dot
/// are escaped, so distinct labels never share a path.
fn path_component(label: &str) -> String {
    let encoded = utf8_percent_encode(label, COMPONENT).to_string();
    match encoded.strip_prefix('.') {
        Some(rest) => format!("%2E{rest}"),
        None => encoded,
    }
}

/// Write to a temp file, then rename over `path`.
fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp_path = PathBuf::from(temp);

    let mut file = File::create(&temp_path)?;
    file.write_all(content)?;
    file.sync_all()?;

    fs::rename(&temp_path, path)?;
    Ok(())
}
