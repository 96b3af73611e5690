//
//  config.rs
//  cbv
//

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::inspect::LazyFunctions;

/// Top-level cbv configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CbvConfig {
    #[serde(default)]
    pub project: ProjectConfig,
    /// Root modules to walk, in order.
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Extra eager -> lazy function spellings.
    #[serde(default)]
    pub lazy_functions: BTreeMap<String, String>,
}

/// Which project is being imported. Unset fields fall back to what the
/// object dump recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// One root module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub module: String,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Store directory, relative to the config file.
    #[serde(default = "default_storage_path")]
    pub path: String,
}

const DEFAULT_PROJECT: &str = "Django";

fn default_storage_path() -> String {
    ".cbv".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

impl CbvConfig {
    /// Load config from a TOML file. A missing file yields the defaults; a
    /// malformed one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(toml::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Project name: the flag, then `[project] name`, then the name recorded
    /// in the dump, then "Django".
    pub fn project_name(&self, flag: Option<String>, recorded: Option<&str>) -> String {
        flag.or_else(|| self.project.name.clone())
            .or_else(|| recorded.map(str::to_string))
            .unwrap_or_else(|| DEFAULT_PROJECT.to_string())
    }

    /// Version: the flag, then `[project] version`, then the version recorded
    /// in the dump.
    pub fn project_version(&self, flag: Option<String>, recorded: Option<&str>) -> Option<String> {
        flag.or_else(|| self.project.version.clone())
            .or_else(|| recorded.map(str::to_string))
    }

    /// Root module paths in walk order.
    pub fn root_modules(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.module.clone()).collect()
    }

    /// Default lazy table plus configured extras.
    pub fn lazy_functions(&self) -> LazyFunctions {
        LazyFunctions::with_extra(&self.lazy_functions)
    }

    /// Resolve the store directory relative to the config file's parent.
    pub fn resolve_storage_path(&self, config_path: &Path) -> PathBuf {
        let parent = config_path.parent().unwrap_or(Path::new("."));
        parent.join(&self.storage.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = CbvConfig::load(&dir.path().join("cbv.toml")).unwrap();
        assert_eq!(config, CbvConfig::default());
        assert_eq!(config.project.name, None);
        assert_eq!(config.project_name(None, None), "Django");
        assert_eq!(config.storage.path, ".cbv");
        assert!(config.root_modules().is_empty());
        assert_eq!(config.lazy_functions().len(), 3);
    }

    #[test]
    fn test_full_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cbv.toml");
        std::fs::write(
            &path,
            r#"
[project]
name = "Django"
version = "4.2"

[[sources]]
module = "django.views.generic"
label = "Generic views"

[[sources]]
module = "django.contrib.auth.views"

[storage]
path = "data"

[lazy_functions]
pgettext = "pgettext_lazy"
"#,
        )
        .unwrap();

        let config = CbvConfig::load(&path).unwrap();
        assert_eq!(config.project.version.as_deref(), Some("4.2"));
        assert_eq!(config.project_name(None, Some("Wagtail")), "Django");
        assert_eq!(
            config.root_modules(),
            vec!["django.views.generic", "django.contrib.auth.views"]
        );
        assert_eq!(config.sources[0].label.as_deref(), Some("Generic views"));
        assert_eq!(config.sources[1].label, None);
        assert_eq!(config.resolve_storage_path(&path), dir.path().join("data"));

        let lazy = config.lazy_functions();
        assert_eq!(lazy.lazy_name("pgettext").unwrap(), "pgettext_lazy");
        assert_eq!(lazy.lazy_name("gettext").unwrap(), "gettext_lazy");
    }

    #[test]
    fn test_project_falls_back_to_dump() {
        let config = CbvConfig::default();
        assert_eq!(config.project_name(None, Some("Wagtail")), "Wagtail");
        assert_eq!(
            config.project_name(Some("Django REST framework".into()), Some("Wagtail")),
            "Django REST framework"
        );
        assert_eq!(config.project_version(None, Some("6.0")).as_deref(), Some("6.0"));
        assert_eq!(config.project_version(None, None), None);

        let mut config = CbvConfig::default();
        config.project.version = Some("5.0".into());
        assert_eq!(config.project_version(None, Some("6.0")).as_deref(), Some("5.0"));
        assert_eq!(
            config.project_version(Some("4.2".into()), Some("6.0")).as_deref(),
            Some("4.2")
        );
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cbv.toml");
        std::fs::write(&path, "[project\nname = ").unwrap();
        assert!(matches!(
            CbvConfig::load(&path),
            Err(crate::error::CbvError::Toml(_))
        ));
    }

    #[test]
    fn test_relative_config_path() {
        let config = CbvConfig::default();
        assert_eq!(
            config.resolve_storage_path(Path::new("cbv.toml")),
            PathBuf::from(".cbv")
        );
    }
}
