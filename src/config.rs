//! Layered configuration.
//!
//! Defaults, overlaid by the global config file
//! (`<config dir>/sksnap/config.toml`), overlaid by an explicit
//! `--config`/`SKSNAP_CONFIG` file, overlaid by environment variables.
//! Files are partial: every field is optional in a patch and merged onto
//! the running config.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::scan::{DEFAULT_MAX_SIZE_MB, DEFAULT_SELF_NAME};
use crate::error::{Result, SnapError};
use crate::storage::git::DEFAULT_BRANCH;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
}

/// Locations; unset fields fall back to `~/.claude/...` defaults
/// resolved in `AppContext`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    pub skills_dir: Option<PathBuf>,
    pub store_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub branch: String,
    /// Sync with `origin` (when configured) on save/backup.
    pub sync: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            branch: DEFAULT_BRANCH.to_string(),
            sync: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub max_skill_size_mb: u64,
    /// The snapshot tool's own skill directory; never captured or restored.
    pub self_name: String,
    /// Extra exclusion patterns on top of the built-in set.
    pub exclude: Vec<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_skill_size_mb: DEFAULT_MAX_SIZE_MB,
            self_name: DEFAULT_SELF_NAME.to_string(),
            exclude: Vec::new(),
        }
    }
}

impl Config {
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("SKSNAP_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            if let Some(patch) = Self::load_patch(&path)? {
                config.merge_patch(patch);
            }
        } else if let Some(global) = Self::load_global()? {
            config.merge_patch(global);
        }

        config.apply_env_overrides();
        Ok(config)
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(None);
        };
        Self::load_patch(&config_dir.join("sksnap/config.toml"))
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|err| SnapError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| SnapError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(paths) = patch.paths {
            if paths.skills_dir.is_some() {
                self.paths.skills_dir = paths.skills_dir;
            }
            if paths.store_dir.is_some() {
                self.paths.store_dir = paths.store_dir;
            }
        }
        if let Some(store) = patch.store {
            if let Some(branch) = store.branch {
                self.store.branch = branch;
            }
            if let Some(sync) = store.sync {
                self.store.sync = sync;
            }
        }
        if let Some(policy) = patch.policy {
            if let Some(max) = policy.max_skill_size_mb {
                self.policy.max_skill_size_mb = max;
            }
            if let Some(self_name) = policy.self_name {
                self.policy.self_name = self_name;
            }
            if let Some(exclude) = policy.exclude {
                self.policy.exclude.extend(exclude);
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("SKSNAP_SKILLS_DIR") {
            self.paths.skills_dir = Some(PathBuf::from(dir));
        }
        if let Ok(dir) = std::env::var("SKSNAP_STORE_DIR") {
            self.paths.store_dir = Some(PathBuf::from(dir));
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigPatch {
    paths: Option<PathsPatch>,
    store: Option<StorePatch>,
    policy: Option<PolicyPatch>,
}

#[derive(Debug, Deserialize)]
struct PathsPatch {
    skills_dir: Option<PathBuf>,
    store_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct StorePatch {
    branch: Option<String>,
    sync: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct PolicyPatch {
    max_skill_size_mb: Option<u64>,
    self_name: Option<String>,
    exclude: Option<Vec<String>>,
}
