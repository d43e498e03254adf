use std::path::PathBuf;

use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::core::exclude::ExcludePolicy;
use crate::core::fingerprint::FingerprintCache;
use crate::core::scan::ScanPolicy;
use crate::error::{Result, SnapError};
use crate::storage::git::CACHE_DIR_NAME;
use crate::storage::SnapshotStore;

/// Shared state for one CLI invocation: resolved locations, config, and
/// the injected policies every engine consumes.
pub struct AppContext {
    pub store_root: PathBuf,
    pub skills_dir: PathBuf,
    pub config: Config,
    pub cache: FingerprintCache,
    pub exclude: ExcludePolicy,
    pub scan: ScanPolicy,
    pub output_format: OutputFormat,
    pub verbosity: u8,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config = Config::load(cli.config.as_deref())?;

        let store_root = match &config.paths.store_dir {
            Some(dir) => dir.clone(),
            None => default_claude_dir()?.join("skill-snapshots"),
        };
        let skills_dir = match &config.paths.skills_dir {
            Some(dir) => dir.clone(),
            None => default_claude_dir()?.join("skills"),
        };

        let exclude = ExcludePolicy::new(&config.policy.exclude)?;
        let scan = ScanPolicy {
            max_size_bytes: config.policy.max_skill_size_mb * 1024 * 1024,
            self_name: config.policy.self_name.clone(),
            ..ScanPolicy::default()
        };
        let cache = FingerprintCache::new(store_root.join(CACHE_DIR_NAME));

        Ok(Self {
            store_root,
            skills_dir,
            config,
            cache,
            exclude,
            scan,
            output_format: cli.output_format(),
            verbosity: cli.verbose,
        })
    }

    /// Open the existing store; `NotInitialized` until `init` has run.
    pub fn store(&self) -> Result<SnapshotStore> {
        SnapshotStore::open(&self.store_root, &self.config.store.branch)
    }
}

fn default_claude_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".claude"))
        .ok_or_else(|| SnapError::Config("home directory not found".to_string()))
}
