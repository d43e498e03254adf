//! Restore engine: bring a stored version back into the working tree.
//!
//! Restore is the one operation that destroys working-tree state, so its
//! side effects are strictly ordered: back up the current tree first,
//! only then replace it, and refresh the fingerprint cache last. If
//! materialization or the cache refresh fails, the tree is put back from
//! the backup before the error surfaces; if the backup itself fails,
//! nothing has been touched yet and the operation simply aborts.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{info, warn};

use crate::core::exclude::ExcludePolicy;
use crate::core::fingerprint::FingerprintCache;
use crate::core::version::VersionTag;
use crate::error::{Result, SnapError};
use crate::storage::{SnapshotStore, VersionInfo};
use crate::utils::fs::{copy_tree, ensure_dir};

/// Directory under the skills root holding pre-restore safety copies.
/// Never versioned; purely a local safety net.
pub const BACKUP_DIR_NAME: &str = ".snapshot-backups";

/// Outcome of a restore call: a concrete restore, or the version list
/// when no target version was given (query mode, not an error).
#[derive(Debug)]
pub enum RestoreOutcome {
    Restored { tag: VersionTag, path: PathBuf },
    Versions(Vec<VersionInfo>),
}

pub struct RestoreEngine<'a> {
    store: &'a SnapshotStore,
    cache: &'a FingerprintCache,
    exclude: &'a ExcludePolicy,
    skills_dir: &'a Path,
    self_name: &'a str,
}

impl<'a> RestoreEngine<'a> {
    #[must_use]
    pub fn new(
        store: &'a SnapshotStore,
        cache: &'a FingerprintCache,
        exclude: &'a ExcludePolicy,
        skills_dir: &'a Path,
        self_name: &'a str,
    ) -> Self {
        Self {
            store,
            cache,
            exclude,
            skills_dir,
            self_name,
        }
    }

    pub fn restore(&self, name: &str, version: Option<u32>) -> Result<RestoreOutcome> {
        if name == self.self_name {
            return Err(SnapError::SelfProtected(name.to_string()));
        }

        let versions = self.store.version_numbers(name)?;
        if versions.is_empty() {
            return Err(SnapError::NoVersions {
                name: name.to_string(),
            });
        }
        let Some(number) = version else {
            return Ok(RestoreOutcome::Versions(self.store.list_versions(name)?));
        };

        let tag = VersionTag::new(name, number);
        if !versions.contains(&number) {
            return Err(SnapError::VersionNotFound {
                name: name.to_string(),
                version: number,
                available: versions,
            });
        }

        let dest = self.skills_dir.join(name);
        if dest.is_symlink() {
            return Err(SnapError::SymlinkRejected(dest));
        }

        // Read the stored content before touching anything on disk.
        let files = self.store.read_version_tree(&tag)?;

        let backup = self.backup_current(name, &dest)?;
        let result = self.materialize_and_refresh(name, &dest, |dest| write_tree(dest, &files));

        match result {
            Ok(()) => {
                info!(target: "restore", %tag, path = %dest.display(), "restored");
                Ok(RestoreOutcome::Restored { tag, path: dest })
            }
            Err(err) => Err(self.recover_failed_restore(name, &dest, backup.as_deref(), err)),
        }
    }

    /// Copy the existing tree into the reserved backup area. Skipped
    /// only when the skill does not currently exist. Any failure here
    /// aborts before the working tree is touched.
    fn backup_current(&self, name: &str, dest: &Path) -> Result<Option<PathBuf>> {
        if !dest.exists() {
            return Ok(None);
        }
        let stamp = Utc::now().format("%Y%m%d-%H%M%S");
        let backup = self
            .skills_dir
            .join(BACKUP_DIR_NAME)
            .join(format!("{name}-{stamp}"));
        ensure_dir(backup.parent().unwrap_or(self.skills_dir))?;
        copy_tree(dest, &backup)?;
        info!(target: "restore", skill = name, backup = %backup.display(), "current tree backed up");
        Ok(Some(backup))
    }

    /// Replace the working tree with the stored content, then refresh
    /// the cache record. The materializer is injected so failure
    /// handling stays testable.
    fn materialize_and_refresh(
        &self,
        name: &str,
        dest: &Path,
        materialize: impl FnOnce(&Path) -> Result<()>,
    ) -> Result<()> {
        if dest.exists() {
            std::fs::remove_dir_all(dest)?;
        }
        materialize(dest)?;

        // Refresh so the very next change check reflects the restored
        // content instead of reporting a spurious "changed".
        self.cache.invalidate(name)?;
        let digest = self.cache.capture(name, dest, self.exclude)?;
        self.cache.update(name, &digest)?;
        Ok(())
    }

    /// Roll the working tree back and surface the original failure. A
    /// rollback failure is logged; it must not mask the error that
    /// triggered it.
    fn recover_failed_restore(
        &self,
        name: &str,
        dest: &Path,
        backup: Option<&Path>,
        err: SnapError,
    ) -> SnapError {
        if let Err(rollback_err) = self.roll_back(name, dest, backup) {
            warn!(
                target: "restore",
                skill = name,
                %rollback_err,
                "rollback after failed restore also failed"
            );
        }
        err
    }

    fn roll_back(&self, name: &str, dest: &Path, backup: Option<&Path>) -> Result<()> {
        warn!(target: "restore", skill = name, "restore failed, rolling back working tree");
        if dest.exists() {
            std::fs::remove_dir_all(dest)?;
        }
        if let Some(backup) = backup {
            copy_tree(backup, dest)?;
        }
        // The cache may now be stale for this skill; dropping the record
        // fails toward recomputation.
        self.cache.invalidate(name)?;
        Ok(())
    }
}

/// Write a stored file map (slash-separated relative paths) under `dest`.
fn write_tree(dest: &Path, files: &BTreeMap<String, Vec<u8>>) -> Result<()> {
    ensure_dir(dest)?;
    for (rel, content) in files {
        let path = dest.join(rel);
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        std::fs::write(path, content)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::writer::{SaveOptions, SnapshotWriter};
    use crate::storage::git::DEFAULT_BRANCH;

    struct Fixture {
        _dir: tempfile::TempDir,
        store: SnapshotStore,
        cache: FingerprintCache,
        exclude: ExcludePolicy,
        skills_dir: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::init(&dir.path().join("store"), DEFAULT_BRANCH).unwrap();
        let cache = FingerprintCache::new(dir.path().join("store/.snapshot_cache"));
        let skills_dir = dir.path().join("skills");
        std::fs::create_dir_all(&skills_dir).unwrap();
        Fixture {
            _dir: dir,
            store,
            cache,
            exclude: ExcludePolicy::default(),
            skills_dir,
        }
    }

    impl Fixture {
        fn engine(&self) -> RestoreEngine<'_> {
            RestoreEngine::new(
                &self.store,
                &self.cache,
                &self.exclude,
                &self.skills_dir,
                "skill-snapshot",
            )
        }

        fn save(&self, name: &str, content: &str) {
            let dir = self.skills_dir.join(name);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join("SKILL.md"), content).unwrap();
            SnapshotWriter::new(
                &self.store,
                &self.cache,
                &self.exclude,
                &self.skills_dir,
                "skill-snapshot",
            )
            .save(name, &SaveOptions::default())
            .unwrap();
        }
    }

    #[test]
    fn restores_a_prior_version() {
        let fx = fixture();
        fx.save("alpha", "v1 content");
        fx.save("alpha", "v2 content");

        let outcome = fx.engine().restore("alpha", Some(1)).unwrap();
        assert!(matches!(outcome, RestoreOutcome::Restored { ref tag, .. } if tag.number == 1));
        let restored =
            std::fs::read_to_string(fx.skills_dir.join("alpha/SKILL.md")).unwrap();
        assert_eq!(restored, "v1 content");

        // Backup of the pre-restore tree exists in the reserved area.
        let backups: Vec<_> = std::fs::read_dir(fx.skills_dir.join(BACKUP_DIR_NAME))
            .unwrap()
            .collect();
        assert_eq!(backups.len(), 1);
    }

    #[test]
    fn query_mode_lists_versions() {
        let fx = fixture();
        fx.save("alpha", "v1");
        let outcome = fx.engine().restore("alpha", None).unwrap();
        match outcome {
            RestoreOutcome::Versions(infos) => {
                assert_eq!(infos.len(), 1);
                assert_eq!(infos[0].tag.number, 1);
            }
            RestoreOutcome::Restored { .. } => panic!("expected version list"),
        }
    }

    #[test]
    fn missing_version_reports_alternatives() {
        let fx = fixture();
        fx.save("alpha", "v1");
        let err = fx.engine().restore("alpha", Some(9)).unwrap_err();
        assert!(matches!(
            err,
            SnapError::VersionNotFound { version: 9, ref available, .. } if *available == vec![1]
        ));
        assert!(matches!(
            fx.engine().restore("ghost", Some(1)).unwrap_err(),
            SnapError::NoVersions { .. }
        ));
    }

    #[test]
    fn rollback_failure_does_not_mask_the_original_error() {
        let fx = fixture();
        fx.save("alpha", "v1");
        let engine = fx.engine();
        let dest = fx.skills_dir.join("alpha");
        let backup = engine.backup_current("alpha", &dest).unwrap().unwrap();
        // Losing the backup makes the rollback copy itself fail.
        std::fs::remove_dir_all(&backup).unwrap();

        let original = SnapError::Integrity("materialize fault".to_string());
        let err = engine.recover_failed_restore("alpha", &dest, Some(&backup), original);
        assert!(matches!(err, SnapError::Integrity(msg) if msg == "materialize fault"));
    }

    #[test]
    fn failed_materialize_rolls_back_to_prior_tree() {
        let fx = fixture();
        fx.save("alpha", "v1");
        fx.write_working("alpha", "uncommitted edits");

        let engine = fx.engine();
        let dest = fx.skills_dir.join("alpha");
        let backup = engine.backup_current("alpha", &dest).unwrap();
        let result = engine.materialize_and_refresh("alpha", &dest, |dest| {
            // Simulated mid-materialize fault: partial content then error.
            std::fs::create_dir_all(dest)?;
            std::fs::write(dest.join("SKILL.md"), "partial")?;
            Err(SnapError::Integrity("simulated fault".to_string()))
        });
        assert!(result.is_err());
        engine.roll_back("alpha", &dest, backup.as_deref()).unwrap();

        let content = std::fs::read_to_string(dest.join("SKILL.md")).unwrap();
        assert_eq!(content, "uncommitted edits");
    }

    impl Fixture {
        fn write_working(&self, name: &str, content: &str) {
            std::fs::write(self.skills_dir.join(name).join("SKILL.md"), content).unwrap();
        }
    }
}
