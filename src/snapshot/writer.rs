//! Snapshot writer: capture a skill's working tree as a new version.
//!
//! Save is all-or-nothing. Changes are detected twice on purpose: the
//! fingerprint cache gives a cheap fast-path, and the store's own
//! index-vs-HEAD comparison is the authoritative check, so a stale or
//! corrupted cache can never suppress a real capture. Any failure after
//! staging rolls the store back to its prior state.

use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, info};

use crate::core::exclude::ExcludePolicy;
use crate::core::fingerprint::FingerprintCache;
use crate::core::version::{next_version, VersionTag};
use crate::error::{Result, SnapError};
use crate::storage::SnapshotStore;

#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// Tag annotation; defaults to a timestamp-derived note.
    pub message: Option<String>,
    /// Fetch tags before and push after the commit (`origin` permitting).
    pub sync_remote: bool,
    /// Skip the cache fast-path (forced save, or batch pre-scan already
    /// checked it).
    pub skip_fast_check: bool,
    /// The caller already fetched remote tags for this run, so the save
    /// only pushes (batch mode fetches once up front).
    pub skip_fetch: bool,
}

/// Outcome of a save: a new version, or a legitimate no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Created { tag: VersionTag },
    Unchanged { latest: Option<VersionTag> },
}

pub struct SnapshotWriter<'a> {
    store: &'a SnapshotStore,
    cache: &'a FingerprintCache,
    exclude: &'a ExcludePolicy,
    skills_dir: &'a Path,
    self_name: &'a str,
}

impl<'a> SnapshotWriter<'a> {
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

    pub fn save(&self, name: &str, opts: &SaveOptions) -> Result<SaveOutcome> {
        let skill_path = self.reject_invalid(name)?;

        if opts.sync_remote && !opts.skip_fetch {
            self.store.fetch_tags()?;
        }

        // Fast-path: trust the cache only to do *extra* work, never less.
        let digest = self.cache.capture(name, &skill_path, self.exclude)?;
        if !opts.skip_fast_check && !self.cache.is_changed(name, &digest) {
            debug!(target: "save", skill = name, "unchanged per fingerprint cache");
            return Ok(SaveOutcome::Unchanged {
                latest: self.store.latest_version(name)?,
            });
        }

        self.store.stage(name, &skill_path, self.exclude)?;

        // Authoritative check against the store itself.
        if self.store.staged_matches_head(name)? {
            debug!(target: "save", skill = name, "unchanged per store comparison");
            self.cache.update(name, &digest)?;
            return Ok(SaveOutcome::Unchanged {
                latest: self.store.latest_version(name)?,
            });
        }

        let number = next_version(&self.store.version_numbers(name)?);
        let tag = VersionTag::new(name, number);
        let message = opts.message.clone().unwrap_or_else(default_message);

        if let Err(err) = self.commit_and_push(&tag, &message, opts.sync_remote) {
            // Leave no half-written snapshot behind.
            self.store.discard_staged(name)?;
            return Err(err);
        }

        self.cache.update(name, &digest)?;
        info!(target: "save", %tag, "snapshot saved");
        Ok(SaveOutcome::Created { tag })
    }

    fn commit_and_push(&self, tag: &VersionTag, message: &str, sync: bool) -> Result<()> {
        self.store.commit_and_tag(tag, message)?;
        if sync {
            if let Err(push_err) = self.store.push_version(tag) {
                // A version that never reached the remote must not
                // survive locally either; a retry would otherwise see it
                // as current and the snapshot would stay local forever.
                if let Err(undo_err) = self.store.undo_version(tag) {
                    return Err(SnapError::Integrity(format!(
                        "push of {tag} failed ({push_err}) and local rollback failed ({undo_err})"
                    )));
                }
                return Err(push_err);
            }
        }
        Ok(())
    }

    fn reject_invalid(&self, name: &str) -> Result<PathBuf> {
        if name == self.self_name {
            return Err(SnapError::SelfProtected(name.to_string()));
        }
        let skill_path = self.skills_dir.join(name);
        if skill_path.is_symlink() {
            return Err(SnapError::SymlinkRejected(skill_path));
        }
        if !skill_path.is_dir() {
            return Err(SnapError::SkillNotFound(name.to_string()));
        }
        Ok(skill_path)
    }
}

fn default_message() -> String {
    format!("Snapshot at {}", Local::now().format("%Y-%m-%d %H:%M"))
}
