//! Content-fingerprint cache for incremental change detection.
//!
//! One JSON record per skill lives under `<store>/.snapshot_cache/`,
//! holding the digest of the most recently captured snapshot plus
//! per-file `{hash, mtime, size}` entries. The per-file entries let a
//! re-capture skip hashing files whose mtime and size are unchanged.
//!
//! The cache has no authority: it is rebuilt from working trees on
//! demand, droppable wholesale, and any missing, corrupt, or
//! version-mismatched record reads as "changed" so a stale cache can
//! only cost extra work, never a silently skipped snapshot.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::core::exclude::ExcludePolicy;
use crate::error::Result;
use crate::utils::fs::ensure_dir;

/// Bumped when the record layout changes; mismatched records are ignored.
const CACHE_VERSION: &str = "1";

/// Cached state of a single file at capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFingerprint {
    pub hash: String,
    pub mtime_secs: u64,
    pub mtime_nanos: u32,
    pub size: u64,
}

/// Digest of a whole skill tree: a single hex SHA-256 over the sorted
/// `(relative path, file hash)` pairs, plus the per-file detail used for
/// incremental recomputation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeDigest {
    pub digest: String,
    pub files: BTreeMap<String, FileFingerprint>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheRecord {
    cache_version: String,
    last_capture: DateTime<Utc>,
    digest: String,
    files: BTreeMap<String, FileFingerprint>,
}

/// Persistent digest index, one record per skill.
#[derive(Debug, Clone)]
pub struct FingerprintCache {
    dir: PathBuf,
}

impl FingerprintCache {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, skill: &str) -> PathBuf {
        self.dir.join(format!("{skill}.json"))
    }

    /// Number of skills currently recorded.
    #[must_use]
    pub fn record_count(&self) -> usize {
        std::fs::read_dir(&self.dir)
            .map(|entries| {
                entries
                    .filter_map(std::result::Result::ok)
                    .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
                    .count()
            })
            .unwrap_or(0)
    }

    /// Compute the digest of a skill's current working tree, reusing
    /// cached per-file hashes where mtime and size still match.
    ///
    /// Excluded paths are omitted from the input entirely, and files are
    /// folded in sorted relative-path order, so the digest is independent
    /// of filesystem enumeration order and of edits to excluded files.
    pub fn capture(&self, skill: &str, tree: &Path, exclude: &ExcludePolicy) -> Result<TreeDigest> {
        let cached_files = self.load_record(skill).map(|r| r.files).unwrap_or_default();

        let mut files = BTreeMap::new();
        for entry in WalkDir::new(tree).sort_by_file_name() {
            let entry = entry.map_err(|err| {
                std::io::Error::other(format!("walk {}: {err}", tree.display()))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(tree)
                .unwrap_or(entry.path())
                .to_path_buf();
            if exclude.is_excluded(&rel) {
                continue;
            }
            // Forward slashes keep cache keys stable across platforms.
            let key = rel.to_string_lossy().replace('\\', "/");

            let metadata = entry.metadata().map_err(|err| {
                std::io::Error::other(format!("stat {}: {err}", entry.path().display()))
            })?;
            let (mtime_secs, mtime_nanos) = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map_or((0, 0), |d| (d.as_secs(), d.subsec_nanos()));
            let size = metadata.len();

            let fingerprint = match cached_files.get(&key) {
                Some(cached)
                    if cached.mtime_secs == mtime_secs
                        && cached.mtime_nanos == mtime_nanos
                        && cached.size == size =>
                {
                    cached.clone()
                }
                _ => FileFingerprint {
                    hash: hash_file(entry.path())?,
                    mtime_secs,
                    mtime_nanos,
                    size,
                },
            };
            files.insert(key, fingerprint);
        }

        Ok(TreeDigest {
            digest: combine(&files),
            files,
        })
    }

    /// True when a new capture is needed: no usable record exists, or the
    /// stored digest differs from the freshly computed one.
    #[must_use]
    pub fn is_changed(&self, skill: &str, current: &TreeDigest) -> bool {
        match self.load_record(skill) {
            Some(record) => record.digest != current.digest,
            None => true,
        }
    }

    /// Record the digest of the most recent capture. Called only after a
    /// successful snapshot commit or restore.
    pub fn update(&self, skill: &str, digest: &TreeDigest) -> Result<()> {
        ensure_dir(&self.dir)?;
        let record = CacheRecord {
            cache_version: CACHE_VERSION.to_string(),
            last_capture: Utc::now(),
            digest: digest.digest.clone(),
            files: digest.files.clone(),
        };
        let payload = serde_json::to_string_pretty(&record)
            .map_err(|err| std::io::Error::other(format!("serialize cache record: {err}")))?;
        std::fs::write(self.record_path(skill), payload)?;
        Ok(())
    }

    /// Drop the record for one skill. Missing records are fine.
    pub fn invalidate(&self, skill: &str) -> Result<()> {
        let path = self.record_path(skill);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Drop every record. Worst case afterwards is a full recomputation.
    pub fn clear_all(&self) -> Result<()> {
        if self.dir.exists() {
            std::fs::remove_dir_all(&self.dir)?;
        }
        Ok(())
    }

    /// Recompute records for the given skills from their current working
    /// trees. The cache answers "is a new capture needed", so rebuilding
    /// reads the live trees, not the latest stored snapshots.
    pub fn rebuild<'a>(
        &self,
        skills: impl IntoIterator<Item = (&'a str, &'a Path)>,
        exclude: &ExcludePolicy,
    ) -> Result<usize> {
        let mut rebuilt = 0;
        for (skill, tree) in skills {
            self.invalidate(skill)?;
            let digest = self.capture(skill, tree, exclude)?;
            self.update(skill, &digest)?;
            debug!(target: "cache", skill, "record rebuilt");
            rebuilt += 1;
        }
        Ok(rebuilt)
    }

    fn load_record(&self, skill: &str) -> Option<CacheRecord> {
        let path = self.record_path(skill);
        let raw = std::fs::read_to_string(&path).ok()?;
        let record: CacheRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(err) => {
                // Corrupt record: treat as changed rather than trust it.
                warn!(target: "cache", skill, %err, "unreadable cache record, ignoring");
                return None;
            }
        };
        if record.cache_version != CACHE_VERSION {
            debug!(target: "cache", skill, version = %record.cache_version, "cache version mismatch");
            return None;
        }
        Some(record)
    }
}

/// SHA-256 of a file's content, streamed in 8 KiB chunks.
fn hash_file(path: &Path) -> Result<String> {
    use std::io::Read;

    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Fold the sorted `(path, hash)` pairs into one tree digest. BTreeMap
/// iteration supplies the lexicographic normalization.
fn combine(files: &BTreeMap<String, FileFingerprint>) -> String {
    let mut hasher = Sha256::new();
    for (path, fingerprint) in files {
        hasher.update(path.as_bytes());
        hasher.update([0]);
        hasher.update(fingerprint.hash.as_bytes());
        hasher.update([0]);
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch() -> (tempfile::TempDir, FingerprintCache, ExcludePolicy) {
        let dir = tempfile::tempdir().unwrap();
        let cache = FingerprintCache::new(dir.path().join("cache"));
        (dir, cache, ExcludePolicy::default())
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn digest_is_deterministic() {
        let (dir, cache, exclude) = scratch();
        let tree = dir.path().join("skill");
        write(&tree, "SKILL.md", "manifest");
        write(&tree, "scripts/run.py", "print('hi')");

        let a = cache.capture("skill", &tree, &exclude).unwrap();
        let b = cache.capture("skill", &tree, &exclude).unwrap();
        assert_eq!(a.digest, b.digest);
    }

    #[test]
    fn excluded_edits_do_not_change_digest() {
        let (dir, cache, exclude) = scratch();
        let tree = dir.path().join("skill");
        write(&tree, "SKILL.md", "manifest");
        write(&tree, "debug.log", "one");

        let before = cache.capture("skill", &tree, &exclude).unwrap();
        write(&tree, "debug.log", "two");
        write(&tree, ".env", "SECRET=1");
        let after = cache.capture("skill", &tree, &exclude).unwrap();
        assert_eq!(before.digest, after.digest);
    }

    #[test]
    fn content_edits_change_digest() {
        let (dir, cache, exclude) = scratch();
        let tree = dir.path().join("skill");
        write(&tree, "SKILL.md", "manifest");

        let before = cache.capture("skill", &tree, &exclude).unwrap();
        write(&tree, "SKILL.md", "manifest v2");
        let after = cache.capture("skill", &tree, &exclude).unwrap();
        assert_ne!(before.digest, after.digest);
    }

    #[test]
    fn is_changed_true_without_record() {
        let (dir, cache, exclude) = scratch();
        let tree = dir.path().join("skill");
        write(&tree, "SKILL.md", "manifest");

        let digest = cache.capture("skill", &tree, &exclude).unwrap();
        assert!(cache.is_changed("skill", &digest));
        cache.update("skill", &digest).unwrap();
        assert!(!cache.is_changed("skill", &digest));
    }

    #[test]
    fn corrupt_record_reads_as_changed() {
        let (dir, cache, exclude) = scratch();
        let tree = dir.path().join("skill");
        write(&tree, "SKILL.md", "manifest");
        let digest = cache.capture("skill", &tree, &exclude).unwrap();
        cache.update("skill", &digest).unwrap();

        std::fs::write(cache.record_path("skill"), "{not json").unwrap();
        assert!(cache.is_changed("skill", &digest));
    }

    #[test]
    fn invalidate_and_clear_are_safe() {
        let (dir, cache, exclude) = scratch();
        let tree = dir.path().join("skill");
        write(&tree, "SKILL.md", "manifest");
        let digest = cache.capture("skill", &tree, &exclude).unwrap();
        cache.update("skill", &digest).unwrap();
        assert_eq!(cache.record_count(), 1);

        cache.invalidate("skill").unwrap();
        assert!(cache.is_changed("skill", &digest));
        // Double invalidate and clearing an empty cache are no-ops.
        cache.invalidate("skill").unwrap();
        cache.clear_all().unwrap();
        cache.clear_all().unwrap();
        assert_eq!(cache.record_count(), 0);
    }

    #[test]
    fn rebuild_reads_current_trees() {
        let (dir, cache, exclude) = scratch();
        let tree = dir.path().join("skill");
        write(&tree, "SKILL.md", "manifest");
        let stale = cache.capture("skill", &tree, &exclude).unwrap();
        cache.update("skill", &stale).unwrap();

        write(&tree, "SKILL.md", "manifest v2");
        let rebuilt = cache
            .rebuild([("skill", tree.as_path())], &exclude)
            .unwrap();
        assert_eq!(rebuilt, 1);

        let current = cache.capture("skill", &tree, &exclude).unwrap();
        assert!(!cache.is_changed("skill", &current));
    }
}
