//! Diff engine: compare a stored version against the working tree.
//!
//! Pure read: neither the store, the working tree, nor the fingerprint
//! cache is touched. The comparison applies the same exclusion policy
//! used at capture time, so excluded files never show up as spurious
//! changes. Line-level rendering of modified text files is left to the
//! CLI layer; this engine reports file-level change kinds only.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use walkdir::WalkDir;

use crate::core::exclude::ExcludePolicy;
use crate::core::version::VersionTag;
use crate::error::{Result, SnapError};
use crate::storage::SnapshotStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

/// One changed path; unchanged paths are omitted.
#[derive(Debug, Clone, Serialize)]
pub struct DiffEntry {
    pub path: String,
    pub kind: ChangeKind,
}

#[derive(Debug, Serialize)]
pub struct DiffReport {
    pub tag: VersionTag,
    pub entries: Vec<DiffEntry>,
}

impl DiffReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct DiffEngine<'a> {
    store: &'a SnapshotStore,
    exclude: &'a ExcludePolicy,
    skills_dir: &'a Path,
}

impl<'a> DiffEngine<'a> {
    #[must_use]
    pub fn new(store: &'a SnapshotStore, exclude: &'a ExcludePolicy, skills_dir: &'a Path) -> Self {
        Self {
            store,
            exclude,
            skills_dir,
        }
    }

    /// Compare `name` at `version` (latest when omitted) against its
    /// current working tree. Entries are sorted by path.
    pub fn diff(&self, name: &str, version: Option<u32>) -> Result<DiffReport> {
        let skill_path = self.skills_dir.join(name);
        if !skill_path.is_dir() {
            return Err(SnapError::SkillNotFound(name.to_string()));
        }

        let versions = self.store.version_numbers(name)?;
        let number = match version {
            Some(n) if versions.contains(&n) => n,
            Some(n) => {
                return Err(SnapError::VersionNotFound {
                    name: name.to_string(),
                    version: n,
                    available: versions,
                });
            }
            None => *versions.last().ok_or_else(|| SnapError::NoVersions {
                name: name.to_string(),
            })?,
        };
        let tag = VersionTag::new(name, number);

        let stored = self.store.read_version_tree(&tag)?;
        let working = read_working_tree(&skill_path, self.exclude)?;

        let mut entries = Vec::new();
        for (path, content) in &stored {
            match working.get(path) {
                None => entries.push(DiffEntry {
                    path: path.clone(),
                    kind: ChangeKind::Removed,
                }),
                Some(current) if current != content => entries.push(DiffEntry {
                    path: path.clone(),
                    kind: ChangeKind::Modified,
                }),
                Some(_) => {}
            }
        }
        for path in working.keys() {
            if !stored.contains_key(path) {
                entries.push(DiffEntry {
                    path: path.clone(),
                    kind: ChangeKind::Added,
                });
            }
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(DiffReport { tag, entries })
    }

    /// Stored content of one file at the diffed version, for sub-diff
    /// rendering.
    pub fn stored_file(&self, tag: &VersionTag, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.store.read_version_tree(tag)?.remove(path))
    }
}

fn read_working_tree(
    root: &Path,
    exclude: &ExcludePolicy,
) -> Result<BTreeMap<String, Vec<u8>>> {
    let mut files = BTreeMap::new();
    for entry in WalkDir::new(root) {
        let entry = entry
            .map_err(|err| std::io::Error::other(format!("walk {}: {err}", root.display())))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if exclude.is_excluded(rel) {
            continue;
        }
        let key = rel.to_string_lossy().replace('\\', "/");
        files.insert(key, std::fs::read(entry.path())?);
    }
    Ok(files)
}
