//! Filesystem utilities.
//!
//! Tree copies (plain and exclusion-filtered), directory sizing, and
//! small helpers shared by the snapshot engines.

use std::path::Path;

use walkdir::WalkDir;

use crate::core::exclude::ExcludePolicy;
use crate::error::Result;

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Total size in bytes of the regular files under `path`. Unreadable
/// entries count as zero.
#[must_use]
pub fn dir_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// Copy `src` into `dst` verbatim (used for the restore safety backup).
/// Symlinks inside the tree are skipped; the snapshot system never owns
/// them.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    copy_tree_inner(src, dst, None)
}

/// Copy `src` into `dst`, omitting paths the exclusion policy rejects.
/// Excluded directories are pruned whole, so none of their content leaks.
pub fn copy_tree_filtered(src: &Path, dst: &Path, exclude: &ExcludePolicy) -> Result<()> {
    copy_tree_inner(src, dst, Some(exclude))
}

fn copy_tree_inner(src: &Path, dst: &Path, exclude: Option<&ExcludePolicy>) -> Result<()> {
    ensure_dir(dst)?;
    let mut it = WalkDir::new(src).min_depth(1).into_iter();
    while let Some(entry) = it.next() {
        let entry =
            entry.map_err(|err| std::io::Error::other(format!("walk {}: {err}", src.display())))?;
        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
        if let Some(policy) = exclude {
            if policy.is_excluded(rel) {
                if entry.file_type().is_dir() {
                    it.skip_current_dir();
                }
                continue;
            }
        }
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            ensure_dir(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                ensure_dir(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
        // Symlinks fall through: neither copied nor followed.
    }
    Ok(())
}
