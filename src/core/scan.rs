//! Skill discovery with injected skip rules.
//!
//! The scanner enumerates candidate directories under the skills root and
//! applies simple boolean predicates: hidden and archive directories,
//! symlinks (externally managed), the snapshot tool's own skill
//! (self-protection), trees without a `SKILL.md` manifest, and trees over
//! the configured size cap.

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::utils::fs::dir_size;

pub const DEFAULT_MANIFEST: &str = "SKILL.md";
pub const DEFAULT_MAX_SIZE_MB: u64 = 10;
pub const DEFAULT_SELF_NAME: &str = "skill-snapshot";
pub const DEFAULT_ARCHIVE_DIR: &str = "archive";

/// Why a directory was not treated as a snapshot candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Hidden,
    ArchiveDir,
    Symlink,
    SelfSkill,
    MissingManifest,
    TooLarge { size_bytes: u64 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hidden => write!(f, "hidden"),
            Self::ArchiveDir => write!(f, "archive directory"),
            Self::Symlink => write!(f, "symlink"),
            Self::SelfSkill => write!(f, "self"),
            Self::MissingManifest => write!(f, "no {DEFAULT_MANIFEST}"),
            Self::TooLarge { size_bytes } => {
                write!(f, "size {} MB over cap", size_bytes / (1024 * 1024))
            }
        }
    }
}

/// Skip rules as data, so policy can be swapped or tested independently
/// of the snapshot engine.
#[derive(Debug, Clone)]
pub struct ScanPolicy {
    pub manifest: String,
    pub max_size_bytes: u64,
    pub self_name: String,
    pub archive_dir: String,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            manifest: DEFAULT_MANIFEST.to_string(),
            max_size_bytes: DEFAULT_MAX_SIZE_MB * 1024 * 1024,
            self_name: DEFAULT_SELF_NAME.to_string(),
            archive_dir: DEFAULT_ARCHIVE_DIR.to_string(),
        }
    }
}

impl ScanPolicy {
    /// Apply the skip rules to one candidate directory.
    #[must_use]
    pub fn should_skip(&self, path: &Path) -> Option<SkipReason> {
        let name = path.file_name()?.to_string_lossy();
        if name.starts_with('.') {
            return Some(SkipReason::Hidden);
        }
        if name == self.archive_dir {
            return Some(SkipReason::ArchiveDir);
        }
        if path.is_symlink() {
            return Some(SkipReason::Symlink);
        }
        if name == self.self_name {
            return Some(SkipReason::SelfSkill);
        }
        if !path.join(&self.manifest).is_file() {
            return Some(SkipReason::MissingManifest);
        }
        let size_bytes = dir_size(path);
        if size_bytes > self.max_size_bytes {
            return Some(SkipReason::TooLarge { size_bytes });
        }
        None
    }
}

/// Result of scanning the skills root.
#[derive(Debug, Default, Serialize)]
pub struct ScanOutcome {
    pub skills: Vec<String>,
    pub skipped: Vec<(String, SkipReason)>,
}

/// Enumerate snapshot candidates under `skills_dir`, sorted by name.
pub fn scan_skills(skills_dir: &Path, policy: &ScanPolicy) -> Result<ScanOutcome> {
    let mut outcome = ScanOutcome::default();
    if !skills_dir.is_dir() {
        return Ok(outcome);
    }

    for entry in std::fs::read_dir(skills_dir)? {
        let entry = entry?;
        let path = entry.path();
        // Symlinked directories count as candidates so the symlink rule
        // can report them; anything else that isn't a directory doesn't.
        if !path.is_dir() && !path.is_symlink() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        match policy.should_skip(&path) {
            // Hidden entries are silently dropped, as the original tool did.
            Some(SkipReason::Hidden) => {}
            Some(reason) => outcome.skipped.push((name, reason)),
            None => outcome.skills.push(name),
        }
    }

    outcome.skills.sort();
    outcome.skipped.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skill(root: &Path, name: &str) {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(DEFAULT_MANIFEST), "# skill").unwrap();
    }

    #[test]
    fn finds_skills_and_reports_skips() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        skill(root, "beta");
        skill(root, "alpha");
        skill(root, DEFAULT_SELF_NAME);
        std::fs::create_dir_all(root.join("archive")).unwrap();
        std::fs::create_dir_all(root.join(".hidden")).unwrap();
        std::fs::create_dir_all(root.join("no-manifest")).unwrap();

        let outcome = scan_skills(root, &ScanPolicy::default()).unwrap();
        assert_eq!(outcome.skills, vec!["alpha", "beta"]);
        let skipped: Vec<_> = outcome.skipped.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(skipped, vec!["archive", "no-manifest", DEFAULT_SELF_NAME]);
    }

    #[test]
    fn size_cap_applies() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        skill(root, "big");
        std::fs::write(root.join("big/blob.bin"), vec![0u8; 2048]).unwrap();

        let policy = ScanPolicy {
            max_size_bytes: 1024,
            ..ScanPolicy::default()
        };
        let outcome = scan_skills(root, &policy).unwrap();
        assert!(outcome.skills.is_empty());
        assert!(matches!(
            outcome.skipped.as_slice(),
            [(name, SkipReason::TooLarge { .. })] if name == "big"
        ));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_skill_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        skill(root, "real");
        std::os::unix::fs::symlink(root.join("real"), root.join("linked")).unwrap();

        let outcome = scan_skills(root, &ScanPolicy::default()).unwrap();
        assert_eq!(outcome.skills, vec!["real"]);
        assert!(outcome
            .skipped
            .iter()
            .any(|(n, r)| n == "linked" && *r == SkipReason::Symlink));
    }
}
