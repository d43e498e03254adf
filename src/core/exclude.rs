//! Path-pattern exclusion policy.
//!
//! A fixed set of patterns removes transient and sensitive content from
//! every capture: local VCS directories, dependency directories, OS and
//! editor artifacts, compiled files, and credential material. The policy
//! is injected into the snapshot writer, restore engine, and diff engine
//! so all three see the identical file set.

use std::path::Path;

use glob::Pattern;

use crate::error::{Result, SnapError};

/// Patterns applied to every skill at capture time. A pattern matches if
/// any single path component matches it.
const DEFAULT_PATTERNS: &[&str] = &[
    // Local VCS bookkeeping
    ".git",
    ".svn",
    ".hg",
    // Dependency directories
    "node_modules",
    ".venv",
    "venv",
    "__pycache__",
    ".pytest_cache",
    // OS / editor artifacts
    ".DS_Store",
    "__MACOSX",
    "Thumbs.db",
    ".idea",
    ".vscode",
    // Compiled artifacts
    "*.pyc",
    "*.pyo",
    // Credentials and keys
    ".env",
    ".env.*",
    "*.pem",
    "*.key",
    "*.p12",
    "id_rsa*",
    "id_ed25519*",
    "credentials.json",
    // Logs
    "*.log",
];

/// Answers `is_excluded(relative_path)` for capture, restore, and diff.
#[derive(Debug, Clone)]
pub struct ExcludePolicy {
    patterns: Vec<Pattern>,
}

impl ExcludePolicy {
    /// Build the default policy plus any extra patterns from config.
    pub fn new(extra: &[String]) -> Result<Self> {
        let mut patterns = Vec::with_capacity(DEFAULT_PATTERNS.len() + extra.len());
        for raw in DEFAULT_PATTERNS.iter().copied().chain(extra.iter().map(String::as_str)) {
            let pattern = Pattern::new(raw)
                .map_err(|err| SnapError::Config(format!("exclude pattern '{raw}': {err}")))?;
            patterns.push(pattern);
        }
        Ok(Self { patterns })
    }

    /// True if any component of `rel_path` matches an exclusion pattern.
    /// Matching on components means an excluded directory excludes its
    /// whole subtree, with no partial leakage.
    #[must_use]
    pub fn is_excluded(&self, rel_path: &Path) -> bool {
        rel_path.components().any(|component| {
            let name = component.as_os_str().to_string_lossy();
            self.patterns.iter().any(|p| p.matches(&name))
        })
    }
}

impl Default for ExcludePolicy {
    fn default() -> Self {
        // DEFAULT_PATTERNS are all valid globs.
        Self::new(&[]).unwrap_or(Self { patterns: Vec::new() })
    }
}
