//! Error taxonomy for snapshot operations.
//!
//! Every fallible surface in the crate returns [`Result`]. Variants are
//! grouped the way callers react to them: environment problems
//! (`NotInitialized`, `Network`), lookups that failed (`SkillNotFound`,
//! `NoVersions`, `VersionNotFound`), policy rejections (`SymlinkRejected`,
//! `SelfProtected`), and integrity faults that already triggered rollback.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SnapError>;

#[derive(Debug, Error)]
pub enum SnapError {
    #[error("snapshot store not initialized at {0} (run 'sksnap init' first)")]
    NotInitialized(PathBuf),

    /// Retryable environment error: the remote is unreachable, not corrupt.
    #[error("network unavailable: {0}")]
    Network(String),

    #[error("skill '{0}' not found")]
    SkillNotFound(String),

    #[error("skill '{name}' has no snapshots")]
    NoVersions { name: String },

    #[error("version v{version} not found for '{name}'{}", format_available(available))]
    VersionNotFound {
        name: String,
        version: u32,
        available: Vec<u32>,
    },

    #[error("'{0}' is a symbolic link; externally managed trees are not snapshotted")]
    SymlinkRejected(PathBuf),

    #[error("refusing to operate on '{0}': self-modification is not allowed")]
    SelfProtected(String),

    /// A partial write was detected; rollback has already run.
    #[error("snapshot integrity: {0}")]
    Integrity(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("git error: {0}")]
    Git(git2::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<git2::Error> for SnapError {
    fn from(err: git2::Error) -> Self {
        // libgit2 reports transport failures under the Net class; surface
        // those as retryable environment errors rather than store faults.
        if err.class() == git2::ErrorClass::Net {
            Self::Network(err.message().to_string())
        } else {
            Self::Git(err)
        }
    }
}

fn format_available(available: &[u32]) -> String {
    if available.is_empty() {
        String::new()
    } else {
        let list = available
            .iter()
            .map(|v| format!("v{v}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(" (available: {list})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_not_found_lists_alternatives() {
        let err = SnapError::VersionNotFound {
            name: "alpha".to_string(),
            version: 9,
            available: vec![1, 3],
        };
        let msg = err.to_string();
        assert!(msg.contains("v9"));
        assert!(msg.contains("v1, v3"));
    }

    #[test]
    fn version_not_found_without_alternatives() {
        let err = SnapError::VersionNotFound {
            name: "alpha".to_string(),
            version: 2,
            available: vec![],
        };
        assert!(!err.to_string().contains("available"));
    }
}
