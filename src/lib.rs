//! sksnap - versioned snapshots for Claude Code skill directories.
//!
//! Skills live as plain directory trees under a skills root. This crate
//! captures them into a tag-indexed git store (`<skill>/v<N>`), keeps a
//! content-fingerprint cache so batch backups can skip unchanged skills,
//! and restores prior versions with a backup-first, rollback-on-failure
//! procedure.

pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod snapshot;
pub mod storage;
pub mod utils;

pub use error::{Result, SnapError};
