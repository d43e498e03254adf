//! Storage layer: the tag-indexed git store holding all snapshots.

pub mod git;

pub use git::{SnapshotStore, VersionInfo};
