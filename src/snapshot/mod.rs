//! Snapshot engines: save, restore, diff, batch backup.
//!
//! Each engine composes the core policies (exclusion, scan rules, the
//! fingerprint cache) with the git-backed store. Policies arrive by
//! reference so they can be swapped or tested independently.

pub mod backup;
pub mod diff;
pub mod restore;
pub mod writer;

pub use backup::{BackupReport, BatchBackup};
pub use diff::{ChangeKind, DiffEngine, DiffEntry, DiffReport};
pub use restore::{RestoreEngine, RestoreOutcome};
pub use writer::{SaveOptions, SaveOutcome, SnapshotWriter};
