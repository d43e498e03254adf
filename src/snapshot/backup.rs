//! Batch backup: snapshot every changed skill in one pass.
//!
//! Candidates come from the injected scan policy, the fingerprint cache
//! pre-screens for changes, and each skill saves independently: one
//! skill's failure is recorded and the batch moves on, so the final
//! report always covers every candidate.

use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::core::exclude::ExcludePolicy;
use crate::core::fingerprint::FingerprintCache;
use crate::core::scan::{scan_skills, ScanPolicy};
use crate::error::Result;
use crate::snapshot::writer::{SaveOptions, SaveOutcome, SnapshotWriter};
use crate::storage::SnapshotStore;

#[derive(Debug, Clone, Serialize)]
pub struct BackupFailure {
    pub skill: String,
    pub error: String,
}

/// Best-effort completion summary for one batch run.
#[derive(Debug, Default, Serialize)]
pub struct BackupReport {
    pub scanned: usize,
    pub saved: Vec<String>,
    pub unchanged: Vec<String>,
    pub failures: Vec<BackupFailure>,
}

impl BackupReport {
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct BatchBackup<'a> {
    store: &'a SnapshotStore,
    cache: &'a FingerprintCache,
    exclude: &'a ExcludePolicy,
    scan: &'a ScanPolicy,
    skills_dir: &'a Path,
}

impl<'a> BatchBackup<'a> {
    #[must_use]
    pub fn new(
        store: &'a SnapshotStore,
        cache: &'a FingerprintCache,
        exclude: &'a ExcludePolicy,
        scan: &'a ScanPolicy,
        skills_dir: &'a Path,
    ) -> Self {
        Self {
            store,
            cache,
            exclude,
            scan,
            skills_dir,
        }
    }

    /// Scan the skills root and back up every changed candidate.
    pub fn run(&self, message: Option<&str>, sync_remote: bool) -> Result<BackupReport> {
        let outcome = scan_skills(self.skills_dir, self.scan)?;
        if sync_remote {
            // One fetch for the whole batch.
            self.store.fetch_tags()?;
        }
        Ok(self.run_for(&outcome.skills, message, sync_remote))
    }

    /// Back up an explicit candidate list. Failures never abort the
    /// batch; they are collected per skill. When `sync_remote` is set the
    /// caller is expected to have fetched remote tags already; each save
    /// only pushes.
    pub fn run_for(&self, skills: &[String], message: Option<&str>, sync_remote: bool) -> BackupReport {
        let writer = SnapshotWriter::new(
            self.store,
            self.cache,
            self.exclude,
            self.skills_dir,
            &self.scan.self_name,
        );
        let mut report = BackupReport {
            scanned: skills.len(),
            ..BackupReport::default()
        };

        for skill in skills {
            // The pre-scan already consulted the cache; the writer's own
            // store-level check still guards against staleness.
            let changed = match self.cache.capture(skill, &self.skills_dir.join(skill), self.exclude)
            {
                Ok(digest) => self.cache.is_changed(skill, &digest),
                Err(_) => true,
            };
            if !changed {
                report.unchanged.push(skill.clone());
                continue;
            }

            let opts = SaveOptions {
                message: message.map(String::from),
                sync_remote,
                skip_fast_check: true,
                skip_fetch: true,
            };
            match writer.save(skill, &opts) {
                Ok(SaveOutcome::Created { tag }) => {
                    info!(target: "backup", %tag, "saved");
                    report.saved.push(skill.clone());
                }
                Ok(SaveOutcome::Unchanged { .. }) => report.unchanged.push(skill.clone()),
                Err(err) => {
                    warn!(target: "backup", skill = %skill, %err, "backup failed");
                    report.failures.push(BackupFailure {
                        skill: skill.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }
        report
    }
}
