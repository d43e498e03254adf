//! sksnap backup - Snapshot every changed skill in one pass

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{self, HumanLayout};
use crate::cli::OutputFormat;
use crate::error::Result;
use crate::snapshot::backup::{BackupReport, BatchBackup};

#[derive(Args, Debug)]
pub struct BackupArgs {
    /// Tag annotation for every created snapshot
    #[arg(long, short)]
    pub message: Option<String>,

    /// Skip remote fetch/push for this run
    #[arg(long)]
    pub no_sync: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    #[serde(flatten)]
    batch: &'a BackupReport,
    ok: bool,
}

pub fn run(ctx: &AppContext, args: &BackupArgs) -> Result<()> {
    let store = ctx.store()?;
    let batch = BatchBackup::new(
        &store,
        &ctx.cache,
        &ctx.exclude,
        &ctx.scan,
        &ctx.skills_dir,
    );
    let sync = ctx.config.store.sync && !args.no_sync;
    let report = batch.run(args.message.as_deref(), sync)?;

    if ctx.output_format == OutputFormat::Json {
        return output::emit_json(&Report {
            ok: report.all_succeeded(),
            batch: &report,
        });
    }

    let mut layout = HumanLayout::new();
    layout.section("Backup summary");
    layout.kv("Scanned", &report.scanned.to_string());
    layout.kv("Saved", &report.saved.len().to_string());
    layout.kv("Unchanged", &report.unchanged.len().to_string());
    layout.kv("Failed", &report.failures.len().to_string());
    if !report.saved.is_empty() {
        layout.blank();
        for skill in &report.saved {
            layout.bullet(&format!("saved {skill}"));
        }
    }
    if !report.failures.is_empty() {
        layout.blank();
        for failure in &report.failures {
            layout.bullet(&format!("{}: {}", failure.skill, failure.error));
        }
    }
    layout.print();

    if report.all_succeeded() {
        Ok(())
    } else {
        Err(crate::error::SnapError::Integrity(format!(
            "{} of {} skills failed to back up",
            report.failures.len(),
            report.scanned
        )))
    }
}
