//! sksnap save - Capture one skill as a new version

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{self, HumanLayout};
use crate::cli::OutputFormat;
use crate::error::Result;
use crate::snapshot::writer::{SaveOptions, SaveOutcome, SnapshotWriter};

#[derive(Args, Debug)]
pub struct SaveArgs {
    /// Skill to snapshot
    pub skill: String,

    /// Tag annotation (default: timestamp note)
    pub message: Option<String>,

    /// Save even when the fingerprint cache reports no changes
    #[arg(long, short)]
    pub force: bool,

    /// Skip remote fetch/push for this save
    #[arg(long)]
    pub no_sync: bool,
}

#[derive(Serialize)]
struct SaveReport {
    skill: String,
    created: bool,
    version: Option<String>,
}

pub fn run(ctx: &AppContext, args: &SaveArgs) -> Result<()> {
    let store = ctx.store()?;
    let writer = SnapshotWriter::new(
        &store,
        &ctx.cache,
        &ctx.exclude,
        &ctx.skills_dir,
        &ctx.config.policy.self_name,
    );
    let opts = SaveOptions {
        message: args.message.clone(),
        sync_remote: ctx.config.store.sync && !args.no_sync,
        skip_fast_check: args.force,
        skip_fetch: false,
    };
    let outcome = writer.save(&args.skill, &opts)?;

    let report = match &outcome {
        SaveOutcome::Created { tag } => SaveReport {
            skill: args.skill.clone(),
            created: true,
            version: Some(tag.to_string()),
        },
        SaveOutcome::Unchanged { latest } => SaveReport {
            skill: args.skill.clone(),
            created: false,
            version: latest.as_ref().map(ToString::to_string),
        },
    };

    if ctx.output_format == OutputFormat::Json {
        return output::emit_json(&report);
    }

    let mut layout = HumanLayout::new();
    match &outcome {
        SaveOutcome::Created { tag } => {
            layout.push_line(format!("Snapshot saved: {tag}"));
        }
        SaveOutcome::Unchanged { latest: Some(tag) } => {
            layout.push_line(format!("No changes since {tag}; nothing to save."));
        }
        SaveOutcome::Unchanged { latest: None } => {
            layout.push_line("No changes detected; nothing to save.");
        }
    }
    layout.print();
    Ok(())
}
