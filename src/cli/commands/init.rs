//! sksnap init - Initialize the snapshot store

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{self, HumanLayout};
use crate::cli::OutputFormat;
use crate::error::Result;
use crate::storage::SnapshotStore;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// URL for the `origin` remote (must already exist and be reachable
    /// with ambient git credentials)
    #[arg(long, value_name = "URL")]
    pub remote: Option<String>,
}

#[derive(Serialize)]
struct InitReport {
    store: String,
    skills_dir: String,
    branch: String,
    remote: Option<String>,
}

pub fn run(ctx: &AppContext, args: &InitArgs) -> Result<()> {
    let store = SnapshotStore::init(&ctx.store_root, &ctx.config.store.branch)?;
    if let Some(url) = &args.remote {
        store.configure_remote(url)?;
    }

    let report = InitReport {
        store: ctx.store_root.display().to_string(),
        skills_dir: ctx.skills_dir.display().to_string(),
        branch: store.branch().to_string(),
        remote: args.remote.clone(),
    };

    if ctx.output_format == OutputFormat::Json {
        return output::emit_json(&report);
    }

    let mut layout = HumanLayout::new();
    layout
        .title("Snapshot store initialized")
        .kv("store", &report.store)
        .kv("skills", &report.skills_dir)
        .kv("branch", &report.branch);
    if let Some(remote) = &report.remote {
        layout.kv("remote", remote);
    }
    layout.print();
    Ok(())
}
