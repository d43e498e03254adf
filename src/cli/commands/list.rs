//! sksnap list - List stored snapshots

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{self, HumanLayout};
use crate::cli::OutputFormat;
use crate::error::Result;
use crate::storage::VersionInfo;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Restrict to one skill
    pub skill: Option<String>,
}

#[derive(Serialize)]
struct ListReport {
    snapshots: Vec<VersionInfo>,
}

pub fn run(ctx: &AppContext, args: &ListArgs) -> Result<()> {
    let store = ctx.store()?;
    let snapshots = match &args.skill {
        Some(skill) => store.list_versions(skill)?,
        None => store.list_all_versions()?,
    };

    if ctx.output_format == OutputFormat::Json {
        return output::emit_json(&ListReport { snapshots });
    }

    if snapshots.is_empty() {
        println!("No snapshots found.");
        return Ok(());
    }

    let mut layout = HumanLayout::new();
    layout.push_line(format!("{:<30} | {:<17} | MESSAGE", "SNAPSHOT", "CREATED"));
    layout.push_line("-".repeat(64));
    for info in &snapshots {
        layout.push_line(format!(
            "{:<30} | {} | {}",
            info.tag.to_string(),
            info.created.format("%Y-%m-%d %H:%M"),
            info.message
        ));
    }
    layout.print();
    Ok(())
}
