//! sksnap delete - Remove a stored snapshot

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{self, HumanLayout};
use crate::cli::OutputFormat;
use crate::core::VersionTag;
use crate::error::{Result, SnapError};

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Skill the snapshot belongs to
    pub skill: String,

    /// Version to delete (`v3`, `3`, or `name/v3`)
    #[arg(id = "target_version", value_name = "VERSION")]
    pub version: String,
}

#[derive(Serialize)]
struct DeleteReport {
    skill: String,
    version: String,
    deleted: bool,
}

pub fn run(ctx: &AppContext, args: &DeleteArgs) -> Result<()> {
    // A full tag naming a different skill is a mistake, not a shorthand.
    if args.version.contains('/') && VersionTag::parse_for(&args.skill, &args.version).is_none() {
        return Err(SnapError::Config(format!(
            "version '{}' does not belong to skill '{}'",
            args.version, args.skill
        )));
    }
    let number = VersionTag::parse_user_input(&args.skill, &args.version).ok_or_else(|| {
        SnapError::Config(format!(
            "invalid version '{}' for skill '{}'",
            args.version, args.skill
        ))
    })?;
    let tag = VersionTag::new(args.skill.clone(), number);

    let store = ctx.store()?;
    store.delete_version(&tag)?;

    if ctx.output_format == OutputFormat::Json {
        return output::emit_json(&DeleteReport {
            skill: args.skill.clone(),
            version: tag.to_string(),
            deleted: true,
        });
    }

    let mut layout = HumanLayout::new();
    layout.push_line(format!("Deleted snapshot {tag}."));
    layout.push_line("Its version number will not be reused.");
    layout.print();
    Ok(())
}
