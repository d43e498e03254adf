//! sksnap restore - Bring back a stored version of a skill

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{self, HumanLayout};
use crate::cli::OutputFormat;
use crate::core::VersionTag;
use crate::error::{Result, SnapError};
use crate::snapshot::restore::{RestoreEngine, RestoreOutcome};
use crate::storage::VersionInfo;

#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Skill to restore
    pub skill: String,

    /// Version to restore (`v3`, `3`, or `name/v3`); omit to list versions
    #[arg(id = "target_version", value_name = "VERSION")]
    pub version: Option<String>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RestoreReport {
    Restored {
        skill: String,
        version: String,
        path: String,
    },
    Versions {
        skill: String,
        versions: Vec<VersionInfo>,
    },
}

pub fn run(ctx: &AppContext, args: &RestoreArgs) -> Result<()> {
    let version = match &args.version {
        Some(input) => Some(
            VersionTag::parse_user_input(&args.skill, input).ok_or_else(|| {
                SnapError::Config(format!("invalid version '{input}' for skill '{}'", args.skill))
            })?,
        ),
        None => None,
    };

    let store = ctx.store()?;
    let engine = RestoreEngine::new(
        &store,
        &ctx.cache,
        &ctx.exclude,
        &ctx.skills_dir,
        &ctx.config.policy.self_name,
    );

    match engine.restore(&args.skill, version)? {
        RestoreOutcome::Restored { tag, path } => {
            if ctx.output_format == OutputFormat::Json {
                return output::emit_json(&RestoreReport::Restored {
                    skill: args.skill.clone(),
                    version: tag.to_string(),
                    path: path.display().to_string(),
                });
            }
            let mut layout = HumanLayout::new();
            layout.push_line(format!("Restored {tag} to {}", path.display()));
            layout.push_line("The previous contents were backed up first.");
            layout.print();
        }
        RestoreOutcome::Versions(versions) => {
            if ctx.output_format == OutputFormat::Json {
                return output::emit_json(&RestoreReport::Versions {
                    skill: args.skill.clone(),
                    versions,
                });
            }
            let mut layout = HumanLayout::new();
            layout.section(&format!("Versions of {}", args.skill));
            for info in &versions {
                layout.push_line(format!(
                    "v{:<4} {} {}",
                    info.tag.number,
                    info.created.format("%Y-%m-%d %H:%M"),
                    info.message
                ));
            }
            layout.blank();
            layout.push_line(format!(
                "Run `sksnap restore {} <version>` to restore one.",
                args.skill
            ));
            layout.print();
        }
    }
    Ok(())
}
