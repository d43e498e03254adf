//! sksnap cache - Maintain the fingerprint cache

use clap::{Args, Subcommand};
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{self, HumanLayout};
use crate::cli::OutputFormat;
use crate::core::scan::scan_skills;
use crate::error::Result;

#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommand,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Recompute cache records from current working trees
    Rebuild {
        /// Rebuild a single skill instead of all scanned skills
        skill: Option<String>,
    },
    /// Drop cache records; the next save recomputes them
    Clear {
        /// Clear a single skill instead of the whole cache
        skill: Option<String>,
    },
}

#[derive(Serialize)]
struct CacheReport {
    action: &'static str,
    affected: usize,
}

pub fn run(ctx: &AppContext, args: &CacheArgs) -> Result<()> {
    let report = match &args.command {
        CacheCommand::Rebuild { skill } => {
            let names = match skill {
                Some(name) => vec![name.clone()],
                None => scan_skills(&ctx.skills_dir, &ctx.scan)?.skills,
            };
            let trees: Vec<(String, std::path::PathBuf)> = names
                .into_iter()
                .map(|name| {
                    let path = ctx.skills_dir.join(&name);
                    (name, path)
                })
                .collect();
            let rebuilt = ctx.cache.rebuild(
                trees.iter().map(|(name, path)| (name.as_str(), path.as_path())),
                &ctx.exclude,
            )?;
            CacheReport {
                action: "rebuild",
                affected: rebuilt,
            }
        }
        CacheCommand::Clear { skill } => match skill {
            Some(name) => {
                ctx.cache.invalidate(name)?;
                CacheReport {
                    action: "clear",
                    affected: 1,
                }
            }
            None => {
                let count = ctx.cache.record_count();
                ctx.cache.clear_all()?;
                CacheReport {
                    action: "clear",
                    affected: count,
                }
            }
        },
    };

    if ctx.output_format == OutputFormat::Json {
        return output::emit_json(&report);
    }

    let mut layout = HumanLayout::new();
    match report.action {
        "rebuild" => layout.push_line(format!("Rebuilt {} cache record(s).", report.affected)),
        _ => layout.push_line(format!("Cleared {} cache record(s).", report.affected)),
    };
    layout.print();
    Ok(())
}
