//! sksnap scan - List snapshot candidates under the skills directory

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{self, HumanLayout};
use crate::cli::OutputFormat;
use crate::core::scan::scan_skills;
use crate::error::Result;

#[derive(Args, Debug)]
pub struct ScanArgs {}

#[derive(Serialize)]
struct ScanReport {
    skills_dir: String,
    skills: Vec<String>,
    skipped: Vec<SkippedEntry>,
}

#[derive(Serialize)]
struct SkippedEntry {
    skill: String,
    reason: String,
}

pub fn run(ctx: &AppContext, _args: &ScanArgs) -> Result<()> {
    let outcome = scan_skills(&ctx.skills_dir, &ctx.scan)?;
    let report = ScanReport {
        skills_dir: ctx.skills_dir.display().to_string(),
        skills: outcome.skills,
        skipped: outcome
            .skipped
            .into_iter()
            .map(|(skill, reason)| SkippedEntry {
                skill,
                reason: reason.to_string(),
            })
            .collect(),
    };

    if ctx.output_format == OutputFormat::Json {
        return output::emit_json(&report);
    }

    let mut layout = HumanLayout::new();
    layout.title("Skills").kv("directory", &report.skills_dir).blank();
    for skill in &report.skills {
        layout.bullet(skill);
    }
    layout.push_line(format!("\nFound {} skills.", report.skills.len()));
    if !report.skipped.is_empty() {
        layout.blank().section("Skipped");
        for entry in &report.skipped {
            layout.bullet(&format!("{} ({})", entry.skill, entry.reason));
        }
    }
    layout.print();
    Ok(())
}
