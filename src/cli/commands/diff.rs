//! sksnap diff - Compare a skill's working tree against a snapshot

use clap::Args;
use console::style;
use serde::Serialize;
use similar::{ChangeTag, TextDiff};

use crate::app::AppContext;
use crate::cli::output::{self, HumanLayout};
use crate::cli::OutputFormat;
use crate::core::VersionTag;
use crate::error::{Result, SnapError};
use crate::snapshot::diff::{ChangeKind, DiffEngine, DiffReport};

#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Skill to compare
    pub skill: String,

    /// Version to compare against (default: latest)
    #[arg(id = "target_version", value_name = "VERSION")]
    pub version: Option<String>,

    /// List changed paths only, without line-level detail
    #[arg(long)]
    pub name_only: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    #[serde(flatten)]
    diff: &'a DiffReport,
    clean: bool,
}

pub fn run(ctx: &AppContext, args: &DiffArgs) -> Result<()> {
    let version = match &args.version {
        Some(input) => Some(
            VersionTag::parse_user_input(&args.skill, input).ok_or_else(|| {
                SnapError::Config(format!("invalid version '{input}' for skill '{}'", args.skill))
            })?,
        ),
        None => None,
    };

    let store = ctx.store()?;
    let engine = DiffEngine::new(&store, &ctx.exclude, &ctx.skills_dir);
    let report = engine.diff(&args.skill, version)?;

    if ctx.output_format == OutputFormat::Json {
        return output::emit_json(&Report {
            clean: report.is_clean(),
            diff: &report,
        });
    }

    if report.is_clean() {
        println!("No differences from {}.", report.tag);
        return Ok(());
    }

    let mut layout = HumanLayout::new();
    layout.section(&format!("Changes since {}", report.tag));
    for entry in &report.entries {
        let marker = match entry.kind {
            ChangeKind::Added => style("A").green().to_string(),
            ChangeKind::Removed => style("D").red().to_string(),
            ChangeKind::Modified => style("M").yellow().to_string(),
        };
        layout.push_line(format!("{marker} {}", entry.path));
        if !args.name_only && entry.kind == ChangeKind::Modified {
            let working = ctx.skills_dir.join(&args.skill).join(&entry.path);
            render_file_diff(&mut layout, &engine, &report.tag, &entry.path, &working)?;
        }
    }
    layout.print();
    Ok(())
}

/// Unified-style line diff for one modified file. Binary content is
/// summarized rather than dumped.
fn render_file_diff(
    layout: &mut HumanLayout,
    engine: &DiffEngine<'_>,
    tag: &VersionTag,
    path: &str,
    working: &std::path::Path,
) -> Result<()> {
    let Some(stored) = engine.stored_file(tag, path)? else {
        return Ok(());
    };
    let current = std::fs::read(working)?;

    let (Ok(old_text), Ok(new_text)) = (
        std::str::from_utf8(&stored),
        std::str::from_utf8(&current),
    ) else {
        layout.push_line("    (binary content changed)");
        return Ok(());
    };

    let diff = TextDiff::from_lines(old_text, new_text);
    for change in diff.iter_all_changes() {
        let line = change.value().trim_end_matches('\n');
        match change.tag() {
            ChangeTag::Delete => {
                layout.push_line(style(format!("    -{line}")).red().to_string());
            }
            ChangeTag::Insert => {
                layout.push_line(style(format!("    +{line}")).green().to_string());
            }
            ChangeTag::Equal => {}
        }
    }
    Ok(())
}
