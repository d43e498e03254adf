//! sksnap status - Store health and per-skill change summary

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{self, HumanLayout};
use crate::cli::OutputFormat;
use crate::core::scan::scan_skills;
use crate::error::Result;
use crate::storage::SnapshotStore;

#[derive(Args, Debug)]
pub struct StatusArgs {}

#[derive(Serialize)]
struct StatusReport {
    store: String,
    initialized: bool,
    branch: Option<String>,
    dirty: Option<bool>,
    remote: Option<bool>,
    cache_records: usize,
    skills_dir: String,
    changed: Vec<String>,
    unchanged: Vec<String>,
}

pub fn run(ctx: &AppContext, _args: &StatusArgs) -> Result<()> {
    let initialized = SnapshotStore::is_initialized(&ctx.store_root);

    let mut report = StatusReport {
        store: ctx.store_root.display().to_string(),
        initialized,
        branch: None,
        dirty: None,
        remote: None,
        cache_records: ctx.cache.record_count(),
        skills_dir: ctx.skills_dir.display().to_string(),
        changed: Vec::new(),
        unchanged: Vec::new(),
    };

    if initialized {
        let store = ctx.store()?;
        report.branch = Some(store.branch().to_string());
        report.dirty = Some(store.is_dirty()?);
        report.remote = Some(store.has_remote()?);
    }

    if ctx.skills_dir.is_dir() {
        let outcome = scan_skills(&ctx.skills_dir, &ctx.scan)?;
        for skill in outcome.skills {
            let tree = ctx.skills_dir.join(&skill);
            let digest = ctx.cache.capture(&skill, &tree, &ctx.exclude)?;
            if ctx.cache.is_changed(&skill, &digest) {
                report.changed.push(skill);
            } else {
                report.unchanged.push(skill);
            }
        }
    }

    if ctx.output_format == OutputFormat::Json {
        return output::emit_json(&report);
    }

    let mut layout = HumanLayout::new();
    layout.section("Store");
    layout.kv("Location", &report.store);
    layout.kv(
        "Initialized",
        if report.initialized { "yes" } else { "no" },
    );
    if let Some(branch) = &report.branch {
        layout.kv("Branch", branch);
    }
    if let Some(dirty) = report.dirty {
        layout.kv("Working tree", if dirty { "dirty" } else { "clean" });
    }
    if let Some(remote) = report.remote {
        layout.kv("Remote", if remote { "origin" } else { "none" });
    }
    layout.kv("Cache records", &report.cache_records.to_string());

    layout.blank();
    layout.section("Skills");
    layout.kv("Location", &report.skills_dir);
    layout.kv("Changed", &report.changed.len().to_string());
    layout.kv("Unchanged", &report.unchanged.len().to_string());
    for skill in &report.changed {
        layout.bullet(&format!("{skill} (changed since last snapshot)"));
    }
    layout.print();
    Ok(())
}
