//! CLI command implementations.
//!
//! Each subcommand has its own module with an `Args` struct and a
//! `run(ctx, args)` function. Commands translate engine results into
//! human or JSON output; the engines own the semantics.

use clap::Subcommand;

use crate::app::AppContext;
use crate::error::Result;

pub mod backup;
pub mod cache;
pub mod delete;
pub mod diff;
pub mod init;
pub mod list;
pub mod restore;
pub mod save;
pub mod scan;
pub mod status;

pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Init(args) => init::run(ctx, args),
        Commands::Scan(args) => scan::run(ctx, args),
        Commands::Save(args) => save::run(ctx, args),
        Commands::List(args) => list::run(ctx, args),
        Commands::Restore(args) => restore::run(ctx, args),
        Commands::Delete(args) => delete::run(ctx, args),
        Commands::Backup(args) => backup::run(ctx, args),
        Commands::Diff(args) => diff::run(ctx, args),
        Commands::Cache(args) => cache::run(ctx, args),
        Commands::Status(args) => status::run(ctx, args),
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the snapshot store
    Init(init::InitArgs),

    /// Scan the skills directory for snapshot candidates
    Scan(scan::ScanArgs),

    /// Save a snapshot of one skill
    Save(save::SaveArgs),

    /// List snapshots, optionally for one skill
    List(list::ListArgs),

    /// Restore a skill to a stored version
    Restore(restore::RestoreArgs),

    /// Delete one snapshot version
    Delete(delete::DeleteArgs),

    /// Back up every changed skill
    Backup(backup::BackupArgs),

    /// Compare a skill against a stored version
    Diff(diff::DiffArgs),

    /// Maintain the fingerprint cache
    Cache(cache::CacheArgs),

    /// Show store, cache, and change status
    Status(status::StatusArgs),
}
