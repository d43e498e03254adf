//! sksnap - Skill Snapshot CLI
//!
//! Versioned, git-backed snapshots for Claude Code skill directories.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use sksnap::Result;
use sksnap::app::AppContext;
use sksnap::cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                // JSON mode: structured error to stdout
                let code = match &e {
                    sksnap::SnapError::NotInitialized(_) => "not_initialized",
                    sksnap::SnapError::Network(_) => "network",
                    sksnap::SnapError::SkillNotFound(_) => "skill_not_found",
                    sksnap::SnapError::NoVersions { .. }
                    | sksnap::SnapError::VersionNotFound { .. } => "version_not_found",
                    sksnap::SnapError::SelfProtected(_) => "self_protected",
                    sksnap::SnapError::SymlinkRejected(_) => "symlink_rejected",
                    _ => "error",
                };
                let error_json = serde_json::json!({
                    "error": true,
                    "code": code,
                    "message": e.to_string(),
                });
                println!("{}", serde_json::to_string(&error_json).unwrap_or_default());
            } else {
                eprintln!("Error: {e}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let ctx = AppContext::from_cli(cli)?;
    sksnap::cli::commands::run(&ctx, &cli.command)
}

fn init_tracing(cli: &Cli) {
    if cli.quiet {
        return;
    }

    let filter = match cli.verbose {
        0 => "warn,sksnap=info",
        1 => "info,sksnap=debug",
        2 => "debug,sksnap=trace",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if cli.json {
        // Keep stdout clean for JSON payloads
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
