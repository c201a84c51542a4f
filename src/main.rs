//! CLI entry point for nicocc.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use nicocc_core::app::{self, RunOptions};
use tracing::{debug, error};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (warn)
    let level = app::stderr_level(args.verbose, args.quiet);
    app::init_tracing(level);
    debug!(?args, "CLI arguments parsed");

    let result = if args.show_config {
        show_config(&args)
    } else {
        run(&args, level).await
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn show_config(args: &Args) -> Result<()> {
    for dir in &args.dirs {
        let (root, config) = app::load_config(dir)?;
        println!("# {}", root.display());
        println!("{config}");
    }
    Ok(())
}

async fn run(args: &Args, level: tracing::level_filters::LevelFilter) -> Result<()> {
    let options = RunOptions {
        stderr_level: level,
        ..RunOptions::default()
    };
    for dir in &args.dirs {
        app::run_directory(dir, &options)
            .await
            .with_context(|| format!("processing {} failed", dir.display()))?;
    }
    Ok(())
}
