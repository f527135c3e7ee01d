//! schemagen — consolidate per-file JSON Schema fragments into one document.
//!
//! # Usage
//!
//! ```text
//! schemagen init [--root <dir>]
//! schemagen generate [--config <file>] [--root <dir>] [--pattern <glob>] [--out <file>]
//!                    [--no-cache] [--sequential] [--dry-run] [--json] [--verbose]
//! schemagen cache show [--config <file>] [--root <dir>] [--json]
//! schemagen cache clear [--config <file>] [--root <dir>]
//! ```

mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;

use commands::{cache::CacheCommand, generate::GenerateArgs, init::InitArgs};
use schemagen_core::ConfigError;
use schemagen_pipeline::{CacheError, ConsolidateError};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "schemagen",
    version,
    about = "Consolidate per-file JSON Schema fragments into one canonical schema",
    long_about = None,
)]
struct Cli {
    /// Log pipeline stages (info level) and print structural diffs on conflicts.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default schemagen.yaml.
    Init(InitArgs),

    /// Discover, extract, consolidate and write the canonical schema.
    Generate(GenerateArgs),

    /// Inspect or clear the content cache.
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Generate(args) => args.run(),
        Commands::Cache { command } => commands::cache::run(command),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err, cli.verbose);
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins; otherwise `warn`, or `info` with `--verbose`.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Print `error[CODE]: message` for known failures, plus the cause chain.
fn report_error(err: &anyhow::Error, verbose: bool) {
    let code = error_code(err);
    let label = match code {
        Some(code) => format!("error[{code}]:"),
        None => "error:".to_string(),
    };
    eprintln!("{} {err}", label.red().bold());
    for cause in err.chain().skip(1) {
        eprintln!("  caused by: {cause}");
    }

    if let Some(ConsolidateError::DuplicateSymbol(dup)) = err.downcast_ref::<ConsolidateError>() {
        if verbose {
            eprintln!();
            eprint!("{}", dup.structural_diff());
        } else {
            eprintln!("  (rerun with --verbose for a structural diff)");
        }
    }
    if let Some(ConsolidateError::AllExtractionsFailed { failures }) =
        err.downcast_ref::<ConsolidateError>()
    {
        for failure in failures {
            eprintln!("  {} {failure}", "✗".red());
        }
    }
}

fn error_code(err: &anyhow::Error) -> Option<&'static str> {
    if let Some(e) = err.downcast_ref::<ConsolidateError>() {
        return Some(e.code());
    }
    if err.downcast_ref::<CacheError>().is_some() {
        return Some(CacheError::CODE);
    }
    if err.downcast_ref::<ConfigError>().is_some() {
        return Some("E_CONFIG");
    }
    None
}
