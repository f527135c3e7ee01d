//! `schemagen generate` — run the consolidation pipeline once.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use schemagen_core::GeneratorConfig;
use schemagen_emitter::TeraEmitter;
use schemagen_pipeline::{ExtractionError, Orchestrator, RunReport, RunState, WriteResult};

use super::load_config;

/// Arguments for `schemagen generate`.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Config file to use instead of <root>/schemagen.yaml.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Project directory holding schemagen.yaml.
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Override the discovery glob.
    #[arg(long, value_name = "GLOB")]
    pub pattern: Option<String>,

    /// Override the canonical schema output path.
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Ignore and do not update the content cache.
    #[arg(long)]
    pub no_cache: bool,

    /// Extract artifacts one at a time.
    #[arg(long)]
    pub sequential: bool,

    /// Show what would be written without writing outputs or the cache.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit a machine-readable run report.
    #[arg(long)]
    pub json: bool,
}

impl GenerateArgs {
    pub fn run(self) -> Result<()> {
        let config = self.effective_config()?;
        tracing::info!(
            "generating from {} (pattern {})",
            config.root_path.display(),
            config.pattern
        );

        let mut orchestrator = Orchestrator::new(config.clone()).dry_run(self.dry_run);
        if config.emit_dir.is_some() {
            let emitter = TeraEmitter::with_template_dir(config.template_dir.as_deref())
                .context("failed to load emitter templates")?;
            orchestrator = orchestrator.with_emitter(Box::new(emitter));
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start async runtime")?;
        let report = runtime.block_on(orchestrator.run())?;

        if self.json {
            print_json(&report)?;
        } else {
            print_results(&report, self.dry_run);
        }
        Ok(())
    }

    /// File config with command-line overrides applied on top.
    fn effective_config(&self) -> Result<GeneratorConfig> {
        let mut config = load_config(self.config.as_deref(), &self.root)?;
        if let Some(pattern) = &self.pattern {
            config.pattern = pattern.clone();
        }
        if let Some(out) = &self.out {
            config.output_path = from_cwd(out)?;
        }
        if self.no_cache {
            config.cache_enabled = false;
        }
        if self.sequential {
            config.parallel_enabled = false;
        }
        Ok(config)
    }
}

fn from_cwd(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("could not determine current directory")?;
    Ok(cwd.join(path))
}

#[derive(Serialize)]
struct RunReportJson<'a> {
    state: RunState,
    dialect: &'a str,
    symbols: Vec<&'a str>,
    artifacts: &'a [PathBuf],
    extracted: usize,
    reused_from_cache: usize,
    failures: Vec<FailureJson>,
    writes: &'a [WriteResult],
}

#[derive(Serialize)]
struct FailureJson {
    path: PathBuf,
    code: &'static str,
    message: String,
}

impl From<&ExtractionError> for FailureJson {
    fn from(err: &ExtractionError) -> Self {
        Self {
            path: err.path().to_path_buf(),
            code: ExtractionError::CODE,
            message: err.to_string(),
        }
    }
}

fn print_json(report: &RunReport) -> Result<()> {
    let consolidation = &report.consolidation;
    let payload = RunReportJson {
        state: report.state,
        dialect: &report.schema().dialect.0,
        symbols: report.schema().symbols(),
        artifacts: &consolidation.artifacts,
        extracted: consolidation.extracted,
        reused_from_cache: consolidation.reused_from_cache,
        failures: consolidation.failures.iter().map(FailureJson::from).collect(),
        writes: &report.writes,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize run report")?
    );
    Ok(())
}

fn print_results(report: &RunReport, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    let consolidation = &report.consolidation;

    println!(
        "{prefix}✓ {} symbol(s) from {} artifact(s) ({} extracted, {} from cache)",
        report.schema().definitions.len(),
        consolidation.artifacts.len(),
        consolidation.extracted,
        consolidation.reused_from_cache,
    );

    for failure in &consolidation.failures {
        println!("  {}  {failure}", "✗".yellow());
    }

    for r in &report.writes {
        match r {
            WriteResult::Written { path } => println!("  ✎  {}", path.display()),
            WriteResult::WouldWrite { path } => println!("  ~  {}", path.display()),
            WriteResult::Unchanged { path } => println!("  ·  {}", path.display()),
        }
    }
}
