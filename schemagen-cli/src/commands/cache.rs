//! `schemagen cache show|clear`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use schemagen_pipeline::{clear_cache, ContentCache};

use super::load_config;

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// List cached artifact hashes.
    Show {
        #[command(flatten)]
        target: CacheTarget,

        /// Emit machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Delete the cache file and stored fragments.
    Clear {
        #[command(flatten)]
        target: CacheTarget,
    },
}

/// Which project's cache to operate on.
#[derive(Args, Debug)]
pub struct CacheTarget {
    /// Config file to use instead of <root>/schemagen.yaml.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Project directory holding schemagen.yaml.
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
}

pub fn run(command: CacheCommand) -> Result<()> {
    match command {
        CacheCommand::Show { target, json } => show(target, json),
        CacheCommand::Clear { target } => clear(target),
    }
}

#[derive(Tabled, Serialize)]
struct CacheRow {
    #[tabled(rename = "artifact")]
    path: String,
    #[tabled(rename = "sha256")]
    hash: String,
}

#[derive(Serialize)]
struct CacheJson {
    path: PathBuf,
    records: Vec<CacheRow>,
}

fn show(target: CacheTarget, json: bool) -> Result<()> {
    let config = load_config(target.config.as_deref(), &target.root)?;
    let cache = ContentCache::load(&config.cache_path);
    let rows: Vec<CacheRow> = cache
        .records()
        .iter()
        .map(|(path, hash)| CacheRow {
            path: path.clone(),
            hash: hash.clone(),
        })
        .collect();

    if json {
        let payload = CacheJson {
            path: cache.path().to_path_buf(),
            records: rows,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&payload).context("failed to serialize cache JSON")?
        );
        return Ok(());
    }

    println!("{} ({} record(s))", cache.path().display(), rows.len());
    if rows.is_empty() {
        println!("Cache is empty. Run `schemagen generate` to populate it.");
        return Ok(());
    }
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn clear(target: CacheTarget) -> Result<()> {
    let config = load_config(target.config.as_deref(), &target.root)?;
    clear_cache(&config)?;
    println!("✓ Cleared {}", config.cache_path.display());
    Ok(())
}
