//! `schemagen init [--root <dir>]`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use schemagen_core::config;

use super::canonical_root;

/// Write a default `schemagen.yaml`.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Project directory that will hold schemagen.yaml.
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let root = canonical_root(&self.root)?;
        let path = config::init_at(&root)
            .with_context(|| format!("failed to init '{}'", root.display()))?;

        println!("✓ Wrote {}", path.display());
        println!("  Next: schemagen generate --root {}", root.display());
        Ok(())
    }
}
