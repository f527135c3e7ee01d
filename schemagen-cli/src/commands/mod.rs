pub mod cache;
pub mod generate;
pub mod init;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use schemagen_core::{config, GeneratorConfig};

/// Load `--config <file>` when given, otherwise `<root>/schemagen.yaml`
/// (defaults when that file is absent).
pub(crate) fn load_config(config_file: Option<&Path>, root: &Path) -> Result<GeneratorConfig> {
    match config_file {
        Some(file) => config::load_at(file)
            .with_context(|| format!("failed to load config '{}'", file.display())),
        None => {
            let root = canonical_root(root)?;
            config::load_from_dir(&root)
                .with_context(|| format!("failed to load config from '{}'", root.display()))
        }
    }
}

pub(crate) fn canonical_root(root: &Path) -> Result<PathBuf> {
    root.canonicalize()
        .with_context(|| format!("cannot resolve path '{}'", root.display()))
}
