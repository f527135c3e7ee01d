//! Generator configuration — `schemagen.yaml`.
//!
//! # Layout
//!
//! ```text
//! <project>/
//!   schemagen.yaml          (this file)
//!   .schemagen/cache.json   (content cache, default location)
//!   schema.json             (canonical output, default location)
//! ```
//!
//! Relative paths inside the file resolve against the directory holding it.
//! Every field has a default, so an empty file is a valid config.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::types::AdditionalPropertiesPolicy;

/// File name looked up by `load_from_dir` and written by `init_at`.
pub const CONFIG_FILE_NAME: &str = "schemagen.yaml";

/// Full configuration surface consumed by the consolidation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Glob matched against paths relative to `root_path`.
    pub pattern: String,
    pub root_path: PathBuf,
    pub cache_enabled: bool,
    pub cache_path: PathBuf,
    pub parallel_enabled: bool,
    pub additional_properties_policy: AdditionalPropertiesPolicy,
    /// Destination of the canonical schema document.
    pub output_path: PathBuf,
    /// Directory for code emitter output. `None` disables emission.
    pub emit_dir: Option<PathBuf>,
    /// Optional directory of `.tera` templates overriding the embedded ones.
    pub template_dir: Option<PathBuf>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            pattern: "**/*.schema.json".to_string(),
            root_path: PathBuf::from("."),
            cache_enabled: true,
            cache_path: PathBuf::from(".schemagen").join("cache.json"),
            parallel_enabled: true,
            additional_properties_policy: AdditionalPropertiesPolicy::Preserve,
            output_path: PathBuf::from("schema.json"),
            emit_dir: None,
            template_dir: None,
        }
    }
}

impl GeneratorConfig {
    /// Return a copy whose relative paths are joined onto `base`.
    pub fn resolved_against(&self, base: &Path) -> GeneratorConfig {
        let join = |p: &Path| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                base.join(p)
            }
        };
        GeneratorConfig {
            pattern: self.pattern.clone(),
            root_path: join(&self.root_path),
            cache_enabled: self.cache_enabled,
            cache_path: join(&self.cache_path),
            parallel_enabled: self.parallel_enabled,
            additional_properties_policy: self.additional_properties_policy,
            output_path: join(&self.output_path),
            emit_dir: self.emit_dir.as_deref().map(join),
            template_dir: self.template_dir.as_deref().map(join),
        }
    }
}

/// `<dir>/schemagen.yaml` — pure, no I/O.
pub fn config_path_in(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE_NAME)
}

/// Load a config file.
///
/// Returns `ConfigError::NotFound` if absent and `ConfigError::Parse`
/// (with path + line context) if malformed. Relative paths are resolved
/// against the file's parent directory.
pub fn load_at(path: &Path) -> Result<GeneratorConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let config: GeneratorConfig = if contents.trim().is_empty() {
        GeneratorConfig::default()
    } else {
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?
    };
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(config.resolved_against(base))
}

/// Load `<dir>/schemagen.yaml`, falling back to defaults resolved against
/// `dir` when the file does not exist.
pub fn load_from_dir(dir: &Path) -> Result<GeneratorConfig, ConfigError> {
    match load_at(&config_path_in(dir)) {
        Err(ConfigError::NotFound { .. }) => Ok(GeneratorConfig::default().resolved_against(dir)),
        other => other,
    }
}

/// Atomically save a config file.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `rename`.
pub fn save_at(path: &Path, config: &GeneratorConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        }
    }
    let yaml = serde_yaml::to_string(config)?;
    let tmp = path.with_extension("yaml.tmp");
    std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

/// Write a default `schemagen.yaml` into `dir`.
///
/// Refuses to overwrite an existing file.
pub fn init_at(dir: &Path) -> Result<PathBuf, ConfigError> {
    let path = config_path_in(dir);
    if path.exists() {
        return Err(ConfigError::AlreadyExists { path });
    }
    save_at(&path, &GeneratorConfig::default())?;
    Ok(path)
}
