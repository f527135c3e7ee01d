//! Tera emission engine — [`EmitTarget`] enum and [`TeraEmitter`].
//!
//! # Output mapping
//!
//! | Target     | Output path (relative to the emit dir) |
//! |------------|----------------------------------------|
//! | TypeScript | `schema-index.ts`                      |
//! | Rust       | `schema_symbols.rs`                    |

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tera::Tera;
use walkdir::WalkDir;

use schemagen_core::ConsolidatedSchema;

use crate::context::EmitContext;
use crate::error::EmitError;

// ---------------------------------------------------------------------------
// Embedded templates — baked into the binary at compile time via include_str!
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[
    ("shared/_header.tera", include_str!("templates/_partials/header.tera")),
    ("typescript/index.ts.tera", include_str!("templates/index.ts.tera")),
    ("rust/symbols.rs.tera", include_str!("templates/symbols.rs.tera")),
];

// ---------------------------------------------------------------------------
// User template directory
// ---------------------------------------------------------------------------

/// Tera name for a template file: its path relative to the template
/// directory, `/`-separated.
fn template_name_for(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Every `*.tera` file under `dir`, walked in file-name order so overrides
/// register identically on every platform. A missing directory overrides
/// nothing.
fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, EmitError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut templates = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(dir).to_path_buf();
            let source = err
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "symlink loop"));
            EmitError::Io { path, source }
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("tera") {
            continue;
        }
        let Ok(relative) = path.strip_prefix(dir) else {
            continue;
        };
        let contents = std::fs::read_to_string(path).map_err(|source| EmitError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        templates.push((template_name_for(relative), contents));
    }
    Ok(templates)
}

fn build_tera(user_template_dir: Option<&Path>) -> Result<Tera, EmitError> {
    let mut templates: BTreeMap<String, String> = TPLS
        .iter()
        .map(|(name, content)| (name.to_string(), content.to_string()))
        .collect();
    if let Some(dir) = user_template_dir {
        for (name, content) in load_user_templates(dir)? {
            templates.insert(name, content);
        }
    }

    let mut tera = Tera::default();
    tera.add_raw_templates(templates)?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// EmitTarget
// ---------------------------------------------------------------------------

/// Every helper module the emitter produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmitTarget {
    TypeScript,
    Rust,
}

impl EmitTarget {
    /// All targets in a stable order.
    pub fn all() -> &'static [EmitTarget] {
        &[EmitTarget::TypeScript, EmitTarget::Rust]
    }

    pub fn template_name(&self) -> &'static str {
        match self {
            EmitTarget::TypeScript => "typescript/index.ts.tera",
            EmitTarget::Rust => "rust/symbols.rs.tera",
        }
    }

    /// Output path relative to the emit directory.
    pub fn output_path(&self) -> PathBuf {
        match self {
            EmitTarget::TypeScript => PathBuf::from("schema-index.ts"),
            EmitTarget::Rust => PathBuf::from("schema_symbols.rs"),
        }
    }
}

// ---------------------------------------------------------------------------
// CodeEmitter
// ---------------------------------------------------------------------------

/// One rendered output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedFile {
    pub relative_path: PathBuf,
    pub content: String,
}

/// Downstream consumer of the canonical schema.
///
/// Implementations receive the schema after merge; its `definitions` are
/// already in canonical symbol order.
pub trait CodeEmitter: Send + Sync {
    fn emit(&self, schema: &ConsolidatedSchema) -> Result<Vec<EmittedFile>, EmitError>;
}

/// Emitter backed by the embedded tera templates.
pub struct TeraEmitter {
    tera: Tera,
}

impl TeraEmitter {
    /// Create an emitter with embedded templates only.
    pub fn new() -> Result<Self, EmitError> {
        Self::with_template_dir(None)
    }

    /// Create an emitter where `.tera` files under `dir` override embedded
    /// templates of the same relative name.
    pub fn with_template_dir(dir: Option<&Path>) -> Result<Self, EmitError> {
        Ok(Self {
            tera: build_tera(dir)?,
        })
    }

    pub fn render_target(&self, ctx: &EmitContext, target: EmitTarget) -> Result<String, EmitError> {
        let tera_ctx = ctx.to_tera_context()?;
        Ok(self.tera.render(target.template_name(), &tera_ctx)?)
    }
}

impl CodeEmitter for TeraEmitter {
    fn emit(&self, schema: &ConsolidatedSchema) -> Result<Vec<EmittedFile>, EmitError> {
        let ctx = EmitContext::from_schema(schema);
        EmitTarget::all()
            .iter()
            .map(|target| {
                Ok(EmittedFile {
                    relative_path: target.output_path(),
                    content: self.render_target(&ctx, *target)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_target_has_an_embedded_template() {
        for target in EmitTarget::all() {
            assert!(
                TPLS.iter().any(|(name, _)| *name == target.template_name()),
                "missing template for {target:?}"
            );
        }
    }

    #[test]
    fn template_names_use_forward_slashes() {
        let relative = Path::new("typescript").join("index.ts.tera");
        assert_eq!(template_name_for(&relative), "typescript/index.ts.tera");
    }

    #[test]
    fn missing_template_dir_overrides_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let templates = load_user_templates(&dir.path().join("absent")).unwrap();
        assert!(templates.is_empty());
    }

    #[test]
    fn non_tera_files_are_ignored() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("rust")).unwrap();
        std::fs::write(dir.path().join("rust").join("symbols.rs.tera"), "x").unwrap();
        std::fs::write(dir.path().join("README.md"), "notes").unwrap();
        let templates = load_user_templates(dir.path()).unwrap();
        assert_eq!(templates, vec![("rust/symbols.rs.tera".to_string(), "x".to_string())]);
    }
}
