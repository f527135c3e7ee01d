//! Error taxonomy for schemagen-pipeline.
//!
//! | Type                    | Code                        | Severity                      |
//! |-------------------------|-----------------------------|-------------------------------|
//! | [`DiscoveryError`]      | `E_DISCOVERY`               | fatal                         |
//! | [`ExtractionError`]     | `E_EXTRACTION`              | per artifact, recoverable     |
//! | all extractions failed  | `E_ALL_EXTRACTIONS_FAILED`  | fatal                         |
//! | [`DuplicateSymbolError`]| `E_DUPLICATE_SYMBOL`        | fatal, first conflict only    |
//! | [`CacheError`]          | `E_CACHE`                   | never leaves the cache module |

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use schemagen_core::SchemaNode;
use schemagen_emitter::EmitError;
pub use schemagen_locator::DiscoveryError;

/// Fatal errors surfaced to the caller of a run.
#[derive(Debug, Error)]
pub enum ConsolidateError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// Every artifact in the batch failed extraction.
    #[error("all {} artifact(s) failed extraction", failures.len())]
    AllExtractionsFailed { failures: Vec<ExtractionError> },

    #[error(transparent)]
    DuplicateSymbol(#[from] Box<DuplicateSymbolError>),

    /// An error from the code emitter.
    #[error("emit error: {0}")]
    Emit(#[from] EmitError),

    /// An I/O error while writing outputs, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Canonical schema serialization error.
    #[error("schema JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConsolidateError {
    /// Stable taxonomy code printed alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            ConsolidateError::Discovery(_) => "E_DISCOVERY",
            ConsolidateError::AllExtractionsFailed { .. } => "E_ALL_EXTRACTIONS_FAILED",
            ConsolidateError::DuplicateSymbol(_) => "E_DUPLICATE_SYMBOL",
            ConsolidateError::Emit(_) => "E_EMIT",
            ConsolidateError::Io { .. } | ConsolidateError::Json(_) => "E_OUTPUT",
        }
    }
}

impl From<DuplicateSymbolError> for ConsolidateError {
    fn from(err: DuplicateSymbolError) -> Self {
        ConsolidateError::DuplicateSymbol(Box::new(err))
    }
}

/// One artifact could not be turned into a fragment.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed fragment in {path}: {message}")]
    Malformed { path: PathBuf, message: String },

    #[error("{path} declares no definitions object")]
    MissingDefinitions { path: PathBuf },

    /// The extractor panicked or its task was torn down.
    #[error("extraction of {path} aborted: {message}")]
    Aborted { path: PathBuf, message: String },
}

impl ExtractionError {
    pub const CODE: &'static str = "E_EXTRACTION";

    pub fn path(&self) -> &Path {
        match self {
            ExtractionError::Io { path, .. }
            | ExtractionError::Malformed { path, .. }
            | ExtractionError::MissingDefinitions { path }
            | ExtractionError::Aborted { path, .. } => path,
        }
    }
}

/// Two artifacts define the same symbol with different shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateSymbolError {
    pub symbol: String,
    /// Artifact that defined the symbol first (in path order).
    pub first_path: PathBuf,
    pub second_path: PathBuf,
    pub first: SchemaNode,
    pub second: SchemaNode,
}

impl fmt::Display for DuplicateSymbolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "symbol '{}' is defined incompatibly in {} and {}",
            self.symbol,
            self.first_path.display(),
            self.second_path.display()
        )
    }
}

impl std::error::Error for DuplicateSymbolError {}

/// Cache I/O failures. Always recovered as a cache miss.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt cache data at {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl CacheError {
    pub const CODE: &'static str = "E_CACHE";
}

/// Convenience constructor for [`ConsolidateError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConsolidateError {
    ConsolidateError::Io {
        path: path.into(),
        source,
    }
}

pub(crate) fn cache_io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CacheError {
    CacheError::Io {
        path: path.into(),
        source,
    }
}
