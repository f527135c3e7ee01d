//! Emitter failures. The orchestrator reports all of them as `E_EMIT`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmitError {
    /// A template failed to parse, or failed to render against the symbol
    /// context (unknown variable, missing include).
    #[error("template error: {0}")]
    Tera(#[from] tera::Error),

    /// The symbol context could not be turned into a tera context.
    #[error("symbol context error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A file under the user template directory could not be read.
    #[error("cannot read template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
