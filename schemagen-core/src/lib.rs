//! schemagen core library — domain types, generator configuration, errors.
//!
//! - [`types`] — artifacts, fragments, schema nodes, the consolidated schema
//! - [`config`] — `schemagen.yaml` load / save / init
//! - [`error`] — [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::{GeneratorConfig, CONFIG_FILE_NAME};
pub use error::ConfigError;
pub use types::{
    AdditionalPropertiesPolicy, ConsolidatedSchema, Dialect, Fragment, SchemaNode, SourceArtifact,
};
