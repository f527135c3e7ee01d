//! # schemagen-pipeline
//!
//! Consolidation pipeline: content cache, extraction pool, cross-file
//! validation and merge, hash-gated output writer.
//!
//! Call [`Orchestrator::run`] to discover artifacts, extract fragments,
//! consolidate them into one canonical schema and write it out.

pub mod cache;
pub mod consolidate;
pub mod diff;
pub mod error;
pub mod extractor;
pub mod pipeline;
pub mod worker;
pub mod writer;

pub use cache::{CacheRecords, ContentCache};
pub use error::{CacheError, ConsolidateError, DiscoveryError, DuplicateSymbolError, ExtractionError};
pub use extractor::{ExtractConfig, JsonFragmentExtractor, TypeExtractor};
pub use pipeline::{clear_cache, Consolidation, Orchestrator, RunReport, RunState};
pub use worker::{ArtifactResult, ExtractionPool};
pub use writer::WriteResult;
