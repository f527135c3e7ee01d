//! # schemagen-emitter
//!
//! Tera-based code emitter that turns a [`ConsolidatedSchema`] into helper
//! modules listing its symbols in canonical order.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use schemagen_core::ConsolidatedSchema;
//! use schemagen_emitter::{CodeEmitter, TeraEmitter};
//!
//! fn emit_all(schema: &ConsolidatedSchema) {
//!     if let Ok(emitter) = TeraEmitter::new() {
//!         if let Ok(files) = emitter.emit(schema) {
//!             for file in files {
//!                 println!("{}: {} bytes", file.relative_path.display(), file.content.len());
//!             }
//!         }
//!     }
//! }
//! ```
//!
//! [`ConsolidatedSchema`]: schemagen_core::ConsolidatedSchema

pub mod context;
pub mod engine;
pub mod error;

pub use context::EmitContext;
pub use engine::{CodeEmitter, EmitTarget, EmittedFile, TeraEmitter};
pub use error::EmitError;
