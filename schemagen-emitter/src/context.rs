//! Emit context — serializable rendering payload built from a
//! [`ConsolidatedSchema`].
//!
//! Symbol names are arbitrary JSON object keys, so every string a template
//! pastes into generated code is provided pre-quoted per target language
//! (`*_ts` / `*_rs` fields). Templates never wrap raw names in quotes.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use schemagen_core::{ConsolidatedSchema, SchemaNode};

use crate::error::EmitError;

/// Rendering payload handed to every template.
///
/// `symbols` keeps the schema's canonical order; templates must not re-sort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmitContext {
    pub dialect: String,
    pub dialect_ts: String,
    pub dialect_rs: String,
    pub generator_version: String,
    pub symbol_count: usize,
    pub symbols: Vec<SymbolCtx>,
}

/// One symbol as seen by templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolCtx {
    pub name: String,
    /// `name` as a quoted TypeScript string literal.
    pub name_ts: String,
    /// `name` as a quoted Rust string literal.
    pub name_rs: String,
    /// TypeScript identifier of the type guard, unique within the module.
    pub guard: String,
    /// `type` keyword of the node when it is a plain string.
    pub kind: Option<String>,
    /// `required` keyword entries, in declared order.
    pub required: Vec<String>,
    /// `required` entries as quoted TypeScript string literals.
    pub required_ts: Vec<String>,
}

impl EmitContext {
    pub fn from_schema(schema: &ConsolidatedSchema) -> Self {
        let mut guards = BTreeSet::new();
        let symbols: Vec<SymbolCtx> = schema
            .definitions
            .iter()
            .map(|(name, node)| {
                let required = node_required(node);
                SymbolCtx {
                    name: name.clone(),
                    name_ts: ts_literal(name),
                    name_rs: rs_literal(name),
                    guard: guard_name(name, &mut guards),
                    kind: node_kind(node),
                    required_ts: required.iter().map(|f| ts_literal(f)).collect(),
                    required,
                }
            })
            .collect();
        let dialect = schema.dialect.0.clone();
        Self {
            dialect_ts: ts_literal(&dialect),
            dialect_rs: rs_literal(&dialect),
            dialect,
            generator_version: env!("CARGO_PKG_VERSION").to_string(),
            symbol_count: symbols.len(),
            symbols,
        }
    }

    pub fn to_tera_context(&self) -> Result<tera::Context, EmitError> {
        Ok(tera::Context::from_serialize(self)?)
    }
}

/// JSON string encoding is a valid TypeScript string literal.
fn ts_literal(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

/// `Debug` for `str` produces a valid Rust string literal.
fn rs_literal(s: &str) -> String {
    format!("{s:?}")
}

/// `is<Name>` with every non-identifier character replaced by `_`. Names
/// that collide after sanitizing get a numeric suffix in canonical order.
fn guard_name(symbol: &str, taken: &mut BTreeSet<String>) -> String {
    let sanitized: String = symbol
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    let base = format!("is{sanitized}");
    let mut candidate = base.clone();
    let mut n = 2;
    while taken.contains(&candidate) {
        candidate = format!("{base}_{n}");
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

fn node_kind(node: &SchemaNode) -> Option<String> {
    node.0.get("type").and_then(Value::as_str).map(str::to_string)
}

fn node_required(node: &SchemaNode) -> Vec<String> {
    node.0
        .get("required")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
