//! Domain types for schema consolidation.
//!
//! All path fields use `PathBuf`. Every map that ends up in output is a
//! `BTreeMap` keyed by `String`, so iteration order is ordinal byte order and
//! never depends on hashing or insertion order.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Schema format/version tag propagated into the output document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dialect(pub String);

impl Dialect {
    /// Dialect used when no fragment declares one.
    pub const DEFAULT: &'static str = "http://json-schema.org/draft-07/schema#";
}

impl Default for Dialect {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Dialect {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Dialect {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// One type's shape: an opaque tree of nested key/value nodes.
///
/// Only ever compared by deep structural equality. Object key order does not
/// participate in equality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaNode(pub serde_json::Value);

impl SchemaNode {
    /// Pretty JSON rendering used in diagnostics.
    pub fn to_pretty_string(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| self.0.to_string())
    }
}

impl From<serde_json::Value> for SchemaNode {
    fn from(v: serde_json::Value) -> Self {
        Self(v)
    }
}

// ---------------------------------------------------------------------------
// AdditionalPropertiesPolicy
// ---------------------------------------------------------------------------

/// How the extractor treats object nodes that do not declare
/// `additionalProperties`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdditionalPropertiesPolicy {
    /// Leave nodes exactly as extracted.
    #[default]
    Preserve,
    /// Close open objects with `additionalProperties: false`.
    Forbid,
    /// Mark open objects with `additionalProperties: true`.
    Allow,
}

impl fmt::Display for AdditionalPropertiesPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AdditionalPropertiesPolicy::Preserve => "preserve",
            AdditionalPropertiesPolicy::Forbid => "forbid",
            AdditionalPropertiesPolicy::Allow => "allow",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// SourceArtifact
// ---------------------------------------------------------------------------

/// One discovered source file. Identity is `path`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceArtifact {
    /// Absolute, normalized path.
    pub path: PathBuf,
    /// Content digest, filled in when caching is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

impl SourceArtifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            content_hash: None,
            last_modified: None,
        }
    }

    /// Path string used as the key in cache records.
    pub fn key(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

impl PartialEq for SourceArtifact {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for SourceArtifact {}

// ---------------------------------------------------------------------------
// Fragment
// ---------------------------------------------------------------------------

/// Partial schema extracted from exactly one artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub source: SourceArtifact,
    pub definitions: BTreeMap<String, SchemaNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialect: Option<Dialect>,
}

impl Fragment {
    pub fn new(source: SourceArtifact) -> Self {
        Self {
            source,
            definitions: BTreeMap::new(),
            dialect: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.source.path
    }

    /// Builder-style helper used by extractors and tests.
    pub fn with_definition(mut self, symbol: impl Into<String>, node: impl Into<SchemaNode>) -> Self {
        self.definitions.insert(symbol.into(), node.into());
        self
    }

    pub fn with_dialect(mut self, dialect: impl Into<Dialect>) -> Self {
        self.dialect = Some(dialect.into());
        self
    }
}

// ---------------------------------------------------------------------------
// ConsolidatedSchema
// ---------------------------------------------------------------------------

/// The final, deduplicated, symbol-sorted union of all fragments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedSchema {
    #[serde(rename = "$schema")]
    pub dialect: Dialect,
    pub definitions: BTreeMap<String, SchemaNode>,
}

impl ConsolidatedSchema {
    /// Symbol names in output order.
    pub fn symbols(&self) -> Vec<&str> {
        self.definitions.keys().map(String::as_str).collect()
    }

    /// Canonical document bytes: pretty JSON with a trailing newline.
    pub fn to_canonical_json(&self) -> Result<String, serde_json::Error> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }
}
