//! Type extractor boundary and the JSON fragment extractor.
//!
//! The pipeline never looks inside a source file itself: every artifact goes
//! through a [`TypeExtractor`], which returns one [`Fragment`] or an
//! [`ExtractionError`]. Implementations run on blocking worker threads and
//! must not share mutable state between calls.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use schemagen_core::{AdditionalPropertiesPolicy, Dialect, Fragment, SchemaNode, SourceArtifact};

use crate::error::ExtractionError;

/// Extractor settings derived from the generator config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractConfig {
    pub additional_properties_policy: AdditionalPropertiesPolicy,
}

impl ExtractConfig {
    /// Digest of every setting that can change extractor output. Stored
    /// fragments are keyed on it so a config change is a cache miss.
    pub fn fingerprint(&self) -> String {
        let mut h = Sha256::new();
        h.update(b"additional_properties_policy=");
        h.update(self.additional_properties_policy.to_string().as_bytes());
        hex::encode(h.finalize())
    }
}

/// Turns one source artifact into a schema fragment.
pub trait TypeExtractor: Send + Sync {
    fn extract(
        &self,
        artifact: &SourceArtifact,
        config: &ExtractConfig,
    ) -> Result<Fragment, ExtractionError>;
}

// ---------------------------------------------------------------------------
// JsonFragmentExtractor
// ---------------------------------------------------------------------------

/// Reads fragments already expressed as JSON schema documents:
///
/// ```json
/// { "$schema": "...", "definitions": { "IUser": { "type": "object" } } }
/// ```
///
/// `$defs` is accepted in place of `definitions`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFragmentExtractor;

impl TypeExtractor for JsonFragmentExtractor {
    fn extract(
        &self,
        artifact: &SourceArtifact,
        config: &ExtractConfig,
    ) -> Result<Fragment, ExtractionError> {
        let path = &artifact.path;
        let raw = std::fs::read(path).map_err(|source| ExtractionError::Io {
            path: path.clone(),
            source,
        })?;
        let doc: Value = serde_json::from_slice(&raw).map_err(|e| ExtractionError::Malformed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let Value::Object(mut doc) = doc else {
            return Err(ExtractionError::Malformed {
                path: path.clone(),
                message: "top-level value is not an object".to_string(),
            });
        };

        let definitions = match doc.remove("definitions").or_else(|| doc.remove("$defs")) {
            Some(Value::Object(defs)) => defs,
            Some(_) => {
                return Err(ExtractionError::Malformed {
                    path: path.clone(),
                    message: "definitions is not an object".to_string(),
                })
            }
            None => {
                return Err(ExtractionError::MissingDefinitions { path: path.clone() });
            }
        };

        let dialect = match doc.get("$schema") {
            Some(Value::String(s)) => Some(Dialect::from(s.as_str())),
            Some(_) => {
                return Err(ExtractionError::Malformed {
                    path: path.clone(),
                    message: "$schema is not a string".to_string(),
                })
            }
            None => None,
        };

        let mut out = BTreeMap::new();
        for (symbol, mut node) in definitions {
            apply_policy(&mut node, config.additional_properties_policy);
            out.insert(symbol, SchemaNode(node));
        }

        tracing::debug!("extracted {} definition(s) from {}", out.len(), path.display());
        Ok(Fragment {
            source: artifact.clone(),
            definitions: out,
            dialect,
        })
    }
}

/// Fill in `additionalProperties` on open object nodes, recursively.
fn apply_policy(node: &mut Value, policy: AdditionalPropertiesPolicy) {
    let value = match policy {
        AdditionalPropertiesPolicy::Preserve => return,
        AdditionalPropertiesPolicy::Forbid => false,
        AdditionalPropertiesPolicy::Allow => true,
    };
    close_objects(node, value);
}

fn close_objects(node: &mut Value, value: bool) {
    match node {
        Value::Object(map) => {
            if is_object_type(map) && !map.contains_key("additionalProperties") {
                map.insert("additionalProperties".to_string(), Value::Bool(value));
            }
            for child in map.values_mut() {
                close_objects(child, value);
            }
        }
        Value::Array(items) => {
            for child in items {
                close_objects(child, value);
            }
        }
        _ => {}
    }
}

fn is_object_type(map: &Map<String, Value>) -> bool {
    matches!(map.get("type"), Some(Value::String(t)) if t == "object")
}
