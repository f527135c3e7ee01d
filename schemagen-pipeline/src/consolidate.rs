//! Cross-fragment validation and merge.
//!
//! Both entry points sort their input by artifact path before looking at
//! it, so the outcome (including which conflict is reported) depends only on
//! the set of fragments, never on the order they arrive in. Neither touches
//! the filesystem.

use std::collections::BTreeMap;
use std::path::Path;

use schemagen_core::{ConsolidatedSchema, Dialect, Fragment, SchemaNode};

use crate::error::DuplicateSymbolError;

fn path_sorted(fragments: &[Fragment]) -> Vec<&Fragment> {
    let mut sorted: Vec<&Fragment> = fragments.iter().collect();
    sorted.sort_by(|a, b| a.path().cmp(b.path()));
    sorted
}

/// Check that every symbol defined in more than one fragment has the same
/// structure everywhere.
///
/// Stops at the first conflict in path order.
pub fn validate_compatibility(fragments: &[Fragment]) -> Result<(), DuplicateSymbolError> {
    let mut seen: BTreeMap<&str, (&Path, &SchemaNode)> = BTreeMap::new();
    for fragment in path_sorted(fragments) {
        for (symbol, node) in &fragment.definitions {
            match seen.get(symbol.as_str()) {
                Some((first_path, first)) if *first != node => {
                    return Err(DuplicateSymbolError {
                        symbol: symbol.clone(),
                        first_path: first_path.to_path_buf(),
                        second_path: fragment.path().to_path_buf(),
                        first: (*first).clone(),
                        second: node.clone(),
                    });
                }
                Some(_) => {
                    tracing::debug!(
                        "{symbol} repeated identically in {}",
                        fragment.path().display()
                    );
                }
                None => {
                    seen.insert(symbol.as_str(), (fragment.path(), node));
                }
            }
        }
    }
    Ok(())
}

/// Fold every fragment into one schema with symbol-sorted definitions.
///
/// Expects validated input: a repeated symbol overwrites an identical node.
/// The dialect comes from the first fragment (path order) declaring one.
pub fn merge(fragments: &[Fragment]) -> ConsolidatedSchema {
    let sorted = path_sorted(fragments);
    let dialect = merge_dialect(&sorted);

    let mut definitions: BTreeMap<String, SchemaNode> = BTreeMap::new();
    for fragment in sorted {
        for (symbol, node) in &fragment.definitions {
            definitions.insert(symbol.clone(), node.clone());
        }
    }

    ConsolidatedSchema {
        dialect,
        definitions,
    }
}

/// [`validate_compatibility`] then [`merge`].
pub fn consolidate(fragments: &[Fragment]) -> Result<ConsolidatedSchema, DuplicateSymbolError> {
    validate_compatibility(fragments)?;
    Ok(merge(fragments))
}

fn merge_dialect(sorted: &[&Fragment]) -> Dialect {
    sorted
        .iter()
        .find_map(|f| f.dialect.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use schemagen_core::SourceArtifact;
    use serde_json::json;

    use super::*;

    fn fragment(path: &str) -> Fragment {
        Fragment::new(SourceArtifact::new(path))
    }

    fn user(required: &[&str]) -> serde_json::Value {
        json!({"type": "object", "required": required})
    }

    #[test]
    fn identical_duplicates_merge_into_one_entry() {
        let fragments = vec![
            fragment("/src/b.json").with_definition("IUser", user(&["id"])),
            fragment("/src/a.json").with_definition("IUser", user(&["id"])),
        ];
        let schema = consolidate(&fragments).expect("compatible");
        assert_eq!(schema.symbols(), vec!["IUser"]);
    }

    #[test]
    fn conflicting_duplicates_name_symbol_and_both_paths() {
        let fragments = vec![
            fragment("/src/b.json").with_definition("IUser", user(&["id", "email"])),
            fragment("/src/a.json").with_definition("IUser", user(&["id"])),
        ];
        let err = consolidate(&fragments).unwrap_err();
        assert_eq!(err.symbol, "IUser");
        assert_eq!(err.first_path, PathBuf::from("/src/a.json"));
        assert_eq!(err.second_path, PathBuf::from("/src/b.json"));
        assert_eq!(err.first, SchemaNode(user(&["id"])));
        assert_eq!(err.second, SchemaNode(user(&["id", "email"])));
    }

    #[test]
    fn first_conflict_in_path_order_wins() {
        let fragments = vec![
            fragment("/src/c.json")
                .with_definition("Alpha", json!({"v": 3}))
                .with_definition("Beta", json!({"v": 3})),
            fragment("/src/a.json").with_definition("Beta", json!({"v": 1})),
            fragment("/src/b.json").with_definition("Alpha", json!({"v": 2})),
        ];
        let err = validate_compatibility(&fragments).unwrap_err();
        // c.json is visited last and its symbols in name order: Alpha, then Beta.
        assert_eq!(err.symbol, "Alpha");
        assert_eq!(err.first_path, PathBuf::from("/src/b.json"));
        assert_eq!(err.second_path, PathBuf::from("/src/c.json"));
    }

    #[test]
    fn output_keys_are_ordinal_sorted() {
        let fragments = vec![
            fragment("/src/1.json").with_definition("Zebra", json!({})),
            fragment("/src/2.json").with_definition("Apple", json!({})),
            fragment("/src/3.json")
                .with_definition("Middle", json!({}))
                .with_definition("apple", json!({}))
                .with_definition("_private", json!({})),
        ];
        let schema = consolidate(&fragments).unwrap();
        assert_eq!(schema.symbols(), vec!["Apple", "Middle", "Zebra", "_private", "apple"]);
    }

    #[test]
    fn merge_is_independent_of_input_order() {
        let a = fragment("/src/a.json").with_definition("A", json!({"x": 1}));
        let b = fragment("/src/b.json")
            .with_definition("B", json!({"y": 2}))
            .with_dialect("draft-b");
        let forward = merge(&[a.clone(), b.clone()]);
        let backward = merge(&[b, a]);
        assert_eq!(forward, backward);
        assert_eq!(
            forward.to_canonical_json().unwrap(),
            backward.to_canonical_json().unwrap()
        );
    }

    #[test]
    fn dialect_comes_from_first_declaring_fragment() {
        let fragments = vec![
            fragment("/src/c.json").with_dialect("draft-c"),
            fragment("/src/a.json"),
            fragment("/src/b.json").with_dialect("draft-b"),
        ];
        assert_eq!(merge(&fragments).dialect, Dialect::from("draft-b"));
    }

    #[test]
    fn dialect_defaults_when_undeclared() {
        let fragments = vec![fragment("/src/a.json").with_definition("A", json!({}))];
        assert_eq!(merge(&fragments).dialect, Dialect::default());
    }

    #[test]
    fn empty_input_merges_to_empty_schema() {
        let schema = consolidate(&[]).unwrap();
        assert!(schema.definitions.is_empty());
    }
}
