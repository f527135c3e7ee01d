//! Artifact discovery for `schemagen-locator`.
//!
//! `discover(pattern, root)` walks `root`, matches every regular file's
//! root-relative path against a glob, and returns the matches as
//! [`SourceArtifact`]s sorted by absolute path. The sort is what every later
//! stage relies on for deterministic output, so it is applied here and never
//! depends on directory enumeration order.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use glob::{MatchOptions, Pattern};
use thiserror::Error;
use walkdir::WalkDir;

use schemagen_core::SourceArtifact;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Fatal discovery failures. Any of these aborts the run.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("root {path} is not readable: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("root {path} is not a directory")]
    RootNotDirectory { path: PathBuf },

    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("no artifacts matching '{pattern}' under {root}")]
    NoMatches { pattern: String, root: PathBuf },
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Find every file under `root` whose root-relative path matches `pattern`.
///
/// Symlinks are not followed and never returned, whether they point at a
/// file or a directory; each one is logged at debug level.
///
/// Returns `DiscoveryError::NoMatches` when nothing matches.
pub fn discover(pattern: &str, root: &Path) -> Result<Vec<SourceArtifact>, DiscoveryError> {
    discover_excluding(pattern, root, &[])
}

/// Like [`discover`], skipping any file that is, or lives under, one of
/// `excluded`. Used to keep the tool's own cache and output out of the scan.
pub fn discover_excluding(
    pattern: &str,
    root: &Path,
    excluded: &[PathBuf],
) -> Result<Vec<SourceArtifact>, DiscoveryError> {
    let matcher = Pattern::new(pattern).map_err(|source| DiscoveryError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;
    let root = canonical_root(root)?;
    let excluded: Vec<PathBuf> = excluded.iter().map(|p| normalize(p)).collect();

    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    let mut artifacts = Vec::new();
    for entry in WalkDir::new(&root).follow_links(false) {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!("skipping unreadable entry under {}: {err}", root.display());
                continue;
            }
        };
        if entry.path_is_symlink() {
            tracing::debug!("skipping symlink {}", entry.path().display());
            continue;
        }
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if excluded.iter().any(|ex| path.starts_with(ex)) {
            continue;
        }
        let Ok(relative) = path.strip_prefix(&root) else {
            continue;
        };
        if !matcher.matches_with(&relative_key(relative), options) {
            continue;
        }

        let last_modified = entry
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Utc>::from);
        let mut artifact = SourceArtifact::new(path.to_path_buf());
        artifact.last_modified = last_modified;
        artifacts.push(artifact);
    }

    if artifacts.is_empty() {
        return Err(DiscoveryError::NoMatches {
            pattern: pattern.to_string(),
            root,
        });
    }

    artifacts.sort_by(|a, b| a.path.cmp(&b.path));
    tracing::debug!("discovered {} artifact(s) under {}", artifacts.len(), root.display());
    Ok(artifacts)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn canonical_root(root: &Path) -> Result<PathBuf, DiscoveryError> {
    let canonical = root
        .canonicalize()
        .map_err(|source| DiscoveryError::RootUnreadable {
            path: root.to_path_buf(),
            source,
        })?;
    if !canonical.is_dir() {
        return Err(DiscoveryError::RootNotDirectory { path: canonical });
    }
    // Surface permission problems on the root itself rather than as an
    // empty walk.
    std::fs::read_dir(&canonical).map_err(|source| DiscoveryError::RootUnreadable {
        path: canonical.clone(),
        source,
    })?;
    Ok(canonical)
}

/// Canonicalize when the path exists; exclusions may name files that a run
/// has not created yet.
fn normalize(path: &Path) -> PathBuf {
    if let Ok(p) = path.canonicalize() {
        return p;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => parent
            .canonicalize()
            .map(|p| p.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}

/// Root-relative path with `/` separators on every platform.
fn relative_key(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
