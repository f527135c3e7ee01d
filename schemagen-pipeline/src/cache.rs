//! Content cache — SHA-256 change detection for discovered artifacts.
//!
//! Persists a flat JSON object mapping absolute artifact paths to their last
//! seen SHA-256 hex digest at the configured `cache_path`. Alongside it, a
//! fragment store (`<cache_path stem>.fragments/`) holds extracted fragments
//! keyed on content hash + extractor fingerprint, which is what lets a repeat
//! run skip extraction for unchanged artifacts.
//!
//! The cache is a plain value: loaded once at the start of a run, persisted
//! once after every hash for the run is known. Nothing in here surfaces an
//! error to the run; failures are logged and treated as misses.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::task::JoinSet;

use schemagen_core::{Dialect, Fragment, SchemaNode, SourceArtifact};

use crate::error::{cache_io_err, CacheError};
use crate::extractor::ExtractConfig;

/// Path string → SHA-256 hex digest. Sorted so the persisted file is stable.
pub type CacheRecords = BTreeMap<String, String>;

/// On-disk shape of a stored fragment. The source path is not stored: two
/// artifacts with identical bytes share one entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredFragment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dialect: Option<Dialect>,
    definitions: BTreeMap<String, SchemaNode>,
}

/// In-memory view of the persisted cache file.
#[derive(Debug, Clone)]
pub struct ContentCache {
    path: PathBuf,
    records: CacheRecords,
}

impl ContentCache {
    /// Load the cache at `path`.
    ///
    /// A missing file is an empty cache. A corrupt or unreadable file is
    /// logged and also treated as empty.
    pub fn load(path: &Path) -> Self {
        let records = match read_records(path) {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!("[{}] ignoring cache: {err}", CacheError::CODE);
                CacheRecords::new()
            }
        };
        tracing::debug!("loaded {} cache record(s) from {}", records.len(), path.display());
        Self {
            path: path.to_path_buf(),
            records,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &CacheRecords {
        &self.records
    }

    /// Last persisted hash for `path`, if any.
    pub fn stored_hash(&self, path: &Path) -> Option<&str> {
        self.records
            .get(path.to_string_lossy().as_ref())
            .map(String::as_str)
    }

    /// True unless the persisted hash for `path` equals `hash`.
    pub fn has_changed(&self, path: &Path, hash: &str) -> bool {
        self.stored_hash(path) != Some(hash)
    }

    /// Replace the persisted mapping with `records`.
    ///
    /// Writes `<path>.tmp` then renames over `<path>`, creating the cache
    /// directory if needed. The in-memory mapping is updated only on success.
    pub fn persist(&mut self, records: CacheRecords) -> Result<(), CacheError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| cache_io_err(dir, e))?;
        }
        let json = serde_json::to_string_pretty(&records).map_err(|source| CacheError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        let tmp = tmp_path(&self.path);
        std::fs::write(&tmp, json).map_err(|e| cache_io_err(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(cache_io_err(&self.path, e));
        }
        tracing::debug!("persisted {} cache record(s) to {}", records.len(), self.path.display());
        self.records = records;
        Ok(())
    }

    /// Delete the persisted file and fragment store, and forget every record.
    pub fn clear(&mut self) -> Result<(), CacheError> {
        self.records.clear();
        remove_if_present(&self.path, false)?;
        remove_if_present(&self.fragment_dir(), true)?;
        Ok(())
    }

    /// Directory holding stored fragments.
    pub fn fragment_dir(&self) -> PathBuf {
        fragment_dir_for(&self.path)
    }

    /// Load the fragment stored for `artifact`'s content hash, rebinding it
    /// to `artifact`. Any failure is a miss.
    pub fn load_fragment(&self, artifact: &SourceArtifact, config: &ExtractConfig) -> Option<Fragment> {
        let hash = artifact.content_hash.as_deref()?;
        let path = self.fragment_path(hash, config);
        let raw = match std::fs::read(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                tracing::warn!("[{}] {}", CacheError::CODE, cache_io_err(&path, err));
                return None;
            }
        };
        match serde_json::from_slice::<StoredFragment>(&raw) {
            Ok(stored) => Some(Fragment {
                source: artifact.clone(),
                definitions: stored.definitions,
                dialect: stored.dialect,
            }),
            Err(source) => {
                tracing::warn!("[{}] {}", CacheError::CODE, CacheError::Corrupt { path, source });
                None
            }
        }
    }

    /// Store `fragment` under its artifact's content hash.
    pub fn store_fragment(&self, fragment: &Fragment, config: &ExtractConfig) -> Result<(), CacheError> {
        let Some(hash) = fragment.source.content_hash.as_deref() else {
            return Ok(());
        };
        let path = self.fragment_path(hash, config);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| cache_io_err(dir, e))?;
        }
        let stored = StoredFragment {
            dialect: fragment.dialect.clone(),
            definitions: fragment.definitions.clone(),
        };
        let json = serde_json::to_vec(&stored).map_err(|source| CacheError::Corrupt {
            path: path.clone(),
            source,
        })?;
        let tmp = tmp_path(&path);
        std::fs::write(&tmp, json).map_err(|e| cache_io_err(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(cache_io_err(&path, e));
        }
        Ok(())
    }

    fn fragment_path(&self, hash: &str, config: &ExtractConfig) -> PathBuf {
        let mut h = Sha256::new();
        h.update(hash.as_bytes());
        h.update(config.fingerprint().as_bytes());
        self.fragment_dir().join(format!("{}.json", hex::encode(h.finalize())))
    }
}

// ---------------------------------------------------------------------------
// Async entry points used by the orchestrator
// ---------------------------------------------------------------------------

impl ContentCache {
    /// [`ContentCache::load`] on the blocking pool.
    pub async fn load_async(path: &Path) -> Self {
        let owned = path.to_path_buf();
        match tokio::task::spawn_blocking(move || ContentCache::load(&owned)).await {
            Ok(cache) => cache,
            Err(err) => {
                tracing::warn!("[{}] cache load task failed: {err}", CacheError::CODE);
                Self {
                    path: path.to_path_buf(),
                    records: CacheRecords::new(),
                }
            }
        }
    }

    /// Split `artifacts` into fragments reusable from the store and the
    /// artifacts that still need extraction. Both halves keep path order.
    pub async fn partition_reusable(
        &self,
        artifacts: Vec<SourceArtifact>,
        config: ExtractConfig,
    ) -> (Vec<Fragment>, Vec<SourceArtifact>) {
        let cache = self.clone();
        let fallback = artifacts.clone();
        let task = tokio::task::spawn_blocking(move || {
            let mut reused = Vec::new();
            let mut pending = Vec::new();
            for artifact in artifacts {
                let stored = match artifact.content_hash.as_deref() {
                    Some(hash) if !cache.has_changed(&artifact.path, hash) => {
                        cache.load_fragment(&artifact, &config)
                    }
                    _ => None,
                };
                match stored {
                    Some(fragment) => {
                        tracing::debug!("reusing cached fragment for {}", artifact.path.display());
                        reused.push(fragment);
                    }
                    None => pending.push(artifact),
                }
            }
            (reused, pending)
        });
        match task.await {
            Ok(split) => split,
            Err(err) => {
                tracing::warn!("[{}] fragment lookup task failed: {err}", CacheError::CODE);
                (Vec::new(), fallback)
            }
        }
    }

    /// Store every fragment, logging failures.
    pub async fn store_fragments(&self, fragments: &[Fragment], config: ExtractConfig) {
        let cache = self.clone();
        let batch = fragments.to_vec();
        let task = tokio::task::spawn_blocking(move || {
            for fragment in &batch {
                if let Err(err) = cache.store_fragment(fragment, &config) {
                    tracing::warn!("[{}] {err}", CacheError::CODE);
                }
            }
        });
        if let Err(err) = task.await {
            tracing::warn!("[{}] fragment store task failed: {err}", CacheError::CODE);
        }
    }

    /// [`ContentCache::persist`] on the blocking pool.
    pub async fn persist_async(&mut self, records: CacheRecords) -> Result<(), CacheError> {
        let mut cache = self.clone();
        let task = tokio::task::spawn_blocking(move || {
            let result = cache.persist(records);
            (cache, result)
        });
        match task.await {
            Ok((cache, result)) => {
                *self = cache;
                result
            }
            Err(err) => Err(cache_io_err(
                &self.path,
                std::io::Error::new(std::io::ErrorKind::Other, err.to_string()),
            )),
        }
    }
}

/// `<dir>/<stem>.fragments` next to the cache file.
pub fn fragment_dir_for(cache_path: &Path) -> PathBuf {
    cache_path.with_extension("fragments")
}

/// SHA-256 hex digest of raw bytes.
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

/// SHA-256 hex digest of a file's raw bytes.
pub async fn hash_file(path: &Path) -> Result<String, CacheError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| cache_io_err(path, e))?;
    Ok(hash_bytes(&bytes))
}

/// Fill in `content_hash` for every artifact.
///
/// With `concurrent`, every file is hashed in its own task; results are
/// re-sorted by path before returning. An artifact that cannot be hashed
/// keeps `content_hash = None`, which downstream treats as a miss.
pub async fn hash_all(artifacts: Vec<SourceArtifact>, concurrent: bool) -> Vec<SourceArtifact> {
    let mut hashed = if concurrent {
        let mut set = JoinSet::new();
        for artifact in artifacts {
            set.spawn(async move { with_hash(artifact).await });
        }
        let mut out = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(artifact) => out.push(artifact),
                Err(err) => tracing::warn!("[{}] hashing task failed: {err}", CacheError::CODE),
            }
        }
        out
    } else {
        let mut out = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            out.push(with_hash(artifact).await);
        }
        out
    };
    hashed.sort_by(|a, b| a.path.cmp(&b.path));
    hashed
}

async fn with_hash(mut artifact: SourceArtifact) -> SourceArtifact {
    match hash_file(&artifact.path).await {
        Ok(hash) => artifact.content_hash = Some(hash),
        Err(err) => tracing::warn!("[{}] {err}", CacheError::CODE),
    }
    artifact
}

/// Records for the artifacts of this run. Artifacts without a hash are left
/// out so the next run treats them as changed.
pub fn records_for(artifacts: &[SourceArtifact]) -> CacheRecords {
    artifacts
        .iter()
        .filter_map(|a| a.content_hash.clone().map(|h| (a.key(), h)))
        .collect()
}

fn read_records(path: &Path) -> Result<CacheRecords, CacheError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(CacheRecords::new()),
        Err(err) => return Err(cache_io_err(path, err)),
    };
    serde_json::from_str(&raw).map_err(|source| CacheError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

fn tmp_path(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.tmp", path.display()))
}

fn remove_if_present(path: &Path, dir: bool) -> Result<(), CacheError> {
    let result = if dir {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    match result {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(cache_io_err(path, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn cache_path(tmp: &TempDir) -> PathBuf {
        tmp.path().join(".schemagen").join("cache.json")
    }

    #[test]
    fn empty_cache_when_file_missing() {
        let tmp = TempDir::new().unwrap();
        let cache = ContentCache::load(&cache_path(&tmp));
        assert!(cache.records().is_empty());
    }

    #[test]
    fn corrupt_file_degrades_to_empty() {
        let tmp = TempDir::new().unwrap();
        let path = cache_path(&tmp);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ definitely not json").unwrap();
        let cache = ContentCache::load(&path);
        assert!(cache.records().is_empty());
    }

    #[test]
    fn wrong_shape_degrades_to_empty() {
        let tmp = TempDir::new().unwrap();
        let path = cache_path(&tmp);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"["a", "b"]"#).unwrap();
        assert!(ContentCache::load(&path).records().is_empty());
    }

    #[test]
    fn persist_creates_directory_and_roundtrips() {
        let tmp = TempDir::new().unwrap();
        let path = cache_path(&tmp);
        let mut cache = ContentCache::load(&path);
        let mut records = CacheRecords::new();
        records.insert("/src/b.schema.json".into(), "bbb".into());
        records.insert("/src/a.schema.json".into(), "aaa".into());
        cache.persist(records.clone()).unwrap();

        let loaded = ContentCache::load(&path);
        assert_eq!(loaded.records(), &records);
        assert!(!tmp_path(&path).exists(), "tmp file should be removed after rename");
    }

    #[test]
    fn has_changed_compares_with_persisted_hash() {
        let tmp = TempDir::new().unwrap();
        let mut cache = ContentCache::load(&cache_path(&tmp));
        let mut records = CacheRecords::new();
        records.insert("/src/a.schema.json".into(), "aaa".into());
        cache.persist(records).unwrap();

        assert!(!cache.has_changed(Path::new("/src/a.schema.json"), "aaa"));
        assert!(cache.has_changed(Path::new("/src/a.schema.json"), "bbb"));
        assert!(cache.has_changed(Path::new("/src/unknown.schema.json"), "aaa"));
    }

    #[test]
    fn clear_removes_file_fragments_and_records() {
        let tmp = TempDir::new().unwrap();
        let path = cache_path(&tmp);
        let mut cache = ContentCache::load(&path);
        let mut records = CacheRecords::new();
        records.insert("/src/a.schema.json".into(), "aaa".into());
        cache.persist(records).unwrap();

        let mut artifact = SourceArtifact::new("/src/a.schema.json");
        artifact.content_hash = Some("aaa".into());
        let fragment = Fragment::new(artifact).with_definition("A", json!({"type": "string"}));
        cache.store_fragment(&fragment, &ExtractConfig::default()).unwrap();
        assert!(cache.fragment_dir().exists());

        cache.clear().unwrap();
        assert!(cache.records().is_empty());
        assert!(!path.exists());
        assert!(!cache.fragment_dir().exists());

        // Clearing twice is fine.
        cache.clear().unwrap();
    }

    #[test]
    fn stored_fragment_rebinds_to_new_source() {
        let tmp = TempDir::new().unwrap();
        let cache = ContentCache::load(&cache_path(&tmp));
        let config = ExtractConfig::default();

        let mut first = SourceArtifact::new("/src/a.schema.json");
        first.content_hash = Some("same".into());
        let fragment = Fragment::new(first)
            .with_definition("A", json!({"type": "string"}))
            .with_dialect("draft-07");
        cache.store_fragment(&fragment, &config).unwrap();

        let mut second = SourceArtifact::new("/src/copy.schema.json");
        second.content_hash = Some("same".into());
        let loaded = cache.load_fragment(&second, &config).expect("hit");
        assert_eq!(loaded.path(), Path::new("/src/copy.schema.json"));
        assert_eq!(loaded.definitions, fragment.definitions);
        assert_eq!(loaded.dialect, fragment.dialect);
    }

    #[test]
    fn stored_fragment_misses_on_config_change() {
        let tmp = TempDir::new().unwrap();
        let cache = ContentCache::load(&cache_path(&tmp));
        let mut artifact = SourceArtifact::new("/src/a.schema.json");
        artifact.content_hash = Some("h".into());
        let fragment = Fragment::new(artifact.clone()).with_definition("A", json!({}));
        cache.store_fragment(&fragment, &ExtractConfig::default()).unwrap();

        let forbid = ExtractConfig {
            additional_properties_policy: schemagen_core::AdditionalPropertiesPolicy::Forbid,
        };
        assert!(cache.load_fragment(&artifact, &forbid).is_none());
        assert!(cache.load_fragment(&artifact, &ExtractConfig::default()).is_some());
    }

    #[test]
    fn fragment_store_lives_next_to_cache_file() {
        let tmp = TempDir::new().unwrap();
        let cache = ContentCache::load(&cache_path(&tmp));
        let config = ExtractConfig::default();
        let mut artifact = SourceArtifact::new("/src/a.schema.json");
        artifact.content_hash = Some("h".into());
        cache.store_fragment(&Fragment::new(artifact), &config).unwrap();

        let dir = tmp.path().join(".schemagen").join("cache.fragments");
        assert_eq!(cache.fragment_dir(), dir);
        let key = hex::encode(Sha256::digest(format!("h{}", config.fingerprint())));
        assert!(dir.join(format!("{key}.json")).is_file());
    }

    #[test]
    fn corrupt_stored_fragment_is_a_miss() {
        let tmp = TempDir::new().unwrap();
        let cache = ContentCache::load(&cache_path(&tmp));
        let config = ExtractConfig::default();
        let mut artifact = SourceArtifact::new("/src/a.schema.json");
        artifact.content_hash = Some("h".into());
        cache
            .store_fragment(&Fragment::new(artifact.clone()), &config)
            .unwrap();
        for entry in std::fs::read_dir(cache.fragment_dir()).unwrap() {
            std::fs::write(entry.unwrap().path(), "garbage").unwrap();
        }
        assert!(cache.load_fragment(&artifact, &config).is_none());
    }

    #[tokio::test]
    async fn hash_all_is_sorted_and_tolerates_missing_files() {
        let tmp = TempDir::new().unwrap();
        let b = tmp.path().join("b.json");
        let a = tmp.path().join("a.json");
        std::fs::write(&b, "bbb").unwrap();
        std::fs::write(&a, "aaa").unwrap();
        let missing = tmp.path().join("c.json");

        let artifacts = vec![
            SourceArtifact::new(b.clone()),
            SourceArtifact::new(missing.clone()),
            SourceArtifact::new(a.clone()),
        ];
        let hashed = hash_all(artifacts, true).await;
        let paths: Vec<_> = hashed.iter().map(|x| x.path.clone()).collect();
        assert_eq!(paths, vec![a, b, missing]);
        assert_eq!(hashed[0].content_hash.as_deref(), Some(hash_bytes(b"aaa").as_str()));
        assert!(hashed[2].content_hash.is_none());

        let records = records_for(&hashed);
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn async_round_trip_partitions_by_hash() {
        let tmp = TempDir::new().unwrap();
        let config = ExtractConfig::default();
        let mut cache = ContentCache::load_async(&cache_path(&tmp)).await;

        let mut kept = SourceArtifact::new("/src/a.schema.json");
        kept.content_hash = Some("h-a".into());
        let mut edited = SourceArtifact::new("/src/b.schema.json");
        edited.content_hash = Some("h-b".into());
        let fragments = vec![
            Fragment::new(kept.clone()).with_definition("A", json!({"const": 1.5e-300})),
            Fragment::new(edited.clone()).with_definition("B", json!({})),
        ];
        cache.store_fragments(&fragments, config).await;
        cache
            .persist_async(records_for(&[kept.clone(), edited.clone()]))
            .await
            .unwrap();

        let reloaded = ContentCache::load_async(&cache_path(&tmp)).await;
        assert_eq!(reloaded.records(), cache.records());

        edited.content_hash = Some("h-b2".into());
        let (reused, pending) = reloaded
            .partition_reusable(vec![kept, edited], config)
            .await;
        assert_eq!(reused.len(), 1);
        assert_eq!(reused[0].definitions, fragments[0].definitions);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].path, PathBuf::from("/src/b.schema.json"));
    }

    #[test]
    fn stored_floats_reload_bit_for_bit() {
        let tmp = TempDir::new().unwrap();
        let cache = ContentCache::load(&cache_path(&tmp));
        let config = ExtractConfig::default();
        let node: serde_json::Value =
            serde_json::from_str(r#"{"const":767871797342349524e-95}"#).unwrap();

        let mut artifact = SourceArtifact::new("/src/n.schema.json");
        artifact.content_hash = Some("n".into());
        let fragment = Fragment::new(artifact.clone()).with_definition("N", node);
        cache.store_fragment(&fragment, &config).unwrap();

        let loaded = cache.load_fragment(&artifact, &config).expect("hit");
        assert_eq!(loaded.definitions, fragment.definitions);
    }

    #[test]
    fn hash_changes_with_content() {
        assert_ne!(hash_bytes(b"v1"), hash_bytes(b"v2"));
        assert_eq!(hash_bytes(b"v1"), hash_bytes(b"v1"));
        assert_eq!(hash_bytes(b"").len(), 64);
    }

    #[test]
    fn hash_file_matches_hash_bytes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.schema.json");
        std::fs::write(&path, b"{}").unwrap();
        let digest = tokio_test::block_on(hash_file(&path)).unwrap();
        assert_eq!(digest, hash_bytes(b"{}"));

        let missing = tokio_test::block_on(hash_file(&tmp.path().join("gone.json")));
        assert!(matches!(missing, Err(CacheError::Io { .. })));
    }
}
