//! Extraction pool — runs the [`TypeExtractor`] over a batch of artifacts.
//!
//! Concurrent mode dispatches every artifact as its own task, bounded by a
//! semaphore sized to available parallelism, and collects results in
//! completion order. Sequential mode walks the batch in path order. Either
//! way the returned vector is sorted by path, so callers never observe
//! completion order.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use schemagen_core::{Fragment, SourceArtifact};

use crate::error::ExtractionError;
use crate::extractor::{ExtractConfig, TypeExtractor};

/// Result of extracting one artifact.
#[derive(Debug)]
pub struct ArtifactResult {
    pub path: PathBuf,
    pub result: Result<Fragment, ExtractionError>,
}

/// Runs extractions one artifact per task.
#[derive(Clone)]
pub struct ExtractionPool {
    extractor: Arc<dyn TypeExtractor>,
    config: ExtractConfig,
    workers: usize,
}

impl ExtractionPool {
    /// Pool sized to the machine's available parallelism.
    pub fn new(extractor: Arc<dyn TypeExtractor>, config: ExtractConfig) -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            extractor,
            config,
            workers,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Extract every artifact. One failure never stops the others.
    pub async fn process(&self, artifacts: Vec<SourceArtifact>, concurrent: bool) -> Vec<ArtifactResult> {
        let mut results = if concurrent {
            self.process_concurrent(artifacts).await
        } else {
            self.process_sequential(artifacts).await
        };
        results.sort_by(|a, b| a.path.cmp(&b.path));
        results
    }

    async fn process_sequential(&self, mut artifacts: Vec<SourceArtifact>) -> Vec<ArtifactResult> {
        artifacts.sort_by(|a, b| a.path.cmp(&b.path));
        let mut results = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            results.push(extract_one(self.extractor.clone(), self.config, artifact).await);
        }
        results
    }

    async fn process_concurrent(&self, artifacts: Vec<SourceArtifact>) -> Vec<ArtifactResult> {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let submitted: Vec<PathBuf> = artifacts.iter().map(|a| a.path.clone()).collect();

        let mut set = JoinSet::new();
        for artifact in artifacts {
            let extractor = self.extractor.clone();
            let config = self.config;
            let semaphore = semaphore.clone();
            set.spawn(async move {
                // The semaphore is never closed.
                let _permit = semaphore.acquire_owned().await.ok();
                extract_one(extractor, config, artifact).await
            });
        }

        let mut results = Vec::with_capacity(submitted.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(err) => tracing::error!("extraction task failed: {err}"),
            }
        }

        // A task that died without reporting still needs a result.
        let reported: BTreeSet<PathBuf> = results.iter().map(|r| r.path.clone()).collect();
        for path in submitted {
            if !reported.contains(&path) {
                results.push(ArtifactResult {
                    result: Err(ExtractionError::Aborted {
                        path: path.clone(),
                        message: "task did not report a result".to_string(),
                    }),
                    path,
                });
            }
        }
        results
    }
}

async fn extract_one(
    extractor: Arc<dyn TypeExtractor>,
    config: ExtractConfig,
    artifact: SourceArtifact,
) -> ArtifactResult {
    let path = artifact.path.clone();
    let joined = tokio::task::spawn_blocking(move || extractor.extract(&artifact, &config)).await;
    let result = match joined {
        Ok(result) => result,
        Err(err) => Err(ExtractionError::Aborted {
            path: path.clone(),
            message: err.to_string(),
        }),
    };
    match &result {
        Ok(fragment) => tracing::debug!(
            "extracted {} ({} definition(s))",
            path.display(),
            fragment.definitions.len()
        ),
        Err(err) => tracing::warn!("[{}] {err}", ExtractionError::CODE),
    }
    ArtifactResult { path, result }
}
