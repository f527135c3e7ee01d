//! Run orchestration: discover → extract → validate → merge → write.
//!
//! [`Orchestrator::run`] is the single entrypoint used by the CLI. Each run
//! starts in [`RunState::Idle`] and ends in `Done` or `Failed`; cache and
//! output files carry over between runs.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use schemagen_core::{ConsolidatedSchema, Fragment, GeneratorConfig, SourceArtifact};
use schemagen_emitter::CodeEmitter;
use schemagen_locator::discover_excluding;

use crate::cache::{self, ContentCache};
use crate::consolidate;
use crate::error::{ConsolidateError, CacheError, ExtractionError};
use crate::extractor::{ExtractConfig, JsonFragmentExtractor, TypeExtractor};
use crate::worker::ExtractionPool;
use crate::writer::{atomic_write, WriteResult};

/// Per-run state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Discovering,
    Extracting,
    Validating,
    Merging,
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Idle => "idle",
            RunState::Discovering => "discovering",
            RunState::Extracting => "extracting",
            RunState::Validating => "validating",
            RunState::Merging => "merging",
            RunState::Done => "done",
            RunState::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Outcome of the pure consolidation stages (no output written).
#[derive(Debug)]
pub struct Consolidation {
    pub schema: ConsolidatedSchema,
    /// Every discovered artifact, sorted.
    pub artifacts: Vec<PathBuf>,
    /// Artifacts run through the extractor this time.
    pub extracted: usize,
    /// Artifacts whose stored fragment was reused.
    pub reused_from_cache: usize,
    /// Artifacts dropped because extraction failed, sorted by path.
    pub failures: Vec<ExtractionError>,
}

/// Everything a completed run reports back.
#[derive(Debug)]
pub struct RunReport {
    pub consolidation: Consolidation,
    pub writes: Vec<WriteResult>,
    pub state: RunState,
}

impl RunReport {
    pub fn schema(&self) -> &ConsolidatedSchema {
        &self.consolidation.schema
    }
}

/// Sequences one consolidation run.
pub struct Orchestrator {
    config: GeneratorConfig,
    extractor: Arc<dyn TypeExtractor>,
    emitter: Option<Box<dyn CodeEmitter>>,
    dry_run: bool,
    state: RunState,
}

impl Orchestrator {
    /// Orchestrator using the JSON fragment extractor and no code emitter.
    ///
    /// `config` paths should already be resolved (see
    /// [`GeneratorConfig::resolved_against`]).
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            extractor: Arc::new(JsonFragmentExtractor),
            emitter: None,
            dry_run: false,
            state: RunState::Idle,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn TypeExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Emitter output lands in `config.emit_dir`; without one the emitter
    /// is not invoked.
    pub fn with_emitter(mut self, emitter: Box<dyn CodeEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    /// Report writes without touching outputs or the cache.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Run every stage and write the canonical schema plus emitter output.
    pub async fn run(&mut self) -> Result<RunReport, ConsolidateError> {
        let consolidation = self.consolidate().await?;
        match self.write_outputs(&consolidation.schema) {
            Ok(writes) => {
                self.transition(RunState::Done);
                Ok(RunReport {
                    consolidation,
                    writes,
                    state: self.state,
                })
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Discovery through merge. Leaves the state at `Merging`; only `run`
    /// reaches a terminal state.
    async fn consolidate(&mut self) -> Result<Consolidation, ConsolidateError> {
        self.state = RunState::Idle;

        self.transition(RunState::Discovering);
        let artifacts = match discover_excluding(
            &self.config.pattern,
            &self.config.root_path,
            &self.excluded_paths(),
        ) {
            Ok(artifacts) => artifacts,
            Err(err) => return Err(self.fail(err.into())),
        };
        let artifact_paths: Vec<PathBuf> = artifacts.iter().map(|a| a.path.clone()).collect();

        self.transition(RunState::Extracting);
        let (fragments, failures, extracted, reused_from_cache) = self.extract(artifacts).await;
        for failure in &failures {
            tracing::warn!("dropping {}: {failure}", failure.path().display());
        }
        if fragments.is_empty() {
            return Err(self.fail(ConsolidateError::AllExtractionsFailed { failures }));
        }

        self.transition(RunState::Validating);
        if let Err(err) = consolidate::validate_compatibility(&fragments) {
            return Err(self.fail(err.into()));
        }

        self.transition(RunState::Merging);
        let schema = consolidate::merge(&fragments);
        tracing::info!(
            "consolidated {} symbol(s) from {} artifact(s)",
            schema.definitions.len(),
            fragments.len()
        );

        Ok(Consolidation {
            schema,
            artifacts: artifact_paths,
            extracted,
            reused_from_cache,
            failures,
        })
    }

    /// Hash, reuse stored fragments, extract the rest, persist the cache.
    ///
    /// Returns (fragments, failures, extracted count, reused count), with
    /// fragments and failures sorted by path.
    async fn extract(
        &self,
        artifacts: Vec<SourceArtifact>,
    ) -> (Vec<Fragment>, Vec<ExtractionError>, usize, usize) {
        let extract_config = ExtractConfig {
            additional_properties_policy: self.config.additional_properties_policy,
        };
        let parallel = self.config.parallel_enabled;

        let mut content_cache = if self.config.cache_enabled {
            Some(ContentCache::load_async(&self.config.cache_path).await)
        } else {
            None
        };

        let artifacts = if content_cache.is_some() {
            cache::hash_all(artifacts, parallel).await
        } else {
            artifacts
        };

        let (mut fragments, pending) = match &content_cache {
            Some(c) => c.partition_reusable(artifacts.clone(), extract_config).await,
            None => (Vec::new(), artifacts.clone()),
        };
        let reused_from_cache = fragments.len();
        let extracted = pending.len();

        let pool = ExtractionPool::new(self.extractor.clone(), extract_config);
        let results = pool.process(pending, parallel).await;

        let mut fresh = Vec::new();
        let mut failures = Vec::new();
        for item in results {
            match item.result {
                Ok(fragment) => fresh.push(fragment),
                Err(err) => failures.push(err),
            }
        }
        if let (Some(c), false) = (&content_cache, self.dry_run) {
            c.store_fragments(&fresh, extract_config).await;
        }
        fragments.extend(fresh);
        fragments.sort_by(|a, b| a.path().cmp(b.path()));
        failures.sort_by(|a, b| a.path().cmp(b.path()));

        if let (Some(c), false) = (content_cache.as_mut(), self.dry_run) {
            if let Err(err) = c.persist_async(cache::records_for(&artifacts)).await {
                tracing::warn!("[{}] {err}", CacheError::CODE);
            }
        }

        (fragments, failures, extracted, reused_from_cache)
    }

    fn write_outputs(&self, schema: &ConsolidatedSchema) -> Result<Vec<WriteResult>, ConsolidateError> {
        let mut writes = Vec::new();
        let canonical = schema.to_canonical_json()?;
        writes.push(atomic_write(&self.config.output_path, &canonical, self.dry_run)?);

        if let (Some(emitter), Some(dir)) = (&self.emitter, &self.config.emit_dir) {
            for file in emitter.emit(schema)? {
                let path = dir.join(&file.relative_path);
                writes.push(atomic_write(&path, &file.content, self.dry_run)?);
            }
        }
        Ok(writes)
    }

    /// Files and directories the tool itself produces.
    fn excluded_paths(&self) -> Vec<PathBuf> {
        let mut excluded = vec![
            self.config.output_path.clone(),
            self.config.cache_path.clone(),
            cache::fragment_dir_for(&self.config.cache_path),
        ];
        if let Some(dir) = &self.config.emit_dir {
            excluded.push(dir.clone());
        }
        excluded
    }

    fn transition(&mut self, next: RunState) {
        tracing::info!("run state: {} -> {}", self.state, next);
        self.state = next;
    }

    fn fail(&mut self, err: ConsolidateError) -> ConsolidateError {
        tracing::error!("[{}] {err}", err.code());
        self.transition(RunState::Failed);
        err
    }
}

/// Delete the cache file and fragment store named by `config`.
pub fn clear_cache(config: &GeneratorConfig) -> Result<(), CacheError> {
    ContentCache::load(&config.cache_path).clear()
}
