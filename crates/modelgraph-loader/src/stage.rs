//! Transform stage trait, dynamic dispatch wrapper, and stage registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use modelgraph_types::{ModelError, Result};

use crate::events::{EventEmitter, LoadEvent};
use crate::graph::ModelGraph;
use crate::identity::{IdGenerator, SuffixVersion, UuidIds, VersionPolicy};
use crate::output::OutputModel;

pub const INITIALIZE_OUTPUT_SHAPE: &str = "initialize-output-shape";
pub const BUILD_HIERARCHY: &str = "build-hierarchy";
pub const EXTRACT_PARAMETERS: &str = "extract-parameters";
pub const EXTRACT_INTERACTIONS: &str = "extract-interactions";
pub const EXTRACT_COURSES_OF_ACTION: &str = "extract-courses-of-action";
pub const EXTRACT_EXPERIMENTS: &str = "extract-experiments";
pub const EXTRACT_CONFIGURATIONS: &str = "extract-configurations";
pub const BUILD_PLACEHOLDER_RECORDS: &str = "build-auxiliary-placeholder-records";

/// The fixed order stages run in.
pub const STAGE_ORDER: [&str; 8] = [
    INITIALIZE_OUTPUT_SHAPE,
    BUILD_HIERARCHY,
    EXTRACT_PARAMETERS,
    EXTRACT_INTERACTIONS,
    EXTRACT_COURSES_OF_ACTION,
    EXTRACT_EXPERIMENTS,
    EXTRACT_CONFIGURATIONS,
    BUILD_PLACEHOLDER_RECORDS,
];

/// Policies shared by every stage of one run.
#[derive(Clone)]
pub struct StageContext {
    pub ids: Arc<dyn IdGenerator>,
    pub versions: Arc<dyn VersionPolicy>,
}

impl StageContext {
    pub fn new(ids: Arc<dyn IdGenerator>, versions: Arc<dyn VersionPolicy>) -> Self {
        Self { ids, versions }
    }
}

impl Default for StageContext {
    fn default() -> Self {
        Self::new(Arc::new(UuidIds), Arc::new(SuffixVersion::default()))
    }
}

// ---------------------------------------------------------------------------
// TransformStage trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait TransformStage: Send + Sync {
    /// The stage name this implementation is registered under.
    fn name(&self) -> &str;

    /// Read the resolved graph and write into the shared output.
    async fn apply(
        &self,
        graph: &ModelGraph,
        output: &mut OutputModel,
        ctx: &StageContext,
    ) -> Result<()>;
}

// ---------------------------------------------------------------------------
// DynStage: object-safe wrapper
// ---------------------------------------------------------------------------

pub struct DynStage(Box<dyn TransformStage>);

impl DynStage {
    pub fn new(stage: impl TransformStage + 'static) -> Self {
        Self(Box::new(stage))
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub async fn apply(
        &self,
        graph: &ModelGraph,
        output: &mut OutputModel,
        ctx: &StageContext,
    ) -> Result<()> {
        self.0.apply(graph, output, ctx).await
    }
}

// ---------------------------------------------------------------------------
// StageRegistry
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct StageRegistry {
    stages: HashMap<String, DynStage>,
}

impl StageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stage under its name, replacing any previous one.
    pub fn register(&mut self, stage: impl TransformStage + 'static) {
        let name = stage.name().to_string();
        self.stages.insert(name, DynStage::new(stage));
    }

    pub fn get(&self, name: &str) -> Option<&DynStage> {
        self.stages.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.stages.contains_key(name)
    }

    /// Run every stage of [`STAGE_ORDER`] over `graph` into a fresh output.
    ///
    /// A stage absent from the registry fails the run before it starts that
    /// stage; a stage error is reported as `StageFailed` naming the stage
    /// that ran.
    pub async fn run(
        &self,
        graph: &ModelGraph,
        ctx: &StageContext,
        events: &EventEmitter,
    ) -> Result<OutputModel> {
        let mut output = OutputModel::new();

        for name in STAGE_ORDER {
            let stage = self.get(name).ok_or_else(|| ModelError::StageMissing {
                stage: name.to_string(),
            })?;

            events.emit(LoadEvent::StageStarted {
                stage: name.to_string(),
            });
            tracing::debug!(stage = name, "Running transform stage");
            let started = Instant::now();

            stage
                .apply(graph, &mut output, ctx)
                .await
                .map_err(|e| ModelError::StageFailed {
                    stage: name.to_string(),
                    message: e.to_string(),
                })?;

            let duration_ms = started.elapsed().as_millis() as u64;
            tracing::debug!(stage = name, duration_ms, "Transform stage completed");
            events.emit(LoadEvent::StageCompleted {
                stage: name.to_string(),
                duration_ms,
            });
        }

        Ok(output)
    }
}
