//! Subtree loader: the load lifecycle.
//!
//! snapshot root → retrieve descendants → snapshot each → index → resolve →
//! run transform stages. Retrieving descendants is the only await point, and
//! every descendant is in hand before resolution starts. Each call builds
//! its own graph; nothing is shared or cached between loads.

use std::time::Instant;

use modelgraph_store::ModelStore;
use modelgraph_types::Result;

use crate::config::LoaderConfig;
use crate::events::{EventEmitter, LoadEvent};
use crate::graph::ModelGraph;
use crate::output::OutputModel;
use crate::resolver::resolve;
use crate::snapshot::extract;
use crate::stage::{StageContext, StageRegistry};
use crate::stages::default_registry;

/// Result of a full load: the resolved graph and the transformed output.
///
/// Callers that only need the output can drop `graph`.
#[derive(Debug)]
pub struct LoadedModel {
    pub graph: ModelGraph,
    pub output: OutputModel,
}

pub struct ModelLoader {
    config: LoaderConfig,
    registry: StageRegistry,
    ctx: StageContext,
    events: EventEmitter,
}

impl ModelLoader {
    pub fn new(config: LoaderConfig, registry: StageRegistry, ctx: StageContext) -> Self {
        Self {
            config,
            registry,
            ctx,
            events: EventEmitter::default(),
        }
    }

    /// Loader with the built-in stages configured from `config`.
    pub fn with_config(config: LoaderConfig) -> Self {
        let registry = default_registry(&config.transform);
        Self::new(config, registry, StageContext::default())
    }

    pub fn with_defaults() -> Self {
        Self::with_config(LoaderConfig::default())
    }

    pub fn with_events(mut self, events: EventEmitter) -> Self {
        self.events = events;
        self
    }

    pub fn with_context(mut self, ctx: StageContext) -> Self {
        self.ctx = ctx;
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    pub fn registry_mut(&mut self) -> &mut StageRegistry {
        &mut self.registry
    }

    /// Load and resolve the subtree under `root` without running the stages.
    pub async fn load_graph<S>(&self, store: &S, root: &S::Node) -> Result<ModelGraph>
    where
        S: ModelStore + ?Sized,
    {
        let started = Instant::now();
        let graph = self.observe(self.load_resolved(store, root).await)?;
        self.completed(&graph, started);
        Ok(graph)
    }

    /// Load, resolve and transform the subtree under `root`.
    pub async fn load<S>(&self, store: &S, root: &S::Node) -> Result<LoadedModel>
    where
        S: ModelStore + ?Sized,
    {
        let started = Instant::now();
        let graph = self.observe(self.load_resolved(store, root).await)?;
        let output = self.observe(self.registry.run(&graph, &self.ctx, &self.events).await)?;
        self.completed(&graph, started);
        Ok(LoadedModel { graph, output })
    }

    async fn load_resolved<S>(&self, store: &S, root: &S::Node) -> Result<ModelGraph>
    where
        S: ModelStore + ?Sized,
    {
        let root_record = extract(store, root)?;
        let root_path = root_record.path.clone();
        tracing::info!(root = %root_path, "Loading model subtree");
        self.events.emit(LoadEvent::LoadStarted {
            root_path: root_path.clone(),
        });

        let nodes = store.load_sub_tree(root).await?;
        tracing::debug!(root = %root_path, descendants = nodes.len(), "Retrieved subtree");
        self.events.emit(LoadEvent::SubtreeRetrieved {
            root_path: root_path.clone(),
            descendant_count: nodes.len(),
        });

        let mut graph = ModelGraph::new(root_record);
        for node in &nodes {
            let record = extract(store, node)?;
            let path = record.path.clone();
            if graph.insert(record).is_none() {
                tracing::warn!(path = %path, "Duplicate path in subtree, keeping first record");
            }
        }

        resolve(&mut graph, &self.config.resolve)?;
        self.events.emit(LoadEvent::RecordsResolved {
            record_count: graph.len(),
        });
        Ok(graph)
    }

    fn observe<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(ref e) = result {
            tracing::warn!(error = %e, "Model load failed");
            self.events.emit(LoadEvent::LoadFailed {
                root_path: None,
                error: e.to_string(),
            });
        }
        result
    }

    fn completed(&self, graph: &ModelGraph, started: Instant) {
        let duration_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            root = %graph.root().path,
            records = graph.len(),
            duration_ms,
            "Model load completed"
        );
        self.events.emit(LoadEvent::LoadCompleted {
            root_path: graph.root().path.clone(),
            record_count: graph.len(),
            duration_ms,
        });
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::with_defaults()
    }
}
