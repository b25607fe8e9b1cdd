//! Loads a subtree of a hierarchical model store into a resolved record graph.
//!
//! This crate implements the load core: node snapshot extraction, subtree
//! retrieval, reference resolution into an arena of records, and the fixed
//! sequence of transform stages that turn the resolved graph into an
//! application-facing output model.

pub mod config;
pub mod events;
pub mod graph;
pub mod identity;
pub mod loader;
pub mod output;
pub mod record;
pub mod resolver;
pub mod snapshot;
pub mod stage;
pub mod stages;

pub use config::{LoaderConfig, TransformConfig};
pub use events::{EventEmitter, LoadEvent};
pub use graph::ModelGraph;
pub use identity::{IdGenerator, SequentialIds, SuffixVersion, UuidIds, VersionPolicy};
pub use loader::{LoadedModel, ModelLoader};
pub use output::{OutputModel, CATEGORIES, OBJECTS_KEY};
pub use record::{list_key, Field, Record, RecordId};
pub use resolver::{resolve, ResolvePolicy};
pub use snapshot::extract;
pub use stage::{DynStage, StageContext, StageRegistry, TransformStage, STAGE_ORDER};
pub use stages::{default_registry, CategoryStage, HierarchyStage, InitOutputStage, PlaceholderStage};
