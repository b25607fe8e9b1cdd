//! Built-in transform stages.

pub mod category;
pub mod hierarchy;
pub mod shape;

use serde_json::{Map, Value};

use crate::config::TransformConfig;
use crate::record::Record;
use crate::stage::{
    StageRegistry, EXTRACT_CONFIGURATIONS, EXTRACT_COURSES_OF_ACTION, EXTRACT_EXPERIMENTS,
    EXTRACT_INTERACTIONS, EXTRACT_PARAMETERS,
};

pub use category::CategoryStage;
pub use hierarchy::HierarchyStage;
pub use shape::{InitOutputStage, PlaceholderStage};

/// Common object fields for a record exported under `id`.
pub(crate) fn record_object(record: &Record, id: &str) -> Map<String, Value> {
    let attributes: Map<String, Value> = record
        .attributes
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect();

    let mut obj = Map::new();
    obj.insert("id".into(), Value::String(id.to_string()));
    obj.insert("name".into(), Value::String(record.name.clone()));
    obj.insert("path".into(), Value::String(record.path.clone()));
    obj.insert("type".into(), Value::String(record.node_type.clone()));
    obj.insert("attributes".into(), Value::Object(attributes));
    obj
}

pub(crate) fn is_one_of(types: &[String], record: &Record) -> bool {
    types.iter().any(|t| *t == record.node_type)
}

/// Registry holding every built-in stage, configured from `config`.
pub fn default_registry(config: &TransformConfig) -> StageRegistry {
    let mut reg = StageRegistry::new();
    reg.register(InitOutputStage);
    reg.register(HierarchyStage::new(config.federate_types.clone()));
    reg.register(
        CategoryStage::new(EXTRACT_PARAMETERS, "Parameters", config.parameter_types.clone())
            .with_owner(),
    );
    reg.register(
        CategoryStage::new(
            EXTRACT_INTERACTIONS,
            "Interactions",
            config.interaction_types.clone(),
        )
        .with_children("parameters", config.parameter_types.clone()),
    );
    reg.register(
        CategoryStage::new(EXTRACT_COURSES_OF_ACTION, "coas", config.coa_types.clone())
            .with_references(),
    );
    reg.register(
        CategoryStage::new(
            EXTRACT_EXPERIMENTS,
            "Experiments",
            config.experiment_types.clone(),
        )
        .with_references()
        .versioned(),
    );
    reg.register(
        CategoryStage::new(
            EXTRACT_CONFIGURATIONS,
            "configurations",
            config.configuration_types.clone(),
        )
        .with_references(),
    );
    reg.register(PlaceholderStage::new(config.placeholder_categories.clone()));
    reg
}
