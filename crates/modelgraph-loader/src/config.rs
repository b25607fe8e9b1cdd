//! Loader configuration, read from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use modelgraph_types::{ModelError, Result};

use crate::resolver::ResolvePolicy;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub resolve: ResolvePolicy,
    pub transform: TransformConfig,
}

/// Record types picked up by each default transform stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    pub federate_types: Vec<String>,
    pub parameter_types: Vec<String>,
    pub interaction_types: Vec<String>,
    pub coa_types: Vec<String>,
    pub experiment_types: Vec<String>,
    pub configuration_types: Vec<String>,
    /// Categories that get a fabricated record when left empty.
    pub placeholder_categories: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            federate_types: strings(&["Federate"]),
            parameter_types: strings(&["Parameter"]),
            interaction_types: strings(&["Interaction"]),
            coa_types: strings(&["COA"]),
            experiment_types: strings(&["Experiment"]),
            configuration_types: strings(&["Configuration"]),
            placeholder_categories: strings(&[
                "projects",
                "Users",
                "organizations",
                "repositories",
                "Docker Images",
            ]),
        }
    }
}

impl LoaderConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.check()?;
        Ok(config)
    }

    /// Read a configuration from a JSON file at `path`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    fn check(&self) -> Result<()> {
        if let Some(p) = self
            .resolve
            .required_pointers
            .iter()
            .find(|p| self.resolve.exempt_pointers.contains(p))
        {
            return Err(ModelError::Config(format!(
                "pointer '{p}' cannot be both required and exempt"
            )));
        }
        Ok(())
    }
}
