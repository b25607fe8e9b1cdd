//! Stages that lay out the output shape and fill gaps with placeholders.

use async_trait::async_trait;
use serde_json::Value;

use modelgraph_types::Result;

use crate::graph::ModelGraph;
use crate::output::OutputModel;
use crate::stage::{StageContext, TransformStage, BUILD_PLACEHOLDER_RECORDS, INITIALIZE_OUTPUT_SHAPE};

/// Resets the output to the empty category shape.
pub struct InitOutputStage;

#[async_trait]
impl TransformStage for InitOutputStage {
    fn name(&self) -> &str {
        INITIALIZE_OUTPUT_SHAPE
    }

    async fn apply(
        &self,
        _graph: &ModelGraph,
        output: &mut OutputModel,
        _ctx: &StageContext,
    ) -> Result<()> {
        output.reset_shape();
        Ok(())
    }
}

/// Fabricates one record for each listed category that is still empty.
///
/// The project placeholder is named after the root record.
pub struct PlaceholderStage {
    categories: Vec<String>,
}

impl PlaceholderStage {
    pub fn new(categories: Vec<String>) -> Self {
        Self { categories }
    }
}

#[async_trait]
impl TransformStage for PlaceholderStage {
    fn name(&self) -> &str {
        BUILD_PLACEHOLDER_RECORDS
    }

    async fn apply(
        &self,
        graph: &ModelGraph,
        output: &mut OutputModel,
        ctx: &StageContext,
    ) -> Result<()> {
        for category in &self.categories {
            if !output.category(category).is_empty() {
                continue;
            }
            let id = output.id_for(&format!("placeholder:{category}"), ctx.ids.as_ref());
            let name = if category == "projects" {
                graph.root().name.clone()
            } else {
                format!("placeholder {category}")
            };
            tracing::debug!(category = %category, id = %id, "Fabricating placeholder record");
            let object = serde_json::json!({
                "id": id,
                "name": name,
                "placeholder": true,
            });
            output.add_object(category, id, object);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::SequentialIds;
    use crate::output::CATEGORIES;
    use crate::record::Record;
    use std::sync::Arc;

    fn ctx() -> StageContext {
        StageContext {
            ids: Arc::new(SequentialIds::new("id-")),
            ..StageContext::default()
        }
    }

    fn graph() -> ModelGraph {
        ModelGraph::new(Record::new("Demo Federation", "", "Root", None))
    }

    #[tokio::test]
    async fn init_lays_out_shape() {
        let mut out = OutputModel::new();
        InitOutputStage.apply(&graph(), &mut out, &ctx()).await.unwrap();
        assert_eq!(out.categories.len(), CATEGORIES.len());
    }

    #[tokio::test]
    async fn placeholders_fill_only_empty_categories() {
        let mut out = OutputModel::new();
        out.reset_shape();
        out.add_object("Users", "u1".into(), Value::Null);

        let stage = PlaceholderStage::new(vec!["projects".into(), "Users".into()]);
        stage.apply(&graph(), &mut out, &ctx()).await.unwrap();

        assert_eq!(out.category("Users"), &["u1".to_string()]);
        let projects = out.objects_in("projects");
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0]["name"], "Demo Federation");
        assert_eq!(projects[0]["placeholder"], true);
    }

    #[tokio::test]
    async fn placeholder_creates_unknown_category() {
        let mut out = OutputModel::new();
        let stage = PlaceholderStage::new(vec!["Docker Images".into()]);
        stage.apply(&graph(), &mut out, &ctx()).await.unwrap();
        assert_eq!(out.objects_in("Docker Images")[0]["name"], "placeholder Docker Images");
    }
}
