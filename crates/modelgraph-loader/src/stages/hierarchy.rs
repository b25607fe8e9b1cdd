use async_trait::async_trait;
use serde_json::Value;

use modelgraph_types::Result;

use crate::graph::ModelGraph;
use crate::output::OutputModel;
use crate::stage::{StageContext, TransformStage, BUILD_HIERARCHY};
use crate::stages::{is_one_of, record_object};

/// Builds the federate hierarchy.
///
/// Each federate-typed record links to its nearest federate ancestor and to
/// its direct federate children, both by output id. Ancestors are found by
/// walking parent paths, since parents are never materialized as links.
pub struct HierarchyStage {
    types: Vec<String>,
}

impl HierarchyStage {
    pub fn new(types: Vec<String>) -> Self {
        Self { types }
    }
}

#[async_trait]
impl TransformStage for HierarchyStage {
    fn name(&self) -> &str {
        BUILD_HIERARCHY
    }

    async fn apply(
        &self,
        graph: &ModelGraph,
        output: &mut OutputModel,
        ctx: &StageContext,
    ) -> Result<()> {
        let ids = ctx.ids.as_ref();

        for (rid, record) in graph.iter().filter(|(_, r)| is_one_of(&self.types, r)) {
            let id = output.id_for(&record.path, ids);

            let parent = graph
                .ancestors(rid)
                .into_iter()
                .map(|a| &graph[a])
                .find(|a| is_one_of(&self.types, a))
                .map(|a| Value::String(output.id_for(&a.path, ids)))
                .unwrap_or(Value::Null);

            let children: Vec<Value> = self
                .types
                .iter()
                .flat_map(|t| record.children_of_type(t))
                .map(|&c| Value::String(output.id_for(&graph[c].path, ids)))
                .collect();

            let mut obj = record_object(record, &id);
            obj.insert("parent".into(), parent);
            obj.insert("children".into(), Value::Array(children));
            output.add_object("Federates", id, Value::Object(obj));
        }

        tracing::debug!(federates = output.category("Federates").len(), "Built federate hierarchy");
        Ok(())
    }
}
