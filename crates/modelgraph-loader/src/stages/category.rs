use async_trait::async_trait;
use serde_json::{Map, Value};

use modelgraph_types::Result;

use crate::graph::ModelGraph;
use crate::identity::IdGenerator;
use crate::output::OutputModel;
use crate::record::Record;
use crate::stage::{StageContext, TransformStage};
use crate::stages::{is_one_of, record_object};

/// Collects records of the given types into one output category.
///
/// Optional extras per object: the `owner` (parent record id), a list of
/// direct children of some types, the record's pointer and set targets as
/// `references`, and a derived `version`.
pub struct CategoryStage {
    name: String,
    category: String,
    types: Vec<String>,
    owner: bool,
    children: Option<(String, Vec<String>)>,
    references: bool,
    versioned: bool,
}

impl CategoryStage {
    pub fn new(name: &str, category: &str, types: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            types,
            owner: false,
            children: None,
            references: false,
            versioned: false,
        }
    }

    pub fn with_owner(mut self) -> Self {
        self.owner = true;
        self
    }

    /// List direct children of `types` under `key`.
    pub fn with_children(mut self, key: &str, types: Vec<String>) -> Self {
        self.children = Some((key.to_string(), types));
        self
    }

    pub fn with_references(mut self) -> Self {
        self.references = true;
        self
    }

    pub fn versioned(mut self) -> Self {
        self.versioned = true;
        self
    }
}

/// Pointer targets as ids, `null` when unset or outside the subtree; sets as id lists.
///
/// Targets get their record id even if no stage exports them, so a later
/// stage exporting the target lands under the same id.
fn references(
    graph: &ModelGraph,
    record: &Record,
    output: &mut OutputModel,
    ids: &dyn IdGenerator,
) -> Value {
    let mut refs = Map::new();
    for name in record.pointers.keys() {
        let target = record
            .pointer(name)
            .map(|t| Value::String(output.id_for(&graph[t].path, ids)))
            .unwrap_or(Value::Null);
        refs.insert(name.clone(), target);
    }
    for (name, members) in record.set_links() {
        let members: Vec<Value> = members
            .iter()
            .map(|&m| Value::String(output.id_for(&graph[m].path, ids)))
            .collect();
        refs.insert(name.to_string(), Value::Array(members));
    }
    Value::Object(refs)
}

#[async_trait]
impl TransformStage for CategoryStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn apply(
        &self,
        graph: &ModelGraph,
        output: &mut OutputModel,
        ctx: &StageContext,
    ) -> Result<()> {
        let ids = ctx.ids.as_ref();
        let mut count = 0usize;

        for (rid, record) in graph.iter().filter(|(_, r)| is_one_of(&self.types, r)) {
            let id = output.id_for(&record.path, ids);
            let mut obj = record_object(record, &id);

            if self.owner {
                let owner = graph
                    .parent(rid)
                    .map(|p| Value::String(output.id_for(&graph[p].path, ids)))
                    .unwrap_or(Value::Null);
                obj.insert("owner".into(), owner);
            }

            if let Some((ref key, ref child_types)) = self.children {
                let children: Vec<Value> = child_types
                    .iter()
                    .flat_map(|t| record.children_of_type(t))
                    .map(|&c| Value::String(output.id_for(&graph[c].path, ids)))
                    .collect();
                obj.insert(key.clone(), Value::Array(children));
            }

            if self.references {
                obj.insert("references".into(), references(graph, record, output, ids));
            }

            if self.versioned {
                let version = ctx.versions.next_version(record.attribute("version"));
                obj.insert("version".into(), Value::String(version));
            }

            output.add_object(&self.category, id, Value::Object(obj));
            count += 1;
        }

        tracing::debug!(stage = %self.name, category = %self.category, count, "Extracted records");
        Ok(())
    }
}
