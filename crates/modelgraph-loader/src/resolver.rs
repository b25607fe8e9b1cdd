//! Reference resolution: turn child, pointer and set paths into arena links.
//!
//! Every lookup goes through the whole-graph path index, so forward, self
//! and ancestor references resolve regardless of the order records are
//! visited in. Resolving one record only reads the raw fields of others.
//! The parent path is never turned into a link.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use modelgraph_types::{ModelError, Result};

use crate::graph::ModelGraph;
use crate::record::RecordId;

/// Caller policy for references that may legitimately stay unresolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolvePolicy {
    /// Pointers allowed to name a path outside the loaded subtree.
    pub exempt_pointers: Vec<String>,
    /// Pointers that must be set; a null path is an error.
    pub required_pointers: Vec<String>,
    /// Treat a child path missing from the graph as an error instead of skipping it.
    pub strict_children: bool,
}

impl Default for ResolvePolicy {
    fn default() -> Self {
        Self {
            exempt_pointers: vec!["base".to_string()],
            required_pointers: Vec::new(),
            strict_children: false,
        }
    }
}

impl ResolvePolicy {
    fn is_exempt(&self, pointer: &str) -> bool {
        self.exempt_pointers.iter().any(|p| p == pointer)
    }

    fn is_required(&self, pointer: &str) -> bool {
        self.required_pointers.iter().any(|p| p == pointer)
    }
}

#[derive(Default)]
struct Links {
    child_lists: BTreeMap<String, Vec<RecordId>>,
    pointer_links: BTreeMap<String, RecordId>,
    set_links: BTreeMap<String, Vec<RecordId>>,
}

/// Resolve every record in `graph` in place.
///
/// Previously derived links are replaced, never merged, so resolving twice
/// gives the same result. Fails on the first integrity fault; the graph
/// must then be discarded.
pub fn resolve(graph: &mut ModelGraph, policy: &ResolvePolicy) -> Result<()> {
    for i in 0..graph.len() {
        let links = record_links(graph, RecordId(i), policy)?;
        let record = &mut graph.records_mut()[i];
        record.clear_links();
        record.child_lists = links.child_lists;
        record.pointer_links = links.pointer_links;
        record.set_links = links.set_links;
    }
    Ok(())
}

fn record_links(graph: &ModelGraph, id: RecordId, policy: &ResolvePolicy) -> Result<Links> {
    let record = &graph[id];
    let mut links = Links::default();

    for child_path in &record.child_paths {
        match graph.lookup(child_path) {
            Some(child) => links
                .child_lists
                .entry(graph[child].node_type.clone())
                .or_default()
                .push(child),
            None if policy.strict_children => {
                return Err(ModelError::MissingChild {
                    record: record.name.clone(),
                    child: child_path.clone(),
                });
            }
            None => {
                tracing::debug!(record = %record.path, child = %child_path, "Skipping unloaded child");
            }
        }
    }

    for (pointer, target) in &record.pointers {
        let Some(path) = target else {
            if policy.is_required(pointer) {
                return Err(ModelError::UnsetRequiredPointer {
                    record: record.name.clone(),
                    pointer: pointer.clone(),
                });
            }
            continue;
        };
        match graph.lookup(path) {
            Some(dst) => {
                links.pointer_links.insert(pointer.clone(), dst);
            }
            None if policy.is_exempt(pointer) => {
                tracing::debug!(record = %record.path, pointer = %pointer, target = %path, "Leaving exempt pointer unresolved");
            }
            None => {
                return Err(ModelError::DanglingPointer {
                    record: record.name.clone(),
                    pointer: pointer.clone(),
                    target: path.clone(),
                });
            }
        }
    }

    for (set, members) in &record.sets {
        let mut resolved = Vec::with_capacity(members.len());
        for member in members {
            let path = member.as_deref().ok_or_else(|| ModelError::NullSetMember {
                record: record.name.clone(),
                set: set.clone(),
            })?;
            let dst = graph
                .lookup(path)
                .ok_or_else(|| ModelError::DanglingSetMember {
                    record: record.name.clone(),
                    set: set.clone(),
                    target: path.to_string(),
                })?;
            resolved.push(dst);
        }
        links.set_links.insert(set.clone(), resolved);
    }

    Ok(links)
}
