//! In-memory store backed by a flat JSON document of nodes.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use modelgraph_types::{AttributeValue, ModelError, Result};

use crate::ModelStore;

/// Serialized form of a store: nodes listed in document order.
///
/// Structural children are derived from `parent`, keeping document order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreDocument {
    pub nodes: Vec<StoreNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreNode {
    pub path: String,
    #[serde(default)]
    pub parent: Option<String>,
    /// Path of the node's base (meta) type.
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
    #[serde(default)]
    pub pointers: BTreeMap<String, Option<String>>,
    #[serde(default)]
    pub sets: BTreeMap<String, Vec<Option<String>>>,
}

impl StoreNode {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            parent: None,
            base: None,
            attributes: BTreeMap::new(),
            pointers: BTreeMap::new(),
            sets: BTreeMap::new(),
        }
    }

    pub fn named(self, name: &str) -> Self {
        self.with_attr("name", name)
    }

    pub fn child_of(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn with_pointer(mut self, name: &str, target: Option<&str>) -> Self {
        self.pointers
            .insert(name.to_string(), target.map(String::from));
        self
    }

    pub fn with_set(mut self, name: &str, members: &[Option<&str>]) -> Self {
        self.sets.insert(
            name.to_string(),
            members.iter().map(|m| m.map(String::from)).collect(),
        );
        self
    }
}

/// Handle to a node in a [`MemoryStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryNode(usize);

/// A complete store held in memory.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    nodes: Vec<StoreNode>,
    by_path: HashMap<String, usize>,
    children: HashMap<usize, Vec<usize>>,
}

impl MemoryStore {
    /// Build a store, checking that paths are unique, that every parent and
    /// base path names a node in the document, and that parent links form no
    /// cycle.
    pub fn from_document(doc: StoreDocument) -> Result<Self> {
        let mut by_path = HashMap::with_capacity(doc.nodes.len());
        for (i, node) in doc.nodes.iter().enumerate() {
            if by_path.insert(node.path.clone(), i).is_some() {
                return Err(ModelError::store(
                    "open",
                    format!("duplicate node path '{}'", node.path),
                ));
            }
        }

        let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
        for (i, node) in doc.nodes.iter().enumerate() {
            if let Some(ref parent) = node.parent {
                let parent_idx = *by_path.get(parent).ok_or_else(|| {
                    ModelError::store(
                        "open",
                        format!("node '{}' has unknown parent '{}'", node.path, parent),
                    )
                })?;
                children.entry(parent_idx).or_default().push(i);
            }
            if let Some(ref base) = node.base {
                if !by_path.contains_key(base) {
                    return Err(ModelError::store(
                        "open",
                        format!("node '{}' has unknown base '{}'", node.path, base),
                    ));
                }
            }
        }

        for start in 0..doc.nodes.len() {
            let mut seen = HashSet::new();
            let mut current = Some(start);
            while let Some(idx) = current {
                if !seen.insert(idx) {
                    return Err(ModelError::store(
                        "open",
                        format!("parent cycle at '{}'", doc.nodes[idx].path),
                    ));
                }
                current = doc.nodes[idx]
                    .parent
                    .as_deref()
                    .and_then(|p| by_path.get(p).copied());
            }
        }

        Ok(Self {
            nodes: doc.nodes,
            by_path,
            children,
        })
    }

    pub fn from_nodes(nodes: Vec<StoreNode>) -> Result<Self> {
        Self::from_document(StoreDocument { nodes })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let doc: StoreDocument = serde_json::from_str(json)?;
        Self::from_document(doc)
    }

    /// Read a store document from a JSON file at `path`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    /// The first node without a parent.
    pub fn root(&self) -> Option<MemoryNode> {
        self.nodes
            .iter()
            .position(|n| n.parent.is_none())
            .map(MemoryNode)
    }

    pub fn node(&self, path: &str) -> Option<MemoryNode> {
        self.by_path.get(path).copied().map(MemoryNode)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn get(&self, node: &MemoryNode, operation: &str) -> Result<&StoreNode> {
        self.nodes
            .get(node.0)
            .ok_or_else(|| ModelError::store(operation, format!("unknown node handle {}", node.0)))
    }

    fn child_indices(&self, idx: usize) -> &[usize] {
        self.children.get(&idx).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[async_trait]
impl ModelStore for MemoryStore {
    type Node = MemoryNode;

    fn attribute_names(&self, node: &MemoryNode) -> Result<Vec<String>> {
        Ok(self
            .get(node, "attribute_names")?
            .attributes
            .keys()
            .cloned()
            .collect())
    }

    fn attribute(&self, node: &MemoryNode, name: &str) -> Result<AttributeValue> {
        Ok(self
            .get(node, "attribute")?
            .attributes
            .get(name)
            .cloned()
            .unwrap_or(AttributeValue::Null))
    }

    fn base_type(&self, node: &MemoryNode) -> Result<Option<MemoryNode>> {
        let n = self.get(node, "base_type")?;
        Ok(n.base.as_deref().and_then(|b| self.node(b)))
    }

    fn path(&self, node: &MemoryNode) -> Result<String> {
        Ok(self.get(node, "path")?.path.clone())
    }

    fn parent(&self, node: &MemoryNode) -> Result<Option<MemoryNode>> {
        let n = self.get(node, "parent")?;
        Ok(n.parent.as_deref().and_then(|p| self.node(p)))
    }

    fn children_paths(&self, node: &MemoryNode) -> Result<Vec<String>> {
        self.get(node, "children_paths")?;
        Ok(self
            .child_indices(node.0)
            .iter()
            .map(|&i| self.nodes[i].path.clone())
            .collect())
    }

    fn pointer_names(&self, node: &MemoryNode) -> Result<Vec<String>> {
        Ok(self
            .get(node, "pointer_names")?
            .pointers
            .keys()
            .cloned()
            .collect())
    }

    fn pointer_path(&self, node: &MemoryNode, name: &str) -> Result<Option<String>> {
        Ok(self
            .get(node, "pointer_path")?
            .pointers
            .get(name)
            .cloned()
            .flatten())
    }

    fn set_names(&self, node: &MemoryNode) -> Result<Vec<String>> {
        Ok(self.get(node, "set_names")?.sets.keys().cloned().collect())
    }

    fn member_paths(&self, node: &MemoryNode, name: &str) -> Result<Vec<Option<String>>> {
        Ok(self
            .get(node, "member_paths")?
            .sets
            .get(name)
            .cloned()
            .unwrap_or_default())
    }

    async fn load_sub_tree(&self, node: &MemoryNode) -> Result<Vec<MemoryNode>> {
        self.get(node, "load_sub_tree")?;

        // Pre-order walk; children are pushed reversed so they pop in document order.
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.child_indices(node.0).iter().rev().copied().collect();
        while let Some(idx) = stack.pop() {
            out.push(MemoryNode(idx));
            stack.extend(self.child_indices(idx).iter().rev());
        }

        tracing::debug!(
            root = %self.nodes[node.0].path,
            descendants = out.len(),
            "Loaded subtree"
        );
        Ok(out)
    }
}
