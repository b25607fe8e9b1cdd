//! Plain in-memory representation of one loaded node.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use modelgraph_types::AttributeValue;

/// Suffix of the per-type child list key, e.g. `Leaf_list`.
pub const LIST_SUFFIX: &str = "_list";

/// Key under which children of `node_type` are exposed.
pub fn list_key(node_type: &str) -> String {
    format!("{node_type}{LIST_SUFFIX}")
}

/// Index of a record inside its [`ModelGraph`](crate::ModelGraph) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub(crate) usize);

impl RecordId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One node of the loaded subtree.
///
/// The raw fields are captured from the store by the snapshot extractor and
/// never change afterwards. The link fields are derived by the resolver and
/// hold arena ids, never paths; the parent is only ever kept as a path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub parent_path: Option<String>,
    pub child_paths: Vec<String>,
    pub attributes: BTreeMap<String, AttributeValue>,
    pub pointers: BTreeMap<String, Option<String>>,
    pub sets: BTreeMap<String, Vec<Option<String>>>,

    #[serde(skip)]
    pub(crate) child_lists: BTreeMap<String, Vec<RecordId>>,
    #[serde(skip)]
    pub(crate) pointer_links: BTreeMap<String, RecordId>,
    #[serde(skip)]
    pub(crate) set_links: BTreeMap<String, Vec<RecordId>>,
}

/// A value reachable by name on a record, the flattened view over
/// attributes and resolved links.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field<'a> {
    Attribute(&'a AttributeValue),
    Pointer(RecordId),
    Set(&'a [RecordId]),
    Children(&'a [RecordId]),
}

impl Record {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        node_type: impl Into<String>,
        parent_path: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            node_type: node_type.into(),
            parent_path,
            child_paths: Vec::new(),
            attributes: BTreeMap::new(),
            pointers: BTreeMap::new(),
            sets: BTreeMap::new(),
            child_lists: BTreeMap::new(),
            pointer_links: BTreeMap::new(),
            set_links: BTreeMap::new(),
        }
    }

    /// Look up a name the way a flattened record would expose it.
    ///
    /// Sets shadow pointers, pointers shadow `<Type>_list` keys, and those
    /// shadow attributes.
    pub fn field(&self, name: &str) -> Option<Field<'_>> {
        if let Some(members) = self.set_links.get(name) {
            return Some(Field::Set(members));
        }
        if let Some(&target) = self.pointer_links.get(name) {
            return Some(Field::Pointer(target));
        }
        if let Some(children) = name
            .strip_suffix(LIST_SUFFIX)
            .and_then(|t| self.child_lists.get(t))
        {
            return Some(Field::Children(children));
        }
        self.attributes.get(name).map(Field::Attribute)
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Resolved target of a pointer, `None` when null or left unresolved.
    pub fn pointer(&self, name: &str) -> Option<RecordId> {
        self.pointer_links.get(name).copied()
    }

    /// Resolved members of a set, in store order.
    pub fn set(&self, name: &str) -> Option<&[RecordId]> {
        self.set_links.get(name).map(Vec::as_slice)
    }

    /// Resolved structural children of the given type, in child order.
    pub fn children_of_type(&self, node_type: &str) -> &[RecordId] {
        self.child_lists
            .get(node_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Child types present on this record, each with its resolved list.
    pub fn child_lists(&self) -> impl Iterator<Item = (&str, &[RecordId])> {
        self.child_lists
            .iter()
            .map(|(t, ids)| (t.as_str(), ids.as_slice()))
    }

    pub fn pointer_links(&self) -> impl Iterator<Item = (&str, RecordId)> {
        self.pointer_links.iter().map(|(n, &id)| (n.as_str(), id))
    }

    pub fn set_links(&self) -> impl Iterator<Item = (&str, &[RecordId])> {
        self.set_links
            .iter()
            .map(|(n, ids)| (n.as_str(), ids.as_slice()))
    }

    pub(crate) fn clear_links(&mut self) {
        self.child_lists.clear();
        self.pointer_links.clear();
        self.set_links.clear();
    }
}
