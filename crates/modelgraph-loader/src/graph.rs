use std::collections::{HashMap, HashSet};
use std::ops::Index;

use serde_json::{Map, Value};

use crate::record::{list_key, Record, RecordId};

/// Arena of every record loaded under one root.
///
/// The root is always `RecordId(0)`. `path_dict` maps each path to exactly
/// one record; links between records are arena ids, so pointer and set
/// cycles are plain data here.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelGraph {
    records: Vec<Record>,
    path_dict: HashMap<String, RecordId>,
}

impl ModelGraph {
    pub fn new(root: Record) -> Self {
        let mut path_dict = HashMap::new();
        path_dict.insert(root.path.clone(), RecordId(0));
        Self {
            records: vec![root],
            path_dict,
        }
    }

    /// Add a record. Returns `None` without inserting if its path is taken.
    pub fn insert(&mut self, record: Record) -> Option<RecordId> {
        if self.path_dict.contains_key(&record.path) {
            return None;
        }
        let id = RecordId(self.records.len());
        self.path_dict.insert(record.path.clone(), id);
        self.records.push(record);
        Some(id)
    }

    pub fn root_id(&self) -> RecordId {
        RecordId(0)
    }

    pub fn root(&self) -> &Record {
        &self.records[0]
    }

    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.records.get(id.0)
    }

    pub fn lookup(&self, path: &str) -> Option<RecordId> {
        self.path_dict.get(path).copied()
    }

    pub fn by_path(&self, path: &str) -> Option<&Record> {
        self.lookup(path).map(|id| &self.records[id.0])
    }

    pub fn path_dict(&self) -> &HashMap<String, RecordId> {
        &self.path_dict
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always `false`; a graph holds at least its root.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in load order, root first.
    pub fn iter(&self) -> impl Iterator<Item = (RecordId, &Record)> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, r)| (RecordId(i), r))
    }

    pub fn records_of_type<'a>(
        &'a self,
        node_type: &'a str,
    ) -> impl Iterator<Item = (RecordId, &'a Record)> + 'a {
        self.iter().filter(move |(_, r)| r.node_type == node_type)
    }

    /// Containing record, found by looking up the parent path.
    ///
    /// `None` for the root of the load and for any record whose parent lies
    /// outside the loaded subtree.
    pub fn parent(&self, id: RecordId) -> Option<RecordId> {
        self.get(id)?
            .parent_path
            .as_deref()
            .and_then(|p| self.lookup(p))
    }

    /// Loaded ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: RecordId) -> Vec<RecordId> {
        let mut out = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            // A well-formed store cannot loop; stop rather than spin if it does.
            if parent == id || out.contains(&parent) {
                break;
            }
            out.push(parent);
            current = parent;
        }
        out
    }

    pub(crate) fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    // --- Serialization ---

    /// Record fields plus the flattened attribute view. Core keys are never
    /// overwritten by an attribute of the same name.
    fn base_json(record: &Record) -> Map<String, Value> {
        let mut obj = match serde_json::to_value(record) {
            Ok(Value::Object(m)) => m,
            _ => Map::new(),
        };
        for (name, value) in &record.attributes {
            obj.entry(name.clone()).or_insert_with(|| value.to_json());
        }
        obj
    }

    fn ref_json(&self, id: RecordId) -> Value {
        serde_json::json!({ "$ref": self.records[id.0].path })
    }

    /// Flat form: every record keyed by path, links rendered as paths.
    pub fn to_flat_json(&self) -> Value {
        let path_of = |id: RecordId| Value::String(self.records[id.0].path.clone());
        let mut dict = Map::new();
        for record in &self.records {
            let mut obj = Self::base_json(record);
            for (node_type, ids) in record.child_lists() {
                obj.insert(list_key(node_type), ids.iter().map(|&i| path_of(i)).collect());
            }
            for (name, id) in record.pointer_links() {
                obj.insert(name.to_string(), path_of(id));
            }
            for (name, ids) in record.set_links() {
                obj.insert(name.to_string(), ids.iter().map(|&i| path_of(i)).collect());
            }
            dict.insert(record.path.clone(), Value::Object(obj));
        }
        serde_json::json!({
            "root": self.root().path,
            "pathDict": dict,
        })
    }

    /// Tree form: records nest through their `<Type>_list` children only.
    ///
    /// Pointers and sets become `{"$ref": path}` objects, and a record reached
    /// a second time through children is also emitted as a reference, so the
    /// output is finite whatever the link structure.
    pub fn to_tree_json(&self) -> Value {
        let mut expanded = HashSet::new();
        self.tree_node(self.root_id(), &mut expanded)
    }

    fn tree_node(&self, id: RecordId, expanded: &mut HashSet<RecordId>) -> Value {
        if !expanded.insert(id) {
            return self.ref_json(id);
        }
        let record = &self.records[id.0];
        let mut obj = Self::base_json(record);
        for (node_type, ids) in record.child_lists() {
            let children: Vec<Value> = ids.iter().map(|&c| self.tree_node(c, expanded)).collect();
            obj.insert(list_key(node_type), Value::Array(children));
        }
        for (name, target) in record.pointer_links() {
            obj.insert(name.to_string(), self.ref_json(target));
        }
        for (name, ids) in record.set_links() {
            obj.insert(
                name.to_string(),
                ids.iter().map(|&m| self.ref_json(m)).collect(),
            );
        }
        Value::Object(obj)
    }
}

impl Index<RecordId> for ModelGraph {
    type Output = Record;

    fn index(&self, id: RecordId) -> &Record {
        &self.records[id.0]
    }
}
