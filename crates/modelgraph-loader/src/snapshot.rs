//! Node snapshot extraction: live store handle in, plain [`Record`] out.

use modelgraph_store::ModelStore;
use modelgraph_types::{AttributeValue, Result};

use crate::record::Record;

fn name_of<S: ModelStore + ?Sized>(store: &S, node: &S::Node) -> Result<String> {
    Ok(match store.attribute(node, "name")? {
        AttributeValue::Null => String::new(),
        AttributeValue::String(s) => s,
        other => other.to_string(),
    })
}

/// Capture the static shape of one node.
///
/// Reads name, path, base type name, parent path, attributes, child paths,
/// pointers and sets, in that order. Nothing is resolved; any store failure
/// is returned unchanged. A node without a base type is typed by its own name.
pub fn extract<S: ModelStore + ?Sized>(store: &S, node: &S::Node) -> Result<Record> {
    let name = name_of(store, node)?;
    let path = store.path(node)?;
    let node_type = match store.base_type(node)? {
        Some(base) => name_of(store, &base)?,
        None => name.clone(),
    };
    let parent_path = store
        .parent(node)?
        .map(|parent| store.path(&parent))
        .transpose()?;

    let mut record = Record::new(name, path, node_type, parent_path);

    for attr in store.attribute_names(node)? {
        let value = store.attribute(node, &attr)?;
        record.attributes.insert(attr, value);
    }

    record.child_paths = store.children_paths(node)?;

    for pointer in store.pointer_names(node)? {
        let target = store.pointer_path(node, &pointer)?;
        record.pointers.insert(pointer, target);
    }

    for set in store.set_names(node)? {
        let members = store.member_paths(node, &set)?;
        record.sets.insert(set, members);
    }

    Ok(record)
}
