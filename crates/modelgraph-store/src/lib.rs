//! Contract for the hierarchical data store a model is loaded from.
//!
//! A store exposes live node handles. Each node has a path, a base type, scalar
//! attributes, named pointers and named sets, and can enumerate its structural
//! descendants. [`ModelStore`] is the only surface the loader reads through;
//! [`MemoryStore`] is a concrete store backed by a JSON document.
//!
//! # Example
//! ```
//! use modelgraph_store::{MemoryStore, ModelStore};
//!
//! let store = MemoryStore::from_json_str(r#"{"nodes": [
//!     {"path": "", "attributes": {"name": "ROOT"}},
//!     {"path": "/1", "parent": "", "attributes": {"name": "Leaf"}}
//! ]}"#).unwrap();
//! let root = store.root().unwrap();
//! assert_eq!(store.children_paths(&root).unwrap(), vec!["/1".to_string()]);
//! ```

mod memory;

use async_trait::async_trait;

use modelgraph_types::{AttributeValue, Result};

pub use memory::{MemoryNode, MemoryStore, StoreDocument, StoreNode};

/// Read operations the loader needs from a hierarchical model store.
///
/// All accessors are synchronous except [`load_sub_tree`](ModelStore::load_sub_tree),
/// which is the single suspension point of a load. Any error returned here is
/// fatal for the load and is surfaced to the caller unchanged.
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Live handle to one node.
    type Node: Clone + Send + Sync;

    fn attribute_names(&self, node: &Self::Node) -> Result<Vec<String>>;

    /// Value of a named attribute; `Null` when the node has no such attribute.
    fn attribute(&self, node: &Self::Node, name: &str) -> Result<AttributeValue>;

    /// The node's base (meta) type, or `None` for a node without one.
    fn base_type(&self, node: &Self::Node) -> Result<Option<Self::Node>>;

    fn path(&self, node: &Self::Node) -> Result<String>;

    /// The containing node, or `None` for the store root.
    fn parent(&self, node: &Self::Node) -> Result<Option<Self::Node>>;

    fn children_paths(&self, node: &Self::Node) -> Result<Vec<String>>;

    fn pointer_names(&self, node: &Self::Node) -> Result<Vec<String>>;

    /// Target path of a pointer, or `None` when the pointer is not set.
    fn pointer_path(&self, node: &Self::Node, name: &str) -> Result<Option<String>>;

    fn set_names(&self, node: &Self::Node) -> Result<Vec<String>>;

    /// Member paths of a set in order. A `None` entry is a null member.
    fn member_paths(&self, node: &Self::Node, name: &str) -> Result<Vec<Option<String>>>;

    /// Every structural descendant of `node`, recursively, excluding `node` itself.
    async fn load_sub_tree(&self, node: &Self::Node) -> Result<Vec<Self::Node>>;
}
