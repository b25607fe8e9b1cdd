//! End-to-end tests for the model loader.
//!
//! Each test exercises the full path: store -> snapshot -> retrieve -> resolve
//! -> (transform) -> verify.

use std::sync::Arc;

use async_trait::async_trait;

use modelgraph_loader::{
    extract, resolve, Field, LoaderConfig, ModelGraph, ModelLoader, ResolvePolicy, SequentialIds,
    StageContext, SuffixVersion, OBJECTS_KEY,
};
use modelgraph_store::{MemoryNode, MemoryStore, ModelStore, StoreNode};
use modelgraph_types::{AttributeValue, ModelError, Result};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn store(nodes: Vec<StoreNode>) -> MemoryStore {
    MemoryStore::from_nodes(nodes).expect("store should build")
}

/// Meta types live under /meta so records get readable type names. The meta
/// nodes themselves are typed `Meta` so they never match a category.
fn meta() -> Vec<StoreNode> {
    ["Leaf", "Branch", "Federate", "Parameter", "Interaction", "COA", "Experiment"]
        .iter()
        .map(|t| {
            StoreNode::new(format!("/meta/{t}"))
                .child_of("/meta")
                .with_base("/meta")
                .named(t)
        })
        .collect()
}

fn with_meta(mut nodes: Vec<StoreNode>) -> Vec<StoreNode> {
    nodes.insert(1, StoreNode::new("/meta").child_of("").named("Meta"));
    let tail = nodes.split_off(2);
    nodes.extend(meta());
    nodes.extend(tail);
    nodes
}

fn deterministic_loader() -> ModelLoader {
    ModelLoader::with_defaults().with_context(StageContext::new(
        Arc::new(SequentialIds::new("id-")),
        Arc::new(SuffixVersion::default()),
    ))
}

/// Delegates to a memory store, failing or tampering on demand.
struct FaultyStore {
    inner: MemoryStore,
    fail_sub_tree: bool,
    fail_attribute_on: Option<String>,
    repeat_root: bool,
}

impl FaultyStore {
    fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            fail_sub_tree: false,
            fail_attribute_on: None,
            repeat_root: false,
        }
    }
}

#[async_trait]
impl ModelStore for FaultyStore {
    type Node = MemoryNode;

    fn attribute_names(&self, node: &MemoryNode) -> Result<Vec<String>> {
        self.inner.attribute_names(node)
    }

    fn attribute(&self, node: &MemoryNode, name: &str) -> Result<AttributeValue> {
        if let Some(ref path) = self.fail_attribute_on {
            if self.inner.path(node)? == *path {
                return Err(ModelError::store("attribute", format!("{path} is locked")));
            }
        }
        self.inner.attribute(node, name)
    }

    fn base_type(&self, node: &MemoryNode) -> Result<Option<MemoryNode>> {
        self.inner.base_type(node)
    }

    fn path(&self, node: &MemoryNode) -> Result<String> {
        self.inner.path(node)
    }

    fn parent(&self, node: &MemoryNode) -> Result<Option<MemoryNode>> {
        self.inner.parent(node)
    }

    fn children_paths(&self, node: &MemoryNode) -> Result<Vec<String>> {
        self.inner.children_paths(node)
    }

    fn pointer_names(&self, node: &MemoryNode) -> Result<Vec<String>> {
        self.inner.pointer_names(node)
    }

    fn pointer_path(&self, node: &MemoryNode, name: &str) -> Result<Option<String>> {
        self.inner.pointer_path(node, name)
    }

    fn set_names(&self, node: &MemoryNode) -> Result<Vec<String>> {
        self.inner.set_names(node)
    }

    fn member_paths(&self, node: &MemoryNode, name: &str) -> Result<Vec<Option<String>>> {
        self.inner.member_paths(node, name)
    }

    async fn load_sub_tree(&self, node: &MemoryNode) -> Result<Vec<MemoryNode>> {
        if self.fail_sub_tree {
            return Err(ModelError::store("load_sub_tree", "connection reset"));
        }
        let mut nodes = self.inner.load_sub_tree(node).await?;
        if self.repeat_root {
            nodes.push(*node);
        }
        Ok(nodes)
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lone_root_round_trips() {
    let store = store(vec![StoreNode::new("").named("ROOT").with_attr("speed", 3i64)]);
    let root = store.root().unwrap();

    let graph = ModelLoader::with_defaults()
        .load_graph(&store, &root)
        .await
        .expect("load should succeed");

    assert_eq!(graph.path_dict().len(), 1);
    assert_eq!(graph.root(), &extract(&store, &root).unwrap());
    assert!(graph.root().child_lists().next().is_none());
    assert_eq!(graph.root().field("speed"), Some(Field::Attribute(&AttributeValue::Integer(3))));
}

#[tokio::test]
async fn typed_child_lists_follow_path_order() {
    let store = store(with_meta(vec![
        StoreNode::new("").named("ROOT"),
        StoreNode::new("/1").child_of("").named("one").with_base("/meta/Leaf"),
        StoreNode::new("/2").child_of("").named("two").with_base("/meta/Leaf"),
        StoreNode::new("/3").child_of("").named("three").with_base("/meta/Branch"),
    ]));
    let graph = ModelLoader::with_defaults()
        .load_graph(&store, &store.root().unwrap())
        .await
        .unwrap();

    let root = graph.root();
    let leaves: Vec<&str> = root
        .children_of_type("Leaf")
        .iter()
        .map(|&id| graph[id].path.as_str())
        .collect();
    assert_eq!(leaves, vec!["/1", "/2"]);
    assert_eq!(root.children_of_type("Branch").len(), 1);
    assert!(matches!(root.field("Leaf_list"), Some(Field::Children(ids)) if ids.len() == 2));
}

#[tokio::test]
async fn dangling_pointer_fails_load() {
    let store = store(vec![
        StoreNode::new("").named("ROOT").with_pointer("target", Some("/99")),
        StoreNode::new("/99").named("Elsewhere"),
    ]);
    let err = ModelLoader::with_defaults()
        .load(&store, &store.root().unwrap())
        .await
        .unwrap_err();

    match err {
        ModelError::DanglingPointer { record, pointer, .. } => {
            assert_eq!(record, "ROOT");
            assert_eq!(pointer, "target");
        }
        other => panic!("expected dangling pointer, got {other:?}"),
    }
}

#[tokio::test]
async fn null_set_member_fails_load() {
    let store = store(vec![
        StoreNode::new("")
            .named("ROOT")
            .with_set("members", &[Some("/2"), None]),
        StoreNode::new("/2").child_of("").named("two"),
    ]);
    let err = ModelLoader::with_defaults()
        .load(&store, &store.root().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::NullSetMember { ref set, .. } if set == "members"));
}

#[tokio::test]
async fn dangling_set_member_fails_load() {
    let store = store(vec![
        StoreNode::new("").named("ROOT"),
        StoreNode::new("/1").child_of("").named("one").with_set("peers", &[Some("/x")]),
        StoreNode::new("/x").named("outside"),
    ]);
    let err = ModelLoader::with_defaults()
        .load_graph(&store, &store.root().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::DanglingSetMember { ref target, .. } if target == "/x"));
}

#[tokio::test]
async fn base_pointer_outside_subtree_is_exempt() {
    let store = store(vec![
        StoreNode::new("").named("ROOT"),
        StoreNode::new("/fco").child_of("").named("FCO"),
        StoreNode::new("/model").child_of("").named("Model").with_pointer("base", Some("/fco")),
    ]);
    let model = store.node("/model").unwrap();
    let graph = ModelLoader::with_defaults()
        .load_graph(&store, &model)
        .await
        .expect("base pointer must not fail the load");
    assert!(graph.root().pointer("base").is_none());
}

#[tokio::test]
async fn pointers_and_sets_match_path_dict() {
    let store = store(vec![
        StoreNode::new("")
            .named("ROOT")
            .with_pointer("last", Some("/3"))
            .with_set("order", &[Some("/3"), Some("/1"), Some("")]),
        StoreNode::new("/1").child_of("").named("one").with_pointer("next", Some("/2")),
        StoreNode::new("/2").child_of("").named("two").with_pointer("next", Some("/3")),
        StoreNode::new("/3").child_of("").named("three").with_pointer("next", Some("/1")),
    ]);
    let graph = ModelLoader::with_defaults()
        .load_graph(&store, &store.root().unwrap())
        .await
        .unwrap();

    for (_, record) in graph.iter() {
        for (name, path) in &record.pointers {
            if let Some(path) = path {
                assert_eq!(record.pointer(name), graph.lookup(path), "pointer {name} of {}", record.path);
            }
        }
        for (name, paths) in &record.sets {
            let resolved = record.set(name).unwrap();
            assert_eq!(resolved.len(), paths.len());
            for (i, p) in paths.iter().enumerate() {
                assert_eq!(Some(resolved[i]), graph.lookup(p.as_deref().unwrap()));
            }
        }
    }
}

#[tokio::test]
async fn resolution_is_idempotent_on_a_copy() {
    let store = store(vec![
        StoreNode::new("").named("ROOT").with_set("all", &[Some("/1"), Some("/2")]),
        StoreNode::new("/1").child_of("").named("one").with_pointer("peer", Some("/2")),
        StoreNode::new("/2").child_of("").named("two"),
    ]);
    let graph = ModelLoader::with_defaults()
        .load_graph(&store, &store.root().unwrap())
        .await
        .unwrap();

    let mut copy = graph.clone();
    resolve(&mut copy, &ResolvePolicy::default()).unwrap();
    assert_eq!(copy, graph);
}

#[tokio::test]
async fn missing_child_skipped_unless_strict() {
    let store = store(vec![
        StoreNode::new("").named("ROOT"),
        StoreNode::new("/1").child_of("").named("one"),
        StoreNode::new("/1/a").child_of("/1").named("a"),
    ]);
    let root = store.root().unwrap();
    let loader = ModelLoader::with_defaults();
    let mut graph = loader.load_graph(&store, &root).await.unwrap();

    // /1 still lists /1/a, which the trimmed graph never received
    let mut trimmed = ModelGraph::new(graph.root().clone());
    trimmed.insert(graph.by_path("/1").unwrap().clone()).unwrap();
    resolve(&mut trimmed, &ResolvePolicy::default()).unwrap();
    assert!(trimmed.by_path("/1").unwrap().child_lists().next().is_none());

    let strict = ResolvePolicy {
        strict_children: true,
        ..ResolvePolicy::default()
    };
    let err = resolve(&mut trimmed, &strict).unwrap_err();
    assert!(matches!(err, ModelError::MissingChild { .. }));

    // the full graph is unaffected
    resolve(&mut graph, &strict).unwrap();
}

#[tokio::test]
async fn sub_tree_failure_is_surfaced_unchanged() {
    let mut faulty = FaultyStore::new(store(vec![StoreNode::new("").named("ROOT")]));
    faulty.fail_sub_tree = true;
    let root = faulty.inner.root().unwrap();

    let err = ModelLoader::with_defaults()
        .load(&faulty, &root)
        .await
        .unwrap_err();
    match err {
        ModelError::Store { operation, message } => {
            assert_eq!(operation, "load_sub_tree");
            assert_eq!(message, "connection reset");
        }
        other => panic!("expected store failure, got {other:?}"),
    }
}

#[tokio::test]
async fn accessor_failure_on_descendant_aborts_load() {
    let mut faulty = FaultyStore::new(store(vec![
        StoreNode::new("").named("ROOT"),
        StoreNode::new("/1").child_of("").named("one"),
    ]));
    faulty.fail_attribute_on = Some("/1".into());
    let root = faulty.inner.root().unwrap();

    let err = ModelLoader::with_defaults()
        .load_graph(&faulty, &root)
        .await
        .unwrap_err();
    assert!(err.is_store_failure());
}

#[tokio::test]
async fn duplicate_paths_keep_one_record() {
    let mut faulty = FaultyStore::new(store(vec![
        StoreNode::new("").named("ROOT"),
        StoreNode::new("/1").child_of("").named("one"),
    ]));
    faulty.repeat_root = true;
    let root = faulty.inner.root().unwrap();

    let graph = ModelLoader::with_defaults()
        .load_graph(&faulty, &root)
        .await
        .unwrap();
    assert_eq!(graph.len(), 2);
    assert_eq!(graph.path_dict().len(), graph.len());
}

#[tokio::test]
async fn concurrent_loads_are_independent() {
    let store = store(vec![
        StoreNode::new("").named("ROOT"),
        StoreNode::new("/1").child_of("").named("one"),
    ]);
    let root = store.root().unwrap();
    let loader = ModelLoader::with_defaults();

    let (a, b) = tokio::join!(loader.load_graph(&store, &root), loader.load_graph(&store, &root));
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a, b);
    assert_eq!(a.len(), 2);
}

#[tokio::test]
async fn required_pointer_policy_from_config() {
    let store = store(vec![StoreNode::new("").named("ROOT").with_pointer("owner", None)]);
    let config = LoaderConfig::from_json_str(r#"{"resolve": {"required_pointers": ["owner"]}}"#)
        .unwrap();
    let err = ModelLoader::with_config(config)
        .load_graph(&store, &store.root().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::UnsetRequiredPointer { ref pointer, .. } if pointer == "owner"));
}

// ---------------------------------------------------------------------------
// Full pipeline
// ---------------------------------------------------------------------------

fn federation() -> MemoryStore {
    store(with_meta(vec![
        StoreNode::new("").named("Demo"),
        StoreNode::new("/fed").child_of("").named("Sim").with_base("/meta/Federate"),
        StoreNode::new("/fed/sub").child_of("/fed").named("Sub").with_base("/meta/Federate"),
        StoreNode::new("/int").child_of("").named("Ping").with_base("/meta/Interaction"),
        StoreNode::new("/int/p").child_of("/int").named("payload").with_base("/meta/Parameter"),
        StoreNode::new("/coa")
            .child_of("")
            .named("Plan")
            .with_base("/meta/COA")
            .with_pointer("first", Some("/int"))
            .with_pointer("base", Some("/meta/COA"))
            .with_pointer("run", Some("/exp"))
            .with_set("feds", &[Some("/fed"), Some("/fed/sub")]),
        StoreNode::new("/exp")
            .child_of("")
            .named("Run")
            .with_base("/meta/Experiment")
            .with_attr("version", "1.0"),
    ]))
}

#[tokio::test]
async fn full_load_builds_output_model() {
    let store = federation();
    let loaded = deterministic_loader()
        .load(&store, &store.root().unwrap())
        .await
        .expect("load should succeed");
    let out = &loaded.output;

    assert_eq!(out.category("Federates").len(), 2);
    assert_eq!(out.category("Parameters").len(), 1);
    assert_eq!(out.category("Interactions").len(), 1);
    assert_eq!(out.category("coas").len(), 1);
    assert_eq!(out.category("Experiments").len(), 1);
    assert!(out.category("configurations").is_empty());

    let sub = out.object(out.id_of("/fed/sub").unwrap()).unwrap();
    assert_eq!(sub["parent"], out.id_of("/fed").unwrap());

    let coa = out.objects_in("coas")[0];
    assert_eq!(coa["references"]["first"], out.id_of("/int").unwrap());
    assert_eq!(coa["references"]["feds"].as_array().unwrap().len(), 2);

    assert_eq!(out.objects_in("Experiments")[0]["version"], "1.0.1");

    let project = out.objects_in("projects")[0];
    assert_eq!(project["name"], "Demo");
    assert_eq!(project["placeholder"], true);
    assert_eq!(out.objects_in("Users").len(), 1);
    assert!(out.category("builds").is_empty());

    let json = serde_json::to_value(out).unwrap();
    assert!(json[OBJECTS_KEY].as_object().unwrap().len() >= 6);
}

#[tokio::test]
async fn references_keep_record_ids_across_categories() {
    let store = federation();
    let loaded = deterministic_loader()
        .load(&store, &store.root().unwrap())
        .await
        .unwrap();
    let out = &loaded.output;
    let refs = &out.objects_in("coas")[0]["references"];

    // exported by a later stage under the id the reference already used
    let run = refs["run"].as_str().unwrap();
    assert_eq!(Some(run), out.id_of("/exp"));
    assert_eq!(out.object(run).unwrap()["path"], "/exp");

    // never exported: the id names the record but has no object entry
    let base = refs["base"].as_str().unwrap();
    assert_eq!(Some(base), out.id_of("/meta/COA"));
    assert!(out.object(base).is_none());
}

#[tokio::test]
async fn sequential_ids_repeat_across_loads() {
    let store = federation();
    let root = store.root().unwrap();
    let loader = deterministic_loader();

    let first = loader.load(&store, &root).await.unwrap().output;
    let second = loader.load(&store, &root).await.unwrap().output;
    assert_eq!(first.id_of("/fed"), second.id_of("/fed"));
    assert_eq!(first.objects, second.objects);

    let (a, b) = tokio::join!(loader.load(&store, &root), loader.load(&store, &root));
    let (a, b) = (a.unwrap().output, b.unwrap().output);
    assert_eq!(a.objects, b.objects);
    assert_eq!(a.id_of("/int"), first.id_of("/int"));
}

#[tokio::test]
async fn tree_json_is_finite_with_pointer_cycles() {
    let store = store(vec![
        StoreNode::new("").named("ROOT").with_pointer("self", Some("")),
        StoreNode::new("/1").child_of("").named("one").with_pointer("up", Some("")),
    ]);
    let graph = ModelLoader::with_defaults()
        .load_graph(&store, &store.root().unwrap())
        .await
        .unwrap();

    let tree = graph.to_tree_json();
    assert_eq!(tree["self"]["$ref"], "");
    assert_eq!(tree["one_list"][0]["up"]["$ref"], "");
    assert!(serde_json::to_string(&tree).is_ok());
}
