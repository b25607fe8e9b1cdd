//! The shared output accumulator transform stages write into.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::identity::IdGenerator;

pub const OBJECTS_KEY: &str = "__OBJECTS__";

/// Categories present in a freshly initialized output, in display order.
pub const CATEGORIES: &[&str] = &[
    "projects",
    "Users",
    "organizations",
    "Federates",
    "coas",
    "Experiments",
    "Interactions",
    "Parameters",
    "configurations",
    "repositories",
    "builds",
    "executions",
    "Docker Images",
];

/// Application-facing model built by the transform stages.
///
/// Objects live in one id-keyed table; categories hold ordered id lists.
///
/// Every record referenced by an exported object gets an id, whether or not a
/// stage exports that record itself. The object table therefore holds only
/// exported records: a reference may name an id with no entry in `objects`,
/// and such an id still identifies one record for the whole run.
#[derive(Debug, Clone, Serialize)]
pub struct OutputModel {
    #[serde(rename = "__OBJECTS__")]
    pub objects: BTreeMap<String, Value>,
    #[serde(flatten)]
    pub categories: BTreeMap<String, Vec<String>>,
    #[serde(rename = "generatedAt")]
    pub generated_at: DateTime<Utc>,
    /// Record path → assigned id, so a record keeps one id for the whole run.
    #[serde(skip)]
    ids: HashMap<String, String>,
}

impl OutputModel {
    pub fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
            categories: BTreeMap::new(),
            generated_at: Utc::now(),
            ids: HashMap::new(),
        }
    }

    /// Drop everything and lay out the empty category shape.
    pub fn reset_shape(&mut self) {
        self.objects.clear();
        self.ids.clear();
        self.categories = CATEGORIES
            .iter()
            .map(|c| (c.to_string(), Vec::new()))
            .collect();
        self.generated_at = Utc::now();
    }

    /// Identifier for `path`, generated on first request.
    pub fn id_for(&mut self, path: &str, ids: &dyn IdGenerator) -> String {
        let issued = self.ids.len();
        self.ids
            .entry(path.to_string())
            .or_insert_with(|| ids.generate(path, issued))
            .clone()
    }

    pub fn id_of(&self, path: &str) -> Option<&str> {
        self.ids.get(path).map(String::as_str)
    }

    /// Store `object` under `id` and append `id` to `category`.
    pub fn add_object(&mut self, category: &str, id: String, object: Value) {
        self.objects.insert(id.clone(), object);
        self.categories
            .entry(category.to_string())
            .or_default()
            .push(id);
    }

    pub fn category(&self, name: &str) -> &[String] {
        self.categories
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn object(&self, id: &str) -> Option<&Value> {
        self.objects.get(id)
    }

    /// Objects of a category in order.
    pub fn objects_in(&self, category: &str) -> Vec<&Value> {
        self.category(category)
            .iter()
            .filter_map(|id| self.objects.get(id))
            .collect()
    }
}

impl Default for OutputModel {
    fn default() -> Self {
        Self::new()
    }
}
