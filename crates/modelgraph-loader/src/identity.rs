//! Identifier and version label policies used by transform stages.

use modelgraph_types::AttributeValue;

/// Produces a unique identifier for each output object.
///
/// `key` is the record path, or a synthetic key for fabricated objects.
/// `issued` counts the ids already handed out in the current run; the run's
/// output owns that count, so a generator shared between loads carries no
/// state from one load to the next.
pub trait IdGenerator: Send + Sync {
    fn generate(&self, key: &str, issued: usize) -> String;
}

/// Random v4 UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn generate(&self, _key: &str, _issued: usize) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// `<prefix><n>` with `n` counting up from 1 within each run.
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new("obj-")
    }
}

impl IdGenerator for SequentialIds {
    fn generate(&self, _key: &str, issued: usize) -> String {
        format!("{}{}", self.prefix, issued + 1)
    }
}

/// Derives a new version label from an object's current `version`.
pub trait VersionPolicy: Send + Sync {
    fn next_version(&self, current: Option<&AttributeValue>) -> String;
}

/// Appends a fixed suffix, `1.2` → `1.2.1` by default. A missing or null
/// version counts as `0`.
#[derive(Debug, Clone)]
pub struct SuffixVersion {
    suffix: String,
}

impl SuffixVersion {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }
}

impl Default for SuffixVersion {
    fn default() -> Self {
        Self::new(".1")
    }
}

impl VersionPolicy for SuffixVersion {
    fn next_version(&self, current: Option<&AttributeValue>) -> String {
        match current {
            Some(v) if !v.is_null() => format!("{v}{}", self.suffix),
            _ => format!("0{}", self.suffix),
        }
    }
}
