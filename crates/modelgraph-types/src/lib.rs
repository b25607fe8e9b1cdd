//! Shared types and errors for the model graph loader.
//!
//! This crate provides the foundational types used across all other modelgraph crates:
//! - `ModelError`: unified error taxonomy
//! - `AttributeValue`: scalar value held by a node attribute

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unified error type for all modelgraph subsystems.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    // === Store Errors ===
    #[error("Store operation '{operation}' failed: {message}")]
    Store { operation: String, message: String },

    // === Resolution Errors ===
    #[error("{record} has pointer '{pointer}' to object not in the tree: {target}")]
    DanglingPointer {
        record: String,
        pointer: String,
        target: String,
    },

    #[error("{record} has set '{set}' containing member not in the tree: {target}")]
    DanglingSetMember {
        record: String,
        set: String,
        target: String,
    },

    #[error("{record} has set '{set}' containing a null member")]
    NullSetMember { record: String, set: String },

    #[error("{record} has required pointer '{pointer}' unset")]
    UnsetRequiredPointer { record: String, pointer: String },

    #[error("{record} has child {child} that was not loaded")]
    MissingChild { record: String, child: String },

    // === Pipeline Errors ===
    #[error("No transform stage registered for '{stage}'")]
    StageMissing { stage: String },

    #[error("Transform stage '{stage}' failed: {message}")]
    StageFailed { stage: String, message: String },

    // === Generic ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl ModelError {
    /// Shorthand for an accessor failure reported by a store implementation.
    pub fn store(operation: impl Into<String>, message: impl Into<String>) -> Self {
        ModelError::Store {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Returns `true` for the integrity faults raised while resolving references.
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            ModelError::DanglingPointer { .. }
                | ModelError::DanglingSetMember { .. }
                | ModelError::NullSetMember { .. }
                | ModelError::UnsetRequiredPointer { .. }
                | ModelError::MissingChild { .. }
        )
    }

    /// Returns `true` if the error came from the underlying store.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, ModelError::Store { .. })
    }
}

/// A convenience alias for `Result<T, ModelError>`.
pub type Result<T> = std::result::Result<T, ModelError>;

// ---------------------------------------------------------------------------
// AttributeValue: scalar attribute held by a node
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    /// Convert to a `serde_json::Value`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            AttributeValue::Null => serde_json::Value::Null,
            AttributeValue::Boolean(b) => serde_json::Value::Bool(*b),
            AttributeValue::Integer(i) => serde_json::json!(*i),
            AttributeValue::Float(f) => serde_json::json!(*f),
            AttributeValue::String(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Null => write!(f, "null"),
            AttributeValue::Boolean(b) => write!(f, "{b}"),
            AttributeValue::Integer(i) => write!(f, "{i}"),
            AttributeValue::Float(x) => write!(f, "{x}"),
            AttributeValue::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::String(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::String(s)
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Integer(i)
    }
}

impl From<f64> for AttributeValue {
    fn from(f: f64) -> Self {
        AttributeValue::Float(f)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Boolean(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_dangling_pointer() {
        let err = ModelError::DanglingPointer {
            record: "Sim".into(),
            pointer: "target".into(),
            target: "/99".into(),
        };
        assert_eq!(
            err.to_string(),
            "Sim has pointer 'target' to object not in the tree: /99"
        );
    }

    #[test]
    fn error_display_null_set_member() {
        let err = ModelError::NullSetMember {
            record: "Sim".into(),
            set: "members".into(),
        };
        assert_eq!(err.to_string(), "Sim has set 'members' containing a null member");
    }

    #[test]
    fn error_display_store() {
        let err = ModelError::store("load_sub_tree", "connection reset");
        assert_eq!(
            err.to_string(),
            "Store operation 'load_sub_tree' failed: connection reset"
        );
    }

    #[test]
    fn error_display_stage_failed() {
        let err = ModelError::StageFailed {
            stage: "build-hierarchy".into(),
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "Transform stage 'build-hierarchy' failed: boom");
    }

    #[test]
    fn integrity_classification() {
        assert!(ModelError::NullSetMember {
            record: "a".into(),
            set: "s".into()
        }
        .is_integrity());
        assert!(ModelError::DanglingSetMember {
            record: "a".into(),
            set: "s".into(),
            target: "/x".into()
        }
        .is_integrity());
        assert!(!ModelError::store("get_path", "x").is_integrity());
        assert!(ModelError::store("get_path", "x").is_store_failure());
        assert!(!ModelError::Other("x".into()).is_store_failure());
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ModelError = io.into();
        assert!(matches!(err, ModelError::Io(_)));
    }

    #[test]
    fn attribute_value_deserializes_untagged() {
        let values: Vec<AttributeValue> =
            serde_json::from_str(r#"[null, true, 3, 2.5, "hi"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                AttributeValue::Null,
                AttributeValue::Boolean(true),
                AttributeValue::Integer(3),
                AttributeValue::Float(2.5),
                AttributeValue::String("hi".into()),
            ]
        );
    }

    #[test]
    fn attribute_value_accessors() {
        assert!(AttributeValue::Null.is_null());
        assert!(!AttributeValue::from("null").is_null());
        assert_eq!(AttributeValue::from(1.5).to_string(), "1.5");
        assert_eq!(AttributeValue::from(7i64).to_json(), serde_json::json!(7));
    }
}
