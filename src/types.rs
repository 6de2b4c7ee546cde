//! Values returned to the host by plan, import and metadata calls.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One top-level attribute that a plan adds, removes or changes.
///
/// `before` is `None` on create and `after` is `None` on delete. Both are
/// set for an in-place change or a replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    pub path: String,
    pub before: Option<Value>,
    pub after: Option<Value>,
}

impl AttributeChange {
    pub fn new(path: impl Into<String>, before: Option<Value>, after: Option<Value>) -> Self {
        Self {
            path: path.into(),
            before,
            after,
        }
    }

    pub fn added(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, None, Some(value))
    }

    pub fn removed(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, Some(value), None)
    }
}

/// Outcome of [`crate::plan::diff`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// State the apply step receives. Null when the object is deleted.
    pub planned_state: Value,
    /// Sorted by path.
    pub changes: Vec<AttributeChange>,
    /// Some changed attribute is `force_new`, so the object is recreated.
    pub requires_replace: bool,
}

impl PlanResult {
    pub fn with_changes(
        planned_state: Value,
        changes: Vec<AttributeChange>,
        requires_replace: bool,
    ) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace,
        }
    }
}

/// State adopted by `import_resource`, tagged with its resource type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    pub resource_type: String,
    pub state: Value,
}

impl ImportedResource {
    pub fn new(resource_type: impl Into<String>, state: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}

/// Sorted type names served by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    pub resources: Vec<String>,
    pub data_sources: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_change_constructors() {
        let added = AttributeChange::added("name", json!("web"));
        assert!(added.before.is_none());
        assert_eq!(added.after, Some(json!("web")));

        let removed = AttributeChange::removed("ttl", json!(3600));
        assert_eq!(removed.before, Some(json!(3600)));
        assert!(removed.after.is_none());
    }

    #[test]
    fn test_imported_resource_serializes_type() {
        let imported = ImportedResource::new("hcloud_zone", json!({"id": "example.com"}));
        let value = serde_json::to_value(&imported).unwrap();
        assert_eq!(value["resource_type"], "hcloud_zone");
        assert_eq!(value["state"]["id"], "example.com");
    }
}
