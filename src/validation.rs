//! Input validation.
//!
//! [`validate`] checks a configuration value against a [`Schema`]: required
//! attributes, attribute types and nested block counts. The remaining
//! functions are value-level checks shared by the resources, most notably
//! [`validate_labels`] which enforces the Hetzner label format.
//!
//! ```
//! use hemmer_provider_hcloud::schema::{Attribute, Schema};
//! use hemmer_provider_hcloud::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute("labels", Attribute::labels());
//!
//! assert!(validate(&schema, &json!({"name": "web"})).is_empty());
//! assert_eq!(validate(&schema, &json!({"name": 1})).len(), 1);
//! ```

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::schema::{Attribute, AttributeType, Block, BlockNestingMode, Diagnostic, NestedBlock, Schema};

/// Label key prefix reserved for the platform.
pub const RESERVED_LABEL_PREFIX: &str = "hetzner.cloud/";

const LABEL_PREFIX_MAX_LEN: usize = 253;
const LABEL_NAME_MAX_LEN: usize = 63;

/// Validate a JSON value against a schema.
///
/// Computed-only attributes are not checked. An empty result means the value
/// is valid.
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(&schema.block, value, "", &mut diagnostics);
    diagnostics
}

/// Like [`validate`], but as a `Result`.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Returns true if `value` satisfies `schema`.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

fn validate_block(block: &Block, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return,
        other => {
            let diag = Diagnostic::error("Expected object")
                .with_detail(format!("Got {}", value_type_name(other)));
            diagnostics.push(if path.is_empty() {
                diag
            } else {
                diag.with_attribute(path)
            });
            return;
        },
    };

    for (name, attr) in &block.attributes {
        validate_attribute(attr, obj.get(name), &join_path(path, name), diagnostics);
    }
    for (name, nested) in &block.blocks {
        validate_nested_block(nested, obj.get(name), &join_path(path, name), diagnostics);
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.is_computed_only() {
        return;
    }
    match value {
        None | Some(Value::Null) if attr.flags.required => diagnostics.push(
            Diagnostic::error(format!("Missing required attribute '{}'", path))
                .with_detail("This attribute is required and must be provided")
                .with_attribute(path),
        ),
        None | Some(Value::Null) => {},
        Some(v) => validate_type(&attr.attr_type, v, path, diagnostics),
    }
}

fn validate_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let expected = match attr_type {
        AttributeType::String if !value.is_string() => "string",
        AttributeType::Int64 if !is_int64(value) => "int64",
        AttributeType::Float64 if !value.is_number() => "float64",
        AttributeType::Bool if !value.is_boolean() => "bool",
        AttributeType::List(element) => match value.as_array() {
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    validate_type(element, item, &format!("{}.{}", path, i), diagnostics);
                }
                return;
            },
            None => "list",
        },
        AttributeType::Map(element) => match value.as_object() {
            Some(entries) => {
                for (key, item) in entries {
                    validate_type(element, item, &format!("{}.{}", path, key), diagnostics);
                }
                return;
            },
            None => "map",
        },
        AttributeType::Object(attrs) => match value.as_object() {
            Some(obj) => {
                validate_object(attrs, obj, path, diagnostics);
                return;
            },
            None => "object",
        },
        _ => return,
    };
    diagnostics.push(type_error(path, expected, value));
}

fn validate_object(
    attrs: &HashMap<String, AttributeType>,
    obj: &Map<String, Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    // Object members carry no required flag, so only present members are checked.
    for (name, attr_type) in attrs {
        if let Some(value) = obj.get(name) {
            validate_type(attr_type, value, &join_path(path, name), diagnostics);
        }
    }
}

fn validate_nested_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let value = match value {
        None | Some(Value::Null) => {
            if nested.min_items > 0 {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' requires at least {} item(s)",
                        path, nested.min_items
                    ))
                    .with_attribute(path),
                );
            }
            return;
        },
        Some(v) => v,
    };

    let items = match (nested.nesting_mode, value) {
        (BlockNestingMode::Single, v) => {
            validate_block(&nested.block, v, path, diagnostics);
            return;
        },
        (BlockNestingMode::List, Value::Array(items)) => items,
        (BlockNestingMode::List, other) => {
            diagnostics.push(
                Diagnostic::error(format!("Expected list for block '{}'", path))
                    .with_detail(format!("Got {}", value_type_name(other)))
                    .with_attribute(path),
            );
            return;
        },
    };

    let len = items.len();
    if len < nested.min_items as usize {
        diagnostics.push(
            Diagnostic::error(format!(
                "Block '{}' requires at least {} item(s), got {}",
                path, nested.min_items, len
            ))
            .with_attribute(path),
        );
    }
    for (i, item) in items.iter().enumerate() {
        validate_block(&nested.block, item, &format!("{}.{}", path, i), diagnostics);
    }
}

/// Validate a `labels` map.
///
/// A key is an optional DNS-style prefix of at most 253 characters followed by
/// `/`, then a name of 1 to 63 characters. Values are empty or follow the name
/// rules. Keys under `hetzner.cloud/` are reserved.
pub fn validate_labels(labels: &Value, path: &str) -> Vec<Diagnostic> {
    let Some(entries) = labels.as_object() else {
        return Vec::new();
    };

    let mut diagnostics = Vec::new();
    for (key, value) in entries {
        if let Err(reason) = check_label_key(key) {
            diagnostics.push(
                Diagnostic::error("Invalid label key")
                    .with_detail(format!("label key '{}' {}", key, reason))
                    .with_attribute(path),
            );
        }
        match value.as_str() {
            Some(v) if v.is_empty() || is_label_name(v) => {},
            Some(v) => diagnostics.push(
                Diagnostic::error("Invalid label value")
                    .with_detail(format!(
                        "label value '{}' of key '{}' must be at most {} characters, \
                         start and end with an alphanumeric character and contain only \
                         alphanumerics, '-', '_' or '.'",
                        v, key, LABEL_NAME_MAX_LEN
                    ))
                    .with_attribute(path),
            ),
            None => diagnostics.push(type_error(&join_path(path, key), "string", value)),
        }
    }
    diagnostics
}

fn check_label_key(key: &str) -> Result<(), &'static str> {
    if key.starts_with(RESERVED_LABEL_PREFIX) {
        return Err("uses the reserved prefix 'hetzner.cloud/'");
    }
    let name = match key.rsplit_once('/') {
        Some((prefix, name)) => {
            if prefix.is_empty() || prefix.len() > LABEL_PREFIX_MAX_LEN || !is_label_prefix(prefix) {
                return Err("has an invalid prefix");
            }
            name
        },
        None => key,
    };
    if is_label_name(name) {
        Ok(())
    } else {
        Err("has an invalid name")
    }
}

fn is_label_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            bytes.len() <= LABEL_NAME_MAX_LEN
                && first.is_ascii_alphanumeric()
                && last.is_ascii_alphanumeric()
                && bytes
                    .iter()
                    .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
        },
        _ => false,
    }
}

fn is_label_prefix(prefix: &str) -> bool {
    prefix.split('.').all(|part| {
        let bytes = part.as_bytes();
        !bytes.is_empty()
            && bytes[0].is_ascii_alphanumeric()
            && bytes[bytes.len() - 1].is_ascii_alphanumeric()
            && bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-')
    })
}

/// Check that an optional string attribute is one of `allowed`.
pub fn validate_one_of(value: Option<&Value>, allowed: &[&str], path: &str) -> Vec<Diagnostic> {
    match value.and_then(Value::as_str) {
        Some(v) if !allowed.contains(&v) => vec![Diagnostic::error(format!(
            "Invalid value for attribute '{}'",
            path
        ))
        .with_detail(format!(
            "Expected one of [{}], got '{}'",
            allowed.join(", "),
            v
        ))
        .with_attribute(path)],
        _ => Vec::new(),
    }
}

/// Check that an optional integer attribute lies within `min..=max`.
pub fn validate_int_range(value: Option<&Value>, min: i64, max: i64, path: &str) -> Vec<Diagnostic> {
    match value.and_then(Value::as_i64) {
        Some(v) if v < min || v > max => vec![Diagnostic::error(format!(
            "Invalid value for attribute '{}'",
            path
        ))
        .with_detail(format!("Expected a value between {} and {}, got {}", min, max, v))
        .with_attribute(path)],
        _ => Vec::new(),
    }
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) if n.is_i64() => true,
        Value::Number(n) => n
            .as_f64()
            .is_some_and(|f| f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64),
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, value_type_name(got)))
        .with_attribute(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, Block, NestedBlock, Schema};
    use serde_json::json;

    #[test]
    fn test_required_attribute() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        assert!(validate(&schema, &json!({"name": "web"})).is_empty());

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("name"));

        assert_eq!(validate(&schema, &json!({"name": null})).len(), 1);

        let diagnostics = validate(&schema, &json!({"name": 123}));
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_optional_and_computed_attributes() {
        let schema = Schema::v0()
            .with_attribute("id", Attribute::id())
            .with_attribute("ttl", Attribute::optional_int64());

        assert!(validate(&schema, &json!({})).is_empty());
        assert!(validate(&schema, &json!({"ttl": null, "id": 5})).is_empty());
        assert!(validate(&schema, &json!({"ttl": 3600.0})).is_empty());
        assert_eq!(validate(&schema, &json!({"ttl": "1h"})).len(), 1);
        assert_eq!(validate(&schema, &json!({"ttl": 1.5})).len(), 1);
    }

    #[test]
    fn test_collection_types() {
        let schema = Schema::v0()
            .with_attribute(
                "ssh_keys",
                Attribute::new(
                    AttributeType::list(AttributeType::String),
                    crate::schema::AttributeFlags::optional(),
                ),
            )
            .with_attribute("labels", Attribute::labels());

        assert!(validate(&schema, &json!({"ssh_keys": ["a"], "labels": {"k": "v"}})).is_empty());

        let diagnostics = validate(&schema, &json!({"ssh_keys": ["a", 2]}));
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("ssh_keys.1"));

        let diagnostics = validate(&schema, &json!({"labels": ["k"]}));
        assert!(diagnostics[0].detail.as_deref().unwrap().contains("map"));
    }

    #[test]
    fn test_nested_blocks() {
        let schema = Schema::v0()
            .with_block(
                "access_settings",
                NestedBlock::single(Block::new().with_attribute("ssh_enabled", Attribute::optional_bool())),
            )
            .with_block(
                "records",
                NestedBlock::list(Block::new().with_attribute("value", Attribute::required_string()))
                    .with_min_items(1),
            );

        assert!(validate(
            &schema,
            &json!({"access_settings": {"ssh_enabled": true}, "records": [{"value": "1.2.3.4"}]})
        )
        .is_empty());

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("records"));

        let diagnostics = validate(&schema, &json!({"records": [{}]}));
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("records.0.value"));

        let diagnostics = validate(&schema, &json!({"records": {"value": "x"}}));
        assert!(diagnostics[0].summary.contains("Expected list"));
    }

    #[test]
    fn test_root_not_object() {
        let schema = Schema::v0();
        let diagnostics = validate(&schema, &json!("nope"));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].attribute.is_none());
        assert!(validate_result(&schema, &json!({})).is_ok());
        assert!(!is_valid(&schema, &json!(1)));
    }

    #[test]
    fn test_valid_labels() {
        let labels = json!({
            "env": "prod",
            "empty": "",
            "example.com/team": "a_b-c.d",
            "a": "1",
        });
        assert!(validate_labels(&labels, "labels").is_empty());
        assert!(validate_labels(&Value::Null, "labels").is_empty());
    }

    #[test]
    fn test_invalid_label_keys() {
        let long = "a".repeat(64);
        for key in ["", "-env", "env-", "hetzner.cloud/x", "/name", "exa mple/x", long.as_str()] {
            let labels = json!({ key: "v" });
            let diagnostics = validate_labels(&labels, "labels");
            assert_eq!(diagnostics.len(), 1, "key {:?}", key);
            assert_eq!(diagnostics[0].summary, "Invalid label key");
        }
    }

    #[test]
    fn test_invalid_label_values() {
        let diagnostics = validate_labels(&json!({"env": "-prod"}), "labels");
        assert_eq!(diagnostics[0].summary, "Invalid label value");

        let diagnostics = validate_labels(&json!({"env": "a".repeat(64)}), "labels");
        assert_eq!(diagnostics.len(), 1);

        let diagnostics = validate_labels(&json!({"env": 1}), "labels");
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("labels.env"));
    }

    #[test]
    fn test_one_of_and_range() {
        let allowed = ["ipv4", "ipv6"];
        assert!(validate_one_of(Some(&json!("ipv4")), &allowed, "type").is_empty());
        assert!(validate_one_of(None, &allowed, "type").is_empty());
        assert_eq!(validate_one_of(Some(&json!("ipv5")), &allowed, "type").len(), 1);

        assert!(validate_int_range(Some(&json!(65)), 1, 65535, "port").is_empty());
        assert_eq!(validate_int_range(Some(&json!(0)), 1, 65535, "port").len(), 1);
    }
}
