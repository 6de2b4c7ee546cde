//! Schema-driven plan diffs.
//!
//! Attributes and nested blocks are compared by value at the top level of
//! the state object. A computed attribute or block that the configuration
//! leaves null keeps its prior value, so API-assigned values do not show up
//! as changes.

use serde_json::{Map, Value};

use crate::schema::Schema;
use crate::types::{AttributeChange, PlanResult};

/// Plan the transition from `prior` to `proposed`.
///
/// `prior` is `None` for a create; `proposed` is null for a delete.
pub fn diff(schema: &Schema, prior: Option<&Value>, proposed: &Value) -> PlanResult {
    match (prior, proposed) {
        (Some(prior), Value::Null) => plan_delete(schema, prior),
        (None, proposed) => plan_create(schema, proposed),
        (Some(prior), proposed) => plan_update(schema, prior, proposed),
    }
}

fn plan_create(schema: &Schema, proposed: &Value) -> PlanResult {
    let planned = with_defaults(schema, proposed);
    let changes = names(schema)
        .filter_map(|name| {
            get(&planned, name)
                .filter(|v| !v.is_null())
                .map(|v| AttributeChange::added(name, v.clone()))
        })
        .collect();
    PlanResult::with_changes(planned, changes, false)
}

fn plan_delete(schema: &Schema, prior: &Value) -> PlanResult {
    let changes = names(schema)
        .filter_map(|name| {
            get(prior, name)
                .filter(|v| !v.is_null())
                .map(|v| AttributeChange::removed(name, v.clone()))
        })
        .collect();
    PlanResult::with_changes(Value::Null, changes, false)
}

fn plan_update(schema: &Schema, prior: &Value, proposed: &Value) -> PlanResult {
    let mut planned = with_defaults(schema, proposed);
    if let Value::Object(map) = &mut planned {
        let computed = schema
            .block
            .attributes
            .iter()
            .filter(|(_, attr)| attr.flags.computed)
            .map(|(name, _)| name)
            .chain(
                schema
                    .block
                    .blocks
                    .iter()
                    .filter(|(_, block)| block.computed)
                    .map(|(name, _)| name),
            );
        for name in computed {
            let unset = map.get(name).map_or(true, Value::is_null);
            if unset {
                if let Some(value) = get(prior, name) {
                    map.insert(name.clone(), value.clone());
                }
            }
        }
    }

    let mut changes = Vec::new();
    let mut requires_replace = false;
    for name in names(schema) {
        let before = get(prior, name).filter(|v| !v.is_null());
        let after = get(&planned, name).filter(|v| !v.is_null());
        if before == after {
            continue;
        }
        requires_replace |= forces_replacement(schema, name);
        changes.push(AttributeChange::new(name, before.cloned(), after.cloned()));
    }

    PlanResult::with_changes(planned, changes, requires_replace)
}

/// `proposed` as an object, with attribute defaults in place of nulls.
fn with_defaults(schema: &Schema, proposed: &Value) -> Value {
    let mut map = proposed.as_object().cloned().unwrap_or_else(Map::new);
    for (name, attr) in &schema.block.attributes {
        if let Some(default) = &attr.default {
            if map.get(name).map_or(true, Value::is_null) {
                map.insert(name.clone(), default.clone());
            }
        }
    }
    Value::Object(map)
}

fn forces_replacement(schema: &Schema, name: &str) -> bool {
    schema.attribute(name).is_some_and(|a| a.force_new)
}

fn names(schema: &Schema) -> impl Iterator<Item = &str> {
    let mut names: Vec<&str> = schema
        .block
        .attributes
        .keys()
        .chain(schema.block.blocks.keys())
        .map(String::as_str)
        .collect();
    names.sort_unstable();
    names.into_iter()
}

fn get<'a>(value: &'a Value, name: &str) -> Option<&'a Value> {
    value.as_object().and_then(|m| m.get(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, Block, NestedBlock};
    use crate::testing::{
        assert_plan_changes_attribute, assert_plan_creates, assert_plan_no_changes,
        assert_plan_replaces, assert_plan_updates_in_place,
    };
    use serde_json::json;

    fn schema() -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::id())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("type", Attribute::required_string().with_force_new())
            .with_attribute("ttl", Attribute::optional_computed_int64())
            .with_attribute("labels", Attribute::labels())
            .with_attribute("delete_protection", Attribute::protection())
            .with_block(
                "access_settings",
                NestedBlock::single(Block::new().with_attribute("ssh_enabled", Attribute::optional_bool())),
            )
    }

    #[test]
    fn test_create_reports_non_null_attributes() {
        let plan = diff(
            &schema(),
            None,
            &json!({"name": "web", "type": "ipv4", "ttl": null, "delete_protection": true}),
        );
        assert_plan_creates(&plan);
        let paths: Vec<&str> = plan.changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["delete_protection", "name", "type"]);
        assert!(plan.planned_state["ttl"].is_null());
    }

    #[test]
    fn test_computed_values_carry_over() {
        let prior = json!({"id": "1", "name": "web", "type": "ipv4", "ttl": 3600, "labels": null, "delete_protection": false});
        let proposed = json!({"name": "web", "type": "ipv4"});
        let plan = diff(&schema(), Some(&prior), &proposed);
        assert_plan_no_changes(&plan);
        assert_eq!(plan.planned_state["id"], "1");
        assert_eq!(plan.planned_state["ttl"], 3600);
    }

    #[test]
    fn test_update_in_place() {
        let prior = json!({"id": "1", "name": "web", "type": "ipv4", "ttl": 3600});
        let proposed = json!({"name": "api", "type": "ipv4", "ttl": 600});
        let plan = diff(&schema(), Some(&prior), &proposed);
        assert_plan_updates_in_place(&plan);
        assert_plan_changes_attribute(&plan, "name");
        assert_plan_changes_attribute(&plan, "ttl");
    }

    #[test]
    fn test_unset_protection_plans_off() {
        let plan = diff(&schema(), None, &json!({"name": "web", "type": "ipv4"}));
        assert_eq!(plan.planned_state["delete_protection"], false);

        let prior = json!({"id": "1", "name": "web", "type": "ipv4", "delete_protection": true});
        let plan = diff(&schema(), Some(&prior), &json!({"name": "web", "type": "ipv4"}));
        assert_plan_updates_in_place(&plan);
        let change = plan.changes.iter().find(|c| c.path == "delete_protection").unwrap();
        assert_eq!(change.after, Some(json!(false)));
    }

    #[test]
    fn test_removed_labels_are_cleared() {
        let prior = json!({"id": "1", "name": "web", "type": "ipv4", "labels": {"env": "prod"}});
        let plan = diff(&schema(), Some(&prior), &json!({"name": "web", "type": "ipv4"}));
        assert_plan_updates_in_place(&plan);
        let change = plan.changes.iter().find(|c| c.path == "labels").unwrap();
        assert_eq!(change.before, Some(json!({"env": "prod"})));
        assert!(change.after.is_none());
        assert!(plan.planned_state.get("labels").is_none());
    }

    #[test]
    fn test_force_new_requires_replace() {
        let prior = json!({"id": "1", "name": "web", "type": "ipv4"});
        let proposed = json!({"name": "web", "type": "ipv6"});
        let plan = diff(&schema(), Some(&prior), &proposed);
        assert_plan_replaces(&plan);
        let change = plan.changes.iter().find(|c| c.path == "type").unwrap();
        assert_eq!(change.before, Some(json!("ipv4")));
    }

    #[test]
    fn test_block_change() {
        let prior = json!({"id": "1", "name": "web", "type": "ipv4", "access_settings": {"ssh_enabled": false}});
        let proposed = json!({"name": "web", "type": "ipv4", "access_settings": {"ssh_enabled": true}});
        let plan = diff(&schema(), Some(&prior), &proposed);
        assert_plan_changes_attribute(&plan, "access_settings");
        assert!(!plan.requires_replace);
    }

    #[test]
    fn test_computed_block_carries_over() {
        let schema = schema().with_block(
            "access_settings",
            NestedBlock::single(Block::new().with_attribute("ssh_enabled", Attribute::optional_bool()))
                .computed(),
        );
        let prior = json!({
            "id": "1",
            "name": "web",
            "type": "ipv4",
            "delete_protection": false,
            "access_settings": {"ssh_enabled": true}
        });
        let plan = diff(&schema, Some(&prior), &json!({"name": "web", "type": "ipv4"}));
        assert_plan_no_changes(&plan);
        assert_eq!(plan.planned_state["access_settings"]["ssh_enabled"], true);
    }

    #[test]
    fn test_delete_reports_removals() {
        let prior = json!({"id": "1", "name": "web", "type": "ipv4", "ttl": null});
        let plan = diff(&schema(), Some(&prior), &Value::Null);
        assert!(plan.planned_state.is_null());
        assert_eq!(plan.changes.len(), 3);
        assert!(plan.changes.iter().all(|c| c.after.is_none()));
    }
}
