//! `hcloud_zone_rrset` resource and data source.
//!
//! An RRSet is addressed by its zone (ID or name), record name and type; the
//! state ID joins the three as `<zone>/<name>/<type>`.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::{decode, encode, require, vanished, DataSource, Resource};
use crate::error::ProviderError;
use crate::hcloud::{Client, ZoneRRSet, ZoneRRSetCreateOpts, ZoneRRSetRecord};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Block, Diagnostic, NestedBlock, Schema};
use crate::util::{experimental, id, labels};
use crate::validation::{validate_int_range, validate_one_of};

pub const RESOURCE_TYPE: &str = "hcloud_zone_rrset";

const ID_FORMAT: &str = "<zone>/<name>/<type>";

const RECORD_TYPES: [&str; 16] = [
    "A", "AAAA", "CAA", "CNAME", "DS", "HINFO", "HTTPS", "MX", "NS", "PTR", "RP", "SOA", "SRV",
    "SVCB", "TLSA", "TXT",
];

/// State of an RRSet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneRRSetModel {
    pub id: Option<String>,
    pub zone: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub rr_type: Option<String>,
    pub ttl: Option<i64>,
    pub labels: Option<HashMap<String, String>>,
    pub change_protection: Option<bool>,
    pub records: Option<Vec<ZoneRRSetRecord>>,
}

impl ZoneRRSetModel {
    /// `zone` is kept as configured; the API only reports the numeric zone ID.
    pub fn from_api(rrset: &ZoneRRSet, zone: &str) -> Self {
        Self {
            id: Some(id::join(&[zone, rrset.name.as_str(), rrset.rr_type.as_str()])),
            zone: Some(zone.to_string()),
            name: Some(rrset.name.clone()),
            rr_type: Some(rrset.rr_type.clone()),
            ttl: rrset.ttl,
            labels: labels::from_api(&rrset.labels),
            change_protection: Some(rrset.protection.change),
            records: Some(rrset.records.clone()),
        }
    }

    /// Zone, name and type, from the attributes or else from the ID.
    fn key(&self) -> Result<(String, String, String), ProviderError> {
        if let (Some(zone), Some(name), Some(rr_type)) = (&self.zone, &self.name, &self.rr_type) {
            return Ok((zone.clone(), name.clone(), rr_type.clone()));
        }
        let raw = require(self.id.clone(), "id")?;
        let mut parts = id::split(&raw, 3, ID_FORMAT)?.into_iter();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(zone), Some(name), Some(rr_type)) => Ok((zone, name, rr_type)),
            _ => Err(ProviderError::InvalidRequest(format!(
                "invalid ID '{}', expected format {}",
                raw, ID_FORMAT
            ))),
        }
    }
}

fn records_block() -> NestedBlock {
    NestedBlock::list(
        Block::new()
            .with_attribute("value", Attribute::required_string())
            .with_attribute("comment", Attribute::optional_string()),
    )
    .with_min_items(1)
}

pub struct ZoneRRSetResource;

#[async_trait]
impl Resource for ZoneRRSetResource {
    fn type_name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A set of DNS records sharing name and type.")
            .with_attribute("id", Attribute::id())
            .with_attribute(
                "zone",
                Attribute::required_string()
                    .with_force_new()
                    .with_description("ID or name of the zone."),
            )
            .with_attribute("name", Attribute::required_string().with_force_new())
            .with_attribute("type", Attribute::required_string().with_force_new())
            .with_attribute(
                "ttl",
                Attribute::optional_int64()
                    .with_description("TTL of the records. Unset uses the zone default."),
            )
            .with_attribute("labels", Attribute::labels())
            .with_attribute(
                "change_protection",
                Attribute::protection()
                    .with_description("Protect the records against changes. Unset means off."),
            )
            .with_block("records", records_block())
    }

    fn experimental(&self) -> Option<&'static str> {
        Some(experimental::DNS)
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let mut diagnostics = super::validate_config(&self.schema(), config, self.experimental());
        diagnostics.extend(validate_one_of(config.get("type"), &RECORD_TYPES, "type"));
        diagnostics.extend(validate_int_range(config.get("ttl"), 60, 2_147_483_647, "ttl"));
        diagnostics
    }

    async fn create(&self, client: &Client, planned: &Value) -> Result<Value, ProviderError> {
        let model: ZoneRRSetModel = decode(planned)?;
        let zone = require(model.zone.clone(), "zone")?;
        let opts = ZoneRRSetCreateOpts {
            name: require(model.name.clone(), "name")?,
            rr_type: require(model.rr_type.clone(), "type")?,
            ttl: model.ttl,
            labels: labels::to_api(model.labels.as_ref()),
            records: require(model.records.clone(), "records")?,
        };

        let mut rrset = client.create_zone_rrset(&zone, &opts).await?;
        info!(zone = %zone, name = %rrset.name, r#type = %rrset.rr_type, "Created RRSet");

        if model.change_protection == Some(true) {
            client
                .change_zone_rrset_protection(&zone, &rrset.name, &rrset.rr_type, true)
                .await?;
            rrset.protection.change = true;
        }
        encode(&ZoneRRSetModel::from_api(&rrset, &zone))
    }

    async fn read(&self, client: &Client, state: &Value) -> Result<Option<Value>, ProviderError> {
        let model: ZoneRRSetModel = decode(state)?;
        let (zone, name, rr_type) = model.key()?;
        match client.get_zone_rrset(&zone, &name, &rr_type).await? {
            Some(rrset) => Ok(Some(encode(&ZoneRRSetModel::from_api(&rrset, &zone))?)),
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        client: &Client,
        prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError> {
        let prior: ZoneRRSetModel = decode(prior)?;
        let planned: ZoneRRSetModel = decode(planned)?;
        let (zone, name, rr_type) = prior.key()?;

        if labels::changed(prior.labels.as_ref(), planned.labels.as_ref()) {
            client
                .update_zone_rrset_labels(
                    &zone,
                    &name,
                    &rr_type,
                    &labels::to_api(planned.labels.as_ref()),
                )
                .await?;
        }
        if planned.ttl != prior.ttl {
            client
                .change_zone_rrset_ttl(&zone, &name, &rr_type, planned.ttl)
                .await?;
        }
        if let Some(records) = planned.records.as_ref().filter(|r| Some(*r) != prior.records.as_ref()) {
            client
                .set_zone_rrset_records(&zone, &name, &rr_type, records)
                .await?;
        }
        if let Some(protect) = planned
            .change_protection
            .filter(|p| Some(*p) != prior.change_protection)
        {
            client
                .change_zone_rrset_protection(&zone, &name, &rr_type, protect)
                .await?;
        }

        info!(zone = %zone, name = %name, r#type = %rr_type, "Updated RRSet");
        let rrset = client
            .get_zone_rrset(&zone, &name, &rr_type)
            .await?
            .ok_or_else(|| vanished("RRSet", id::join(&[&zone, &name, &rr_type])))?;
        encode(&ZoneRRSetModel::from_api(&rrset, &zone))
    }

    async fn delete(&self, client: &Client, state: &Value) -> Result<(), ProviderError> {
        let model: ZoneRRSetModel = decode(state)?;
        let (zone, name, rr_type) = model.key()?;
        match client.delete_zone_rrset(&zone, &name, &rr_type).await {
            Ok(()) => info!(zone = %zone, name = %name, r#type = %rr_type, "Deleted RRSet"),
            Err(err) if err.is_not_found() => {},
            Err(err) => return Err(err.into()),
        }
        Ok(())
    }
}

pub struct ZoneRRSetDataSource;

#[async_trait]
impl DataSource for ZoneRRSetDataSource {
    fn type_name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        let computed = |attr_type| Attribute::new(attr_type, AttributeFlags::computed());
        Schema::v0()
            .with_description("Look up an RRSet by zone, name and type.")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("zone", Attribute::required_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("type", Attribute::required_string())
            .with_attribute("ttl", Attribute::computed_int64())
            .with_attribute("labels", computed(AttributeType::map(AttributeType::String)))
            .with_attribute("change_protection", Attribute::computed_bool())
            .with_attribute(
                "records",
                computed(AttributeType::list(AttributeType::object([
                    ("value", AttributeType::String),
                    ("comment", AttributeType::String),
                ]))),
            )
    }

    fn experimental(&self) -> Option<&'static str> {
        Some(experimental::DNS)
    }

    async fn read(&self, client: &Client, config: &Value) -> Result<Value, ProviderError> {
        experimental::log_once(experimental::DNS);
        let lookup: ZoneRRSetModel = decode(config)?;
        let (zone, name, rr_type) = lookup.key()?;
        let rrset = client
            .get_zone_rrset(&zone, &name, &rr_type)
            .await?
            .ok_or_else(|| {
                ProviderError::NotFound(format!(
                    "RRSet '{}' of type {} not found in zone '{}'",
                    name, rr_type, zone
                ))
            })?;
        encode(&ZoneRRSetModel::from_api(&rrset, &zone))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hcloud::Method;
    use crate::testing::{action_json, assert_error_contains, MockTransport};
    use serde_json::json;

    fn rrset_json(ttl: Option<i64>) -> Value {
        json!({
            "id": "www/A",
            "name": "www",
            "type": "A",
            "ttl": ttl,
            "labels": {},
            "protection": {"change": false},
            "records": [{"value": "203.0.113.1", "comment": "web"}],
            "zone": 42
        })
    }

    #[test]
    fn test_model_keeps_configured_zone() {
        let rrset: ZoneRRSet = serde_json::from_value(rrset_json(None)).unwrap();
        let model = ZoneRRSetModel::from_api(&rrset, "example.com");
        assert_eq!(model.id.as_deref(), Some("example.com/www/A"));
        assert_eq!(model.zone.as_deref(), Some("example.com"));
        assert_eq!(model.ttl, None);
    }

    #[test]
    fn test_key_from_id() {
        let model = ZoneRRSetModel {
            id: Some("42/@/MX".to_string()),
            ..Default::default()
        };
        assert_eq!(
            model.key().unwrap(),
            ("42".to_string(), "@".to_string(), "MX".to_string())
        );
        let model = ZoneRRSetModel {
            id: Some("42/www".to_string()),
            ..Default::default()
        };
        assert!(matches!(model.key(), Err(ProviderError::InvalidRequest(_))));
    }

    #[test]
    fn test_validate_type_and_records() {
        let diagnostics = ZoneRRSetResource.validate(&json!({
            "zone": "example.com", "name": "www", "type": "AXFR", "records": [{"value": "x"}]
        }));
        assert_error_contains(&diagnostics, "type");

        let diagnostics = ZoneRRSetResource.validate(&json!({
            "zone": "example.com", "name": "www", "type": "A", "records": []
        }));
        assert!(diagnostics.iter().any(|d| d.is_error()));
    }

    #[tokio::test]
    async fn test_create() {
        let mock = MockTransport::new();
        mock.on(
            Method::Post,
            "/zones/example.com/rrsets",
            201,
            json!({"rrset": rrset_json(None), "action": action_json(1, "success")}),
        );

        let planned = json!({
            "zone": "example.com",
            "name": "www",
            "type": "A",
            "records": [{"value": "203.0.113.1", "comment": "web"}]
        });
        let state = ZoneRRSetResource.create(&mock.client(), &planned).await.unwrap();
        assert_eq!(state["id"], "example.com/www/A");
        assert_eq!(state["records"][0]["value"], "203.0.113.1");

        let body = mock.requests()[0].body.clone().unwrap();
        assert_eq!(body["type"], "A");
        assert!(body.get("ttl").is_none());
    }

    #[tokio::test]
    async fn test_update_ttl_and_records() {
        let mock = MockTransport::new();
        let base = "/zones/example.com/rrsets/www/A";
        mock.on(
            Method::Post,
            &format!("{}/actions/change_ttl", base),
            201,
            json!({"action": action_json(1, "success")}),
        );
        mock.on(
            Method::Post,
            &format!("{}/actions/set_records", base),
            201,
            json!({"action": action_json(2, "success")}),
        );
        mock.on(Method::Get, base, 200, json!({"rrset": rrset_json(Some(300))}));

        let rrset: ZoneRRSet = serde_json::from_value(rrset_json(None)).unwrap();
        let prior = encode(&ZoneRRSetModel::from_api(&rrset, "example.com")).unwrap();
        let mut planned = prior.clone();
        planned["ttl"] = json!(300);
        planned["records"] = json!([{"value": "203.0.113.2"}]);

        let state = ZoneRRSetResource
            .update(&mock.client(), &prior, &planned)
            .await
            .unwrap();
        assert_eq!(state["ttl"], 300);

        let set = &mock.requests_to(Method::Post, &format!("{}/actions/set_records", base))[0];
        assert_eq!(set.body.as_ref().unwrap()["records"][0]["value"], "203.0.113.2");
        assert!(mock
            .requests_to(Method::Post, &format!("{}/actions/change_protection", base))
            .is_empty());
    }

    #[tokio::test]
    async fn test_import_and_read_missing() {
        let mock = MockTransport::new();
        mock.on(
            Method::Get,
            "/zones/example.com/rrsets/www/A",
            200,
            json!({"rrset": rrset_json(None)}),
        );
        let client = mock.client();

        let state = ZoneRRSetResource
            .import(&client, "example.com/www/A")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state["zone"], "example.com");
        assert_eq!(state["name"], "www");

        let missing = ZoneRRSetResource
            .read(&client, &json!({"id": "example.com/mail/MX"}))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_data_source_not_found() {
        let mock = MockTransport::new();
        let err = ZoneRRSetDataSource
            .read(&mock.client(), &json!({"zone": "example.com", "name": "www", "type": "A"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }
}
