//! `hcloud_primary_ip` resource, and the `hcloud_primary_ip` / `hcloud_primary_ips` data sources.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::{decode, encode, require, vanished, DataSource, Resource};
use crate::error::ProviderError;
use crate::hcloud::{Client, Endpoint, PrimaryIp, PrimaryIpCreateOpts, PrimaryIpUpdateOpts};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Diagnostic, Schema};
use crate::util::{datasource, id, labels};
use crate::validation::validate_one_of;

pub const RESOURCE_TYPE: &str = "hcloud_primary_ip";
pub const LIST_TYPE: &str = "hcloud_primary_ips";

const IP_TYPES: [&str; 2] = ["ipv4", "ipv6"];
const ASSIGNEE_TYPES: [&str; 1] = ["server"];

/// State of a Primary IP.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimaryIpModel {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub ip_type: Option<String>,
    pub datacenter: Option<String>,
    pub location: Option<String>,
    pub assignee_type: Option<String>,
    pub assignee_id: Option<i64>,
    pub auto_delete: Option<bool>,
    pub labels: Option<HashMap<String, String>>,
    pub delete_protection: Option<bool>,
    pub ip_address: Option<String>,
    pub ip_network: Option<String>,
}

impl PrimaryIpModel {
    pub fn from_api(ip: &PrimaryIp) -> Self {
        Self {
            id: Some(id::format(ip.id)),
            name: Some(ip.name.clone()),
            ip_type: Some(ip.ip_type.clone()),
            datacenter: ip.datacenter.as_ref().map(|d| d.name.clone()),
            location: ip.location_name().map(str::to_string),
            assignee_type: Some(ip.assignee_type.clone()),
            assignee_id: ip.assignee_id,
            auto_delete: Some(ip.auto_delete),
            labels: labels::from_api(&ip.labels),
            delete_protection: Some(ip.protection.delete),
            ip_address: Some(ip.address()),
            ip_network: (ip.ip_type == "ipv6").then(|| ip.network().to_string()),
        }
    }

    fn api_id(&self) -> Result<i64, ProviderError> {
        id::parse(&require(self.id.clone(), "id")?, "Primary IP")
    }
}

/// Attributes shared by the resource and the data source. The data source
/// gets every input attribute as computed.
fn common_attributes(computed: bool) -> Schema {
    let input = |attr: Attribute| {
        if computed {
            Attribute::new(attr.attr_type, AttributeFlags::computed())
        } else {
            attr
        }
    };
    Schema::v0()
        .with_attribute("type", input(Attribute::required_string().with_force_new()))
        .with_attribute("datacenter", input(Attribute::optional_computed_string().with_force_new()))
        .with_attribute("location", input(Attribute::optional_computed_string().with_force_new()))
        .with_attribute("assignee_type", input(Attribute::required_string()))
        .with_attribute("assignee_id", input(Attribute::optional_computed_int64()))
        .with_attribute("auto_delete", input(Attribute::required_bool()))
        .with_attribute("delete_protection", input(Attribute::protection()))
        .with_attribute("ip_address", Attribute::computed_string())
        .with_attribute("ip_network", Attribute::computed_string())
}

pub struct PrimaryIpResource;

#[async_trait]
impl Resource for PrimaryIpResource {
    fn type_name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        common_attributes(false)
            .with_description("A Primary IP address.")
            .with_attribute("id", Attribute::id())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("labels", Attribute::labels())
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let mut diagnostics = super::validate_config(&self.schema(), config, None);
        diagnostics.extend(validate_one_of(config.get("type"), &IP_TYPES, "type"));
        diagnostics.extend(validate_one_of(
            config.get("assignee_type"),
            &ASSIGNEE_TYPES,
            "assignee_type",
        ));
        diagnostics
    }

    async fn create(&self, client: &Client, planned: &Value) -> Result<Value, ProviderError> {
        let model: PrimaryIpModel = decode(planned)?;
        let opts = PrimaryIpCreateOpts {
            name: require(model.name.clone(), "name")?,
            ip_type: require(model.ip_type.clone(), "type")?,
            assignee_type: require(model.assignee_type.clone(), "assignee_type")?,
            assignee_id: model.assignee_id,
            // The API rejects a placement together with an assignee.
            datacenter: model.datacenter.clone().filter(|_| model.assignee_id.is_none()),
            location: model.location.clone().filter(|_| model.assignee_id.is_none()),
            auto_delete: require(model.auto_delete, "auto_delete")?,
            labels: labels::to_api(model.labels.as_ref()),
        };

        let mut ip = client.create_primary_ip(&opts).await?;
        info!(id = ip.id, name = %ip.name, "Created Primary IP");

        if model.delete_protection == Some(true) {
            client.change_primary_ip_protection(ip.id, true).await?;
            ip.protection.delete = true;
        }
        encode(&PrimaryIpModel::from_api(&ip))
    }

    async fn read(&self, client: &Client, state: &Value) -> Result<Option<Value>, ProviderError> {
        let model: PrimaryIpModel = decode(state)?;
        match client.get_primary_ip(model.api_id()?).await? {
            Some(ip) => Ok(Some(encode(&PrimaryIpModel::from_api(&ip))?)),
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        client: &Client,
        prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError> {
        let prior: PrimaryIpModel = decode(prior)?;
        let planned: PrimaryIpModel = decode(planned)?;
        let ip_id = prior.api_id()?;

        let mut opts = PrimaryIpUpdateOpts::default();
        if planned.name != prior.name {
            opts.name = planned.name.clone();
        }
        if planned.auto_delete != prior.auto_delete {
            opts.auto_delete = planned.auto_delete;
        }
        if labels::changed(prior.labels.as_ref(), planned.labels.as_ref()) {
            opts.labels = Some(labels::to_api(planned.labels.as_ref()));
        }
        if opts != PrimaryIpUpdateOpts::default() {
            client.update_primary_ip(ip_id, &opts).await?;
        }

        if planned.assignee_id != prior.assignee_id {
            if prior.assignee_id.is_some() {
                client.unassign_primary_ip(ip_id).await?;
            }
            if let Some(assignee_id) = planned.assignee_id {
                let assignee_type = require(planned.assignee_type.clone(), "assignee_type")?;
                client
                    .assign_primary_ip(ip_id, assignee_id, &assignee_type)
                    .await?;
            }
        }

        if let Some(protect) = planned.delete_protection {
            if Some(protect) != prior.delete_protection {
                client.change_primary_ip_protection(ip_id, protect).await?;
            }
        }

        info!(id = ip_id, "Updated Primary IP");
        let ip = client
            .get_primary_ip(ip_id)
            .await?
            .ok_or_else(|| vanished("Primary IP", ip_id))?;
        encode(&PrimaryIpModel::from_api(&ip))
    }

    async fn delete(&self, client: &Client, state: &Value) -> Result<(), ProviderError> {
        let model: PrimaryIpModel = decode(state)?;
        let ip_id = model.api_id()?;

        let Some(ip) = client.get_primary_ip(ip_id).await? else {
            return Ok(());
        };
        if ip.assignee_id.is_some() {
            client.unassign_primary_ip(ip_id).await?;
        }
        match client.delete_primary_ip(ip_id).await {
            Ok(action) => {
                client.settle_actions(Endpoint::Cloud, [action]).await?
            },
            Err(err) if err.is_not_found() => {},
            Err(err) => return Err(err.into()),
        }
        info!(id = ip_id, "Deleted Primary IP");
        Ok(())
    }
}

/// Lookup keys of the `hcloud_primary_ip` data source.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PrimaryIpLookup {
    id: Option<String>,
    name: Option<String>,
    ip_address: Option<String>,
    with_selector: Option<String>,
}

fn data_source_schema() -> Schema {
    common_attributes(true)
        .with_attribute("id", Attribute::optional_computed_string())
        .with_attribute("name", Attribute::optional_computed_string())
        .with_attribute("ip_address", Attribute::optional_computed_string())
        .with_attribute(
            "labels",
            Attribute::new(
                AttributeType::map(AttributeType::String),
                AttributeFlags::computed(),
            ),
        )
        .with_attribute("with_selector", Attribute::optional_string())
}

pub struct PrimaryIpDataSource;

#[async_trait]
impl DataSource for PrimaryIpDataSource {
    fn type_name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        data_source_schema().with_description("Look up a single Primary IP.")
    }

    async fn read(&self, client: &Client, config: &Value) -> Result<Value, ProviderError> {
        let lookup: PrimaryIpLookup = decode(config)?;

        let ip = if let Some(raw) = &lookup.id {
            client
                .get_primary_ip(id::parse(raw, "Primary IP")?)
                .await?
                .ok_or_else(|| datasource::not_found("Primary IP", "id", raw))?
        } else if let Some(name) = &lookup.name {
            client
                .list_primary_ips(Some(name), None, None)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| datasource::not_found("Primary IP", "name", name))?
        } else if let Some(address) = &lookup.ip_address {
            client
                .list_primary_ips(None, Some(address), None)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| datasource::not_found("Primary IP", "ip_address", address))?
        } else if let Some(selector) = &lookup.with_selector {
            let ips = client.list_primary_ips(None, None, Some(selector)).await?;
            datasource::one_result(ips, "Primary IP", selector)?
        } else {
            return Err(ProviderError::Validation(
                "one of id, name, ip_address or with_selector must be set".to_string(),
            ));
        };

        let mut state = encode(&PrimaryIpModel::from_api(&ip))?;
        state["with_selector"] = json!(lookup.with_selector);
        Ok(state)
    }
}

pub struct PrimaryIpListDataSource;

#[async_trait]
impl DataSource for PrimaryIpListDataSource {
    fn type_name(&self) -> &'static str {
        LIST_TYPE
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("List Primary IPs, optionally filtered by label selector.")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("with_selector", Attribute::optional_string())
            .with_attribute(
                "primary_ips",
                Attribute::new(
                    AttributeType::list(AttributeType::Dynamic),
                    AttributeFlags::computed(),
                ),
            )
    }

    async fn read(&self, client: &Client, config: &Value) -> Result<Value, ProviderError> {
        let selector = config.get("with_selector").and_then(Value::as_str);
        let ips = client.list_primary_ips(None, None, selector).await?;

        let models: Vec<PrimaryIpModel> = ips.iter().map(PrimaryIpModel::from_api).collect();
        Ok(json!({
            "id": datasource::list_id(ips.iter().map(|ip| ip.id)),
            "with_selector": selector,
            "primary_ips": encode(&models)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hcloud::Method;
    use crate::testing::{action_json, assert_error_contains, MockTransport};

    fn ip_json(assignee_id: Option<i64>) -> Value {
        json!({
            "id": 1,
            "name": "web-ip",
            "ip": "203.0.113.7",
            "type": "ipv4",
            "assignee_id": assignee_id,
            "assignee_type": "server",
            "auto_delete": false,
            "blocked": false,
            "datacenter": {"id": 4, "name": "fsn1-dc14", "location": {"id": 1, "name": "fsn1"}},
            "location": {"id": 1, "name": "fsn1"},
            "dns_ptr": [],
            "labels": {"env": "prod"},
            "protection": {"delete": false},
            "created": "2024-01-01T00:00:00+00:00"
        })
    }

    fn planned() -> Value {
        json!({
            "name": "web-ip",
            "type": "ipv4",
            "location": "fsn1",
            "assignee_type": "server",
            "auto_delete": false,
            "labels": {"env": "prod"},
            "delete_protection": true
        })
    }

    #[test]
    fn test_model_from_api() {
        let ip: PrimaryIp = serde_json::from_value(ip_json(Some(5))).unwrap();
        let model = PrimaryIpModel::from_api(&ip);
        assert_eq!(model.id.as_deref(), Some("1"));
        assert_eq!(model.ip_type.as_deref(), Some("ipv4"));
        assert_eq!(model.datacenter.as_deref(), Some("fsn1-dc14"));
        assert_eq!(model.location.as_deref(), Some("fsn1"));
        assert_eq!(model.assignee_id, Some(5));
        assert_eq!(model.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(model.ip_network, None);
        assert_eq!(model.delete_protection, Some(false));
        assert_eq!(model.labels.unwrap()["env"], "prod");

        let state = encode(&PrimaryIpModel::from_api(&ip)).unwrap();
        assert_eq!(state["type"], "ipv4");
    }

    #[test]
    fn test_validate() {
        let config = json!({"name": "x", "type": "ipv5", "assignee_type": "server", "auto_delete": true});
        assert_error_contains(&PrimaryIpResource.validate(&config), "type");
        assert!(PrimaryIpResource.validate(&planned()).is_empty());
    }

    #[tokio::test]
    async fn test_create_with_protection() {
        let mock = MockTransport::new();
        mock.on(
            Method::Post,
            "/primary_ips",
            201,
            json!({"primary_ip": ip_json(None), "action": action_json(10, "success")}),
        );
        mock.on(
            Method::Post,
            "/primary_ips/1/actions/change_protection",
            201,
            json!({"action": action_json(11, "success")}),
        );

        let state = PrimaryIpResource
            .create(&mock.client(), &planned())
            .await
            .unwrap();
        assert_eq!(state["id"], "1");
        assert_eq!(state["delete_protection"], true);

        let create = &mock.requests_to(Method::Post, "/primary_ips")[0];
        let body = create.body.as_ref().unwrap();
        assert_eq!(body["location"], "fsn1");
        assert_eq!(body["assignee_type"], "server");
        assert!(body.get("assignee_id").is_none());
    }

    #[tokio::test]
    async fn test_update_reassigns() {
        let mock = MockTransport::new();
        mock.on(
            Method::Post,
            "/primary_ips/1/actions/unassign",
            201,
            json!({"action": action_json(1, "success")}),
        );
        mock.on(
            Method::Post,
            "/primary_ips/1/actions/assign",
            201,
            json!({"action": action_json(2, "success")}),
        );
        mock.on(Method::Get, "/primary_ips/1", 200, json!({"primary_ip": ip_json(Some(7))}));

        let ip: PrimaryIp = serde_json::from_value(ip_json(Some(5))).unwrap();
        let prior = encode(&PrimaryIpModel::from_api(&ip)).unwrap();
        let mut planned = prior.clone();
        planned["assignee_id"] = json!(7);

        let state = PrimaryIpResource
            .update(&mock.client(), &prior, &planned)
            .await
            .unwrap();
        assert_eq!(state["assignee_id"], 7);

        let paths: Vec<String> = mock.requests().iter().map(|r| r.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                "/primary_ips/1/actions/unassign",
                "/primary_ips/1/actions/assign",
                "/primary_ips/1"
            ]
        );
        let assign = &mock.requests()[1];
        assert_eq!(assign.body.as_ref().unwrap()["assignee_id"], 7);
    }

    #[tokio::test]
    async fn test_update_name_and_labels() {
        let mock = MockTransport::new();
        mock.on(Method::Put, "/primary_ips/1", 200, json!({"primary_ip": ip_json(None)}));
        mock.on(Method::Get, "/primary_ips/1", 200, json!({"primary_ip": ip_json(None)}));

        let prior = json!({"id": "1", "name": "old", "labels": {}, "auto_delete": false});
        let planned = json!({"id": "1", "name": "web-ip", "labels": {"env": "prod"}, "auto_delete": false});
        PrimaryIpResource
            .update(&mock.client(), &prior, &planned)
            .await
            .unwrap();

        let put = &mock.requests_to(Method::Put, "/primary_ips/1")[0];
        let body = put.body.as_ref().unwrap();
        assert_eq!(body["name"], "web-ip");
        assert_eq!(body["labels"]["env"], "prod");
        assert!(body.get("auto_delete").is_none());
    }

    #[tokio::test]
    async fn test_delete_unassigns_first() {
        let mock = MockTransport::new();
        mock.on(Method::Get, "/primary_ips/1", 200, json!({"primary_ip": ip_json(Some(5))}));
        mock.on(
            Method::Post,
            "/primary_ips/1/actions/unassign",
            201,
            json!({"action": action_json(1, "success")}),
        );
        mock.on(Method::Delete, "/primary_ips/1", 204, Value::Null);

        PrimaryIpResource
            .delete(&mock.client(), &json!({"id": "1"}))
            .await
            .unwrap();
        assert_eq!(mock.requests_to(Method::Delete, "/primary_ips/1").len(), 1);
        assert_eq!(
            mock.requests_to(Method::Post, "/primary_ips/1/actions/unassign").len(),
            1
        );
    }

    #[tokio::test]
    async fn test_read_missing_returns_none() {
        let mock = MockTransport::new();
        let state = PrimaryIpResource
            .read(&mock.client(), &json!({"id": "1"}))
            .await
            .unwrap();
        assert!(state.is_none());
    }

    #[tokio::test]
    async fn test_data_source_lookups() {
        let mock = MockTransport::new();
        mock.on(
            Method::Get,
            "/primary_ips",
            200,
            json!({"primary_ips": [ip_json(None), ip_json(Some(3))], "meta": {"pagination": {"next_page": null}}}),
        );
        let client = mock.client();

        let state = PrimaryIpDataSource
            .read(&client, &json!({"name": "web-ip"}))
            .await
            .unwrap();
        assert_eq!(state["id"], "1");
        assert!(mock.requests()[0]
            .query
            .contains(&("name".to_string(), "web-ip".to_string())));

        let err = PrimaryIpDataSource
            .read(&client, &json!({"with_selector": "env=prod"}))
            .await
            .unwrap_err();
        assert!(err.message().contains("more than one"));

        let err = PrimaryIpDataSource.read(&client, &json!({})).await.unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));

        let list = PrimaryIpListDataSource
            .read(&client, &json!({"with_selector": "env=prod"}))
            .await
            .unwrap();
        assert_eq!(list["primary_ips"].as_array().unwrap().len(), 2);
        assert_eq!(list["id"], "1-1");
    }
}
