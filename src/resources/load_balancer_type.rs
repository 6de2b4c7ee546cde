//! `hcloud_load_balancer_type` and `hcloud_load_balancer_types` data sources.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::deprecation::{self, DeprecationModel};
use super::{decode, encode, DataSource};
use crate::error::ProviderError;
use crate::hcloud::{Client, LoadBalancerType};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema};
use crate::util::{datasource, id, merge};

pub const DATA_SOURCE_TYPE: &str = "hcloud_load_balancer_type";
pub const LIST_TYPE: &str = "hcloud_load_balancer_types";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerTypeModel {
    pub id: String,
    pub name: String,
    pub description: String,
    pub max_connections: i64,
    pub max_services: i64,
    pub max_targets: i64,
    pub max_assigned_certificates: i64,
    #[serde(flatten)]
    pub deprecation: DeprecationModel,
}

impl LoadBalancerTypeModel {
    pub fn from_api(lb_type: &LoadBalancerType) -> Self {
        Self {
            id: id::format(lb_type.id),
            name: lb_type.name.clone(),
            description: lb_type.description.clone(),
            max_connections: lb_type.max_connections,
            max_services: lb_type.max_services,
            max_targets: lb_type.max_targets,
            max_assigned_certificates: lb_type.max_assigned_certificates,
            deprecation: DeprecationModel::from_api(lb_type.deprecation.as_ref()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Lookup {
    id: Option<String>,
    name: Option<String>,
}

pub struct LoadBalancerTypeDataSource;

#[async_trait]
impl DataSource for LoadBalancerTypeDataSource {
    fn type_name(&self) -> &'static str {
        DATA_SOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        let schema = Schema::v0()
            .with_description("Look up a Load Balancer type by ID or name.")
            .with_attribute("id", Attribute::optional_computed_string())
            .with_attribute("name", Attribute::optional_computed_string())
            .with_attribute("description", Attribute::computed_string())
            .with_attribute("max_connections", Attribute::computed_int64())
            .with_attribute("max_services", Attribute::computed_int64())
            .with_attribute("max_targets", Attribute::computed_int64())
            .with_attribute("max_assigned_certificates", Attribute::computed_int64());
        merge::into_schema(schema, deprecation::attributes())
    }

    async fn read(&self, client: &Client, config: &Value) -> Result<Value, ProviderError> {
        let lookup: Lookup = decode(config)?;
        let lb_type = if let Some(raw) = &lookup.id {
            client
                .get_load_balancer_type(id::parse(raw, "Load Balancer type")?)
                .await?
                .ok_or_else(|| datasource::not_found("Load Balancer type", "id", raw))?
        } else if let Some(name) = &lookup.name {
            client
                .list_load_balancer_types(Some(name))
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| datasource::not_found("Load Balancer type", "name", name))?
        } else {
            return Err(ProviderError::Validation(
                "one of id or name must be set".to_string(),
            ));
        };
        encode(&LoadBalancerTypeModel::from_api(&lb_type))
    }
}

pub struct LoadBalancerTypeListDataSource;

#[async_trait]
impl DataSource for LoadBalancerTypeListDataSource {
    fn type_name(&self) -> &'static str {
        LIST_TYPE
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("List every Load Balancer type.")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "load_balancer_types",
                Attribute::new(
                    AttributeType::list(AttributeType::Dynamic),
                    AttributeFlags::computed(),
                ),
            )
    }

    async fn read(&self, client: &Client, _config: &Value) -> Result<Value, ProviderError> {
        let lb_types = client.list_load_balancer_types(None).await?;
        let models: Vec<LoadBalancerTypeModel> =
            lb_types.iter().map(LoadBalancerTypeModel::from_api).collect();
        Ok(json!({
            "id": datasource::list_id(lb_types.iter().map(|t| t.id)),
            "load_balancer_types": encode(&models)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hcloud::Method;
    use crate::testing::MockTransport;

    fn lb_type_json(id: i64, name: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "description": name.to_uppercase(),
            "max_connections": 10000,
            "max_services": 5,
            "max_targets": 25,
            "max_assigned_certificates": 10,
            "deprecated": null,
            "deprecation": null
        })
    }

    #[tokio::test]
    async fn test_read_by_id() {
        let mock = MockTransport::new();
        mock.on(
            Method::Get,
            "/load_balancer_types/1",
            200,
            json!({"load_balancer_type": lb_type_json(1, "lb11")}),
        );
        let state = LoadBalancerTypeDataSource
            .read(&mock.client(), &json!({"id": "1"}))
            .await
            .unwrap();
        assert_eq!(state["name"], "lb11");
        assert_eq!(state["max_targets"], 25);
        assert_eq!(state["is_deprecated"], false);
    }

    #[tokio::test]
    async fn test_list() {
        let mock = MockTransport::new();
        mock.on(
            Method::Get,
            "/load_balancer_types",
            200,
            json!({
                "load_balancer_types": [lb_type_json(1, "lb11"), lb_type_json(2, "lb21")],
                "meta": {"pagination": {"next_page": null}}
            }),
        );
        let list = LoadBalancerTypeListDataSource
            .read(&mock.client(), &json!({}))
            .await
            .unwrap();
        assert_eq!(list["id"], "1-2");
        assert_eq!(list["load_balancer_types"][1]["description"], "LB21");
    }
}
