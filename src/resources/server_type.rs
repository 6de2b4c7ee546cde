//! `hcloud_server_type` and `hcloud_server_types` data sources.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::deprecation::{self, DeprecationModel};
use super::{decode, encode, DataSource};
use crate::error::ProviderError;
use crate::hcloud::{Client, ServerType, ServerTypeLocation};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema};
use crate::util::{datasource, id, merge};

pub const DATA_SOURCE_TYPE: &str = "hcloud_server_type";
pub const LIST_TYPE: &str = "hcloud_server_types";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerTypeLocationModel {
    pub id: i64,
    pub name: String,
    #[serde(flatten)]
    pub deprecation: DeprecationModel,
}

impl ServerTypeLocationModel {
    fn from_api(location: &ServerTypeLocation) -> Self {
        Self {
            id: location.id,
            name: location.name.clone(),
            deprecation: DeprecationModel::from_api(location.deprecation.as_ref()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerTypeModel {
    pub id: String,
    pub name: String,
    pub description: String,
    pub cores: i64,
    pub memory: f64,
    pub disk: i64,
    pub storage_type: String,
    pub cpu_type: String,
    pub architecture: String,
    pub category: Option<String>,
    pub locations: Vec<ServerTypeLocationModel>,
    #[serde(flatten)]
    pub deprecation: DeprecationModel,
}

impl ServerTypeModel {
    pub fn from_api(server_type: &ServerType) -> Self {
        Self {
            id: id::format(server_type.id),
            name: server_type.name.clone(),
            description: server_type.description.clone(),
            cores: server_type.cores,
            memory: server_type.memory,
            disk: server_type.disk,
            storage_type: server_type.storage_type.clone(),
            cpu_type: server_type.cpu_type.clone(),
            architecture: server_type.architecture.clone(),
            category: server_type.category.clone(),
            locations: server_type
                .locations
                .iter()
                .map(ServerTypeLocationModel::from_api)
                .collect(),
            deprecation: DeprecationModel::from_api(server_type.deprecation.as_ref()),
        }
    }
}

fn location_type() -> AttributeType {
    AttributeType::object([
        ("id", AttributeType::Int64),
        ("name", AttributeType::String),
        ("is_deprecated", AttributeType::Bool),
        ("deprecation_announced", AttributeType::String),
        ("unavailable_after", AttributeType::String),
    ])
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Lookup {
    id: Option<String>,
    name: Option<String>,
}

pub struct ServerTypeDataSource;

#[async_trait]
impl DataSource for ServerTypeDataSource {
    fn type_name(&self) -> &'static str {
        DATA_SOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        let schema = Schema::v0()
            .with_description("Look up a server type by ID or name.")
            .with_attribute("id", Attribute::optional_computed_string())
            .with_attribute("name", Attribute::optional_computed_string())
            .with_attribute("description", Attribute::computed_string())
            .with_attribute("cores", Attribute::computed_int64())
            .with_attribute(
                "memory",
                Attribute::computed_float64().with_description("Memory in GB."),
            )
            .with_attribute("disk", Attribute::computed_int64().with_description("Disk in GB."))
            .with_attribute("storage_type", Attribute::computed_string())
            .with_attribute("cpu_type", Attribute::computed_string())
            .with_attribute("architecture", Attribute::computed_string())
            .with_attribute("category", Attribute::computed_string())
            .with_attribute(
                "locations",
                Attribute::new(AttributeType::list(location_type()), AttributeFlags::computed()),
            );
        merge::into_schema(schema, deprecation::attributes())
    }

    async fn read(&self, client: &Client, config: &Value) -> Result<Value, ProviderError> {
        let lookup: Lookup = decode(config)?;
        let server_type = if let Some(raw) = &lookup.id {
            client
                .get_server_type(id::parse(raw, "server type")?)
                .await?
                .ok_or_else(|| datasource::not_found("Server type", "id", raw))?
        } else if let Some(name) = &lookup.name {
            client
                .list_server_types(Some(name))
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| datasource::not_found("Server type", "name", name))?
        } else {
            return Err(ProviderError::Validation(
                "one of id or name must be set".to_string(),
            ));
        };
        encode(&ServerTypeModel::from_api(&server_type))
    }
}

pub struct ServerTypeListDataSource;

#[async_trait]
impl DataSource for ServerTypeListDataSource {
    fn type_name(&self) -> &'static str {
        LIST_TYPE
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("List every server type.")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "names",
                Attribute::new(AttributeType::list(AttributeType::String), AttributeFlags::computed()),
            )
            .with_attribute(
                "server_types",
                Attribute::new(
                    AttributeType::list(AttributeType::Dynamic),
                    AttributeFlags::computed(),
                ),
            )
    }

    async fn read(&self, client: &Client, _config: &Value) -> Result<Value, ProviderError> {
        let server_types = client.list_server_types(None).await?;
        let models: Vec<ServerTypeModel> = server_types.iter().map(ServerTypeModel::from_api).collect();
        Ok(json!({
            "id": datasource::list_id(server_types.iter().map(|t| t.id)),
            "names": server_types.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            "server_types": encode(&models)?,
        }))
    }
}
