//! Server types.

use serde::{Deserialize, Serialize};

use super::common::Deprecation;
use super::error::Error;
use super::transport::Endpoint;
use super::Client;

/// Availability of a server type in one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerTypeLocation {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub deprecation: Option<Deprecation>,
}

/// A server type (for example `cx22`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerType {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub cores: i64,
    /// Memory in GB.
    pub memory: f64,
    /// Disk in GB.
    pub disk: i64,
    #[serde(default)]
    pub storage_type: String,
    #[serde(default)]
    pub cpu_type: String,
    #[serde(default)]
    pub architecture: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub deprecation: Option<Deprecation>,
    #[serde(default)]
    pub locations: Vec<ServerTypeLocation>,
}

#[derive(Deserialize)]
struct ServerTypeResponse {
    server_type: ServerType,
}

impl Client {
    /// Get a server type by ID. Returns `None` if it does not exist.
    pub async fn get_server_type(&self, id: i64) -> Result<Option<ServerType>, Error> {
        match self
            .get::<ServerTypeResponse>(Endpoint::Cloud, &format!("/server_types/{}", id))
            .await
        {
            Ok(response) => Ok(Some(response.server_type)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// List server types, optionally filtered by name.
    pub async fn list_server_types(&self, name: Option<&str>) -> Result<Vec<ServerType>, Error> {
        let query: Vec<(String, String)> = name
            .map(|n| vec![("name".to_string(), n.to_string())])
            .unwrap_or_default();
        self.list_all(Endpoint::Cloud, "/server_types", &query, "server_types")
            .await
    }
}
