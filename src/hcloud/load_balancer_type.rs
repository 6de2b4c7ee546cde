//! Load Balancer types.

use serde::{Deserialize, Serialize};

use super::common::Deprecation;
use super::error::Error;
use super::transport::Endpoint;
use super::Client;

/// A Load Balancer type (for example `lb11`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerType {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub max_connections: i64,
    pub max_services: i64,
    pub max_targets: i64,
    pub max_assigned_certificates: i64,
    #[serde(default)]
    pub deprecated: Option<String>,
    #[serde(default)]
    pub deprecation: Option<Deprecation>,
}

#[derive(Deserialize)]
struct LoadBalancerTypeResponse {
    load_balancer_type: LoadBalancerType,
}

impl Client {
    /// Get a Load Balancer type by ID. Returns `None` if it does not exist.
    pub async fn get_load_balancer_type(&self, id: i64) -> Result<Option<LoadBalancerType>, Error> {
        match self
            .get::<LoadBalancerTypeResponse>(
                Endpoint::Cloud,
                &format!("/load_balancer_types/{}", id),
            )
            .await
        {
            Ok(response) => Ok(Some(response.load_balancer_type)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// List Load Balancer types, optionally filtered by name.
    pub async fn list_load_balancer_types(
        &self,
        name: Option<&str>,
    ) -> Result<Vec<LoadBalancerType>, Error> {
        let query: Vec<(String, String)> = name
            .map(|n| vec![("name".to_string(), n.to_string())])
            .unwrap_or_default();
        self.list_all(
            Endpoint::Cloud,
            "/load_balancer_types",
            &query,
            "load_balancer_types",
        )
        .await
    }
}
