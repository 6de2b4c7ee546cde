//! ISO images that can be attached to servers.

use serde::{Deserialize, Serialize};

use super::common::Deprecation;
use super::error::Error;
use super::transport::Endpoint;
use super::Client;

/// An ISO image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Iso {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// `public` or `private`.
    #[serde(rename = "type")]
    pub iso_type: String,
    /// `None` means the ISO works on every architecture.
    #[serde(default)]
    pub architecture: Option<String>,
    #[serde(default)]
    pub deprecation: Option<Deprecation>,
}

#[derive(Deserialize)]
struct IsoResponse {
    iso: Iso,
}

impl Client {
    /// Get an ISO by ID. Returns `None` if it does not exist.
    pub async fn get_iso(&self, id: i64) -> Result<Option<Iso>, Error> {
        match self
            .get::<IsoResponse>(Endpoint::Cloud, &format!("/isos/{}", id))
            .await
        {
            Ok(response) => Ok(Some(response.iso)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// List ISOs.
    ///
    /// `architecture` restricts results to that architecture; with
    /// `include_architecture_wildcard` ISOs without an architecture are kept too.
    pub async fn list_isos(
        &self,
        name: Option<&str>,
        architecture: Option<&str>,
        include_architecture_wildcard: bool,
    ) -> Result<Vec<Iso>, Error> {
        let mut query = Vec::new();
        if let Some(name) = name {
            query.push(("name".to_string(), name.to_string()));
        }
        if let Some(architecture) = architecture {
            query.push(("architecture".to_string(), architecture.to_string()));
            if include_architecture_wildcard {
                query.push((
                    "include_architecture_wildcard".to_string(),
                    "true".to_string(),
                ));
            }
        }
        self.list_all(Endpoint::Cloud, "/isos", &query, "isos").await
    }
}
