//! DNS zones and their resource record sets.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::action::action_from_body;
use super::common::Protection;
use super::error::Error;
use super::transport::{ApiRequest, Endpoint, Method};
use super::Client;

/// Zone mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneMode {
    /// Records are managed through the API.
    Primary,
    /// Records are transferred from primary nameservers.
    Secondary,
}

impl ZoneMode {
    /// Wire name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }

    /// Parse a wire name.
    pub fn parse(mode: &str) -> Option<Self> {
        match mode {
            "primary" => Some(Self::Primary),
            "secondary" => Some(Self::Secondary),
            _ => None,
        }
    }
}

/// A primary nameserver of a secondary zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryNameserver {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tsig_algorithm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tsig_key: Option<String>,
}

/// Nameservers Hetzner assigned to a zone, and what the registry delegates to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthoritativeNameservers {
    #[serde(default)]
    pub assigned: Vec<String>,
    #[serde(default)]
    pub delegated: Vec<String>,
    #[serde(default)]
    pub delegation_status: Option<String>,
}

/// A DNS zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: i64,
    pub name: String,
    pub mode: ZoneMode,
    pub ttl: i64,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub protection: Protection,
    #[serde(default)]
    pub primary_nameservers: Vec<PrimaryNameserver>,
    #[serde(default)]
    pub authoritative_nameservers: AuthoritativeNameservers,
    #[serde(default)]
    pub registrar: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub record_count: i64,
    #[serde(default)]
    pub created: String,
}

/// Body of `POST /zones`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneCreateOpts {
    pub name: String,
    pub mode: ZoneMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
    pub labels: HashMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub primary_nameservers: Vec<PrimaryNameserver>,
}

/// A record inside an RRSet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRRSetRecord {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// RRSet protection flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RRSetProtection {
    #[serde(default)]
    pub change: bool,
}

/// A resource record set: all records of one name and type in a zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneRRSet {
    /// `<name>/<type>`.
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub rr_type: String,
    /// `None` means the zone default TTL applies.
    #[serde(default)]
    pub ttl: Option<i64>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub protection: RRSetProtection,
    #[serde(default)]
    pub records: Vec<ZoneRRSetRecord>,
    /// ID of the owning zone.
    pub zone: i64,
}

/// Body of `POST /zones/{zone}/rrsets`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneRRSetCreateOpts {
    pub name: String,
    #[serde(rename = "type")]
    pub rr_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
    pub labels: HashMap<String, String>,
    pub records: Vec<ZoneRRSetRecord>,
}

#[derive(Deserialize)]
struct ZoneResponse {
    zone: Zone,
}

#[derive(Deserialize)]
struct RRSetResponse {
    rrset: ZoneRRSet,
}

fn rrset_path(zone: &str, name: &str, rr_type: &str) -> String {
    format!("/zones/{}/rrsets/{}/{}", zone, name, rr_type)
}

impl Client {
    /// Get a zone by ID or name. Returns `None` if it does not exist.
    pub async fn get_zone(&self, id_or_name: &str) -> Result<Option<Zone>, Error> {
        match self
            .get::<ZoneResponse>(Endpoint::Cloud, &format!("/zones/{}", id_or_name))
            .await
        {
            Ok(response) => Ok(Some(response.zone)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// List zones, optionally filtered by label selector.
    pub async fn list_zones(&self, label_selector: Option<&str>) -> Result<Vec<Zone>, Error> {
        let query: Vec<(String, String)> = label_selector
            .map(|s| vec![("label_selector".to_string(), s.to_string())])
            .unwrap_or_default();
        self.list_all(Endpoint::Cloud, "/zones", &query, "zones")
            .await
    }

    /// Create a zone and wait for the creation action.
    pub async fn create_zone(&self, opts: &ZoneCreateOpts) -> Result<Zone, Error> {
        let body = self
            .send(
                ApiRequest::new(Method::Post, Endpoint::Cloud, "/zones")
                    .with_body(serde_json::to_value(opts)?),
            )
            .await?;
        let action = action_from_body(&body)?;
        let response: ZoneResponse = serde_json::from_value(body)?;
        self.settle_actions(Endpoint::Cloud, [action]).await?;
        Ok(response.zone)
    }

    /// Replace the labels of a zone.
    pub async fn update_zone_labels(
        &self,
        id: i64,
        labels: &HashMap<String, String>,
    ) -> Result<Zone, Error> {
        let response: ZoneResponse = self
            .put(
                Endpoint::Cloud,
                &format!("/zones/{}", id),
                &json!({ "labels": labels }),
            )
            .await?;
        Ok(response.zone)
    }

    /// Delete a zone and wait for the deletion action.
    pub async fn delete_zone(&self, id: i64) -> Result<(), Error> {
        let path = format!("/zones/{}", id);
        let action = self
            .retry_locked(|| self.delete(Endpoint::Cloud, &path))
            .await?;
        self.settle_actions(Endpoint::Cloud, [action]).await
    }

    /// Change the default TTL.
    pub async fn change_zone_ttl(&self, id: i64, ttl: i64) -> Result<(), Error> {
        self.run_action(
            Endpoint::Cloud,
            &format!("/zones/{}/actions/change_ttl", id),
            json!({ "ttl": ttl }),
        )
        .await
    }

    /// Change delete protection.
    pub async fn change_zone_protection(&self, id: i64, delete: bool) -> Result<(), Error> {
        self.run_action(
            Endpoint::Cloud,
            &format!("/zones/{}/actions/change_protection", id),
            json!({ "delete": delete }),
        )
        .await
    }

    /// Replace the primary nameservers of a secondary zone.
    pub async fn change_zone_primary_nameservers(
        &self,
        id: i64,
        nameservers: &[PrimaryNameserver],
    ) -> Result<(), Error> {
        self.run_action(
            Endpoint::Cloud,
            &format!("/zones/{}/actions/change_primary_nameservers", id),
            json!({ "primary_nameservers": nameservers }),
        )
        .await
    }

    /// Get an RRSet. Returns `None` if it does not exist.
    pub async fn get_zone_rrset(
        &self,
        zone: &str,
        name: &str,
        rr_type: &str,
    ) -> Result<Option<ZoneRRSet>, Error> {
        match self
            .get::<RRSetResponse>(Endpoint::Cloud, &rrset_path(zone, name, rr_type))
            .await
        {
            Ok(response) => Ok(Some(response.rrset)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Create an RRSet and wait for the creation action.
    pub async fn create_zone_rrset(
        &self,
        zone: &str,
        opts: &ZoneRRSetCreateOpts,
    ) -> Result<ZoneRRSet, Error> {
        let body = self
            .send(
                ApiRequest::new(Method::Post, Endpoint::Cloud, format!("/zones/{}/rrsets", zone))
                    .with_body(serde_json::to_value(opts)?),
            )
            .await?;
        let action = action_from_body(&body)?;
        let response: RRSetResponse = serde_json::from_value(body)?;
        self.settle_actions(Endpoint::Cloud, [action]).await?;
        Ok(response.rrset)
    }

    /// Replace the labels of an RRSet.
    pub async fn update_zone_rrset_labels(
        &self,
        zone: &str,
        name: &str,
        rr_type: &str,
        labels: &HashMap<String, String>,
    ) -> Result<ZoneRRSet, Error> {
        let response: RRSetResponse = self
            .put(
                Endpoint::Cloud,
                &rrset_path(zone, name, rr_type),
                &json!({ "labels": labels }),
            )
            .await?;
        Ok(response.rrset)
    }

    /// Delete an RRSet and wait for the deletion action.
    pub async fn delete_zone_rrset(&self, zone: &str, name: &str, rr_type: &str) -> Result<(), Error> {
        let path = rrset_path(zone, name, rr_type);
        let action = self
            .retry_locked(|| self.delete(Endpoint::Cloud, &path))
            .await?;
        self.settle_actions(Endpoint::Cloud, [action]).await
    }

    /// Change the TTL of an RRSet; `None` resets it to the zone default.
    pub async fn change_zone_rrset_ttl(
        &self,
        zone: &str,
        name: &str,
        rr_type: &str,
        ttl: Option<i64>,
    ) -> Result<(), Error> {
        self.run_action(
            Endpoint::Cloud,
            &format!("{}/actions/change_ttl", rrset_path(zone, name, rr_type)),
            json!({ "ttl": ttl }),
        )
        .await
    }

    /// Replace all records of an RRSet.
    pub async fn set_zone_rrset_records(
        &self,
        zone: &str,
        name: &str,
        rr_type: &str,
        records: &[ZoneRRSetRecord],
    ) -> Result<(), Error> {
        self.run_action(
            Endpoint::Cloud,
            &format!("{}/actions/set_records", rrset_path(zone, name, rr_type)),
            json!({ "records": records }),
        )
        .await
    }

    /// Change change protection of an RRSet.
    pub async fn change_zone_rrset_protection(
        &self,
        zone: &str,
        name: &str,
        rr_type: &str,
        change: bool,
    ) -> Result<(), Error> {
        self.run_action(
            Endpoint::Cloud,
            &format!("{}/actions/change_protection", rrset_path(zone, name, rr_type)),
            json!({ "change": change }),
        )
        .await
    }
}
