//! Primary IPs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::action::{action_from_body, Action};
use super::common::{Datacenter, Location, Protection};
use super::error::Error;
use super::transport::{ApiRequest, Endpoint, Method};
use super::Client;

/// Reverse DNS entry of a Primary IP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryIpDnsPtr {
    /// IP address the entry applies to.
    pub ip: String,
    /// Hostname.
    pub dns_ptr: String,
}

/// A Primary IP as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryIp {
    pub id: i64,
    pub name: String,
    /// Address, or network for IPv6 (`2001:db8::/64`).
    pub ip: String,
    /// `ipv4` or `ipv6`.
    #[serde(rename = "type")]
    pub ip_type: String,
    #[serde(default)]
    pub assignee_id: Option<i64>,
    #[serde(default)]
    pub assignee_type: String,
    #[serde(default)]
    pub auto_delete: bool,
    #[serde(default)]
    pub blocked: bool,
    #[serde(default)]
    pub datacenter: Option<Datacenter>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub dns_ptr: Vec<PrimaryIpDnsPtr>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub protection: Protection,
    #[serde(default)]
    pub created: String,
}

impl PrimaryIp {
    /// The IPv6 network, or the IPv4 address itself.
    pub fn network(&self) -> &str {
        &self.ip
    }

    /// The single address of the IP: for IPv6 networks the `::1` address.
    pub fn address(&self) -> String {
        match self.ip.split_once('/') {
            Some((prefix, _)) if self.ip_type == "ipv6" => format!("{}1", prefix),
            Some((prefix, _)) => prefix.to_string(),
            None => self.ip.clone(),
        }
    }

    /// Location name, taken from the location or the datacenter.
    pub fn location_name(&self) -> Option<&str> {
        self.location
            .as_ref()
            .map(|l| l.name.as_str())
            .or_else(|| self.datacenter.as_ref().map(|d| d.location.name.as_str()))
    }
}

/// Body of `POST /primary_ips`.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct PrimaryIpCreateOpts {
    pub name: String,
    #[serde(rename = "type")]
    pub ip_type: String,
    pub assignee_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datacenter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub auto_delete: bool,
    pub labels: HashMap<String, String>,
}

/// Body of `PUT /primary_ips/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct PrimaryIpUpdateOpts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_delete: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Deserialize)]
struct PrimaryIpResponse {
    primary_ip: PrimaryIp,
}

impl Client {
    /// Get a Primary IP by ID. Returns `None` if it does not exist.
    pub async fn get_primary_ip(&self, id: i64) -> Result<Option<PrimaryIp>, Error> {
        match self
            .get::<PrimaryIpResponse>(Endpoint::Cloud, &format!("/primary_ips/{}", id))
            .await
        {
            Ok(response) => Ok(Some(response.primary_ip)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// List Primary IPs, optionally filtered.
    pub async fn list_primary_ips(
        &self,
        name: Option<&str>,
        ip: Option<&str>,
        label_selector: Option<&str>,
    ) -> Result<Vec<PrimaryIp>, Error> {
        let mut query = Vec::new();
        if let Some(name) = name {
            query.push(("name".to_string(), name.to_string()));
        }
        if let Some(ip) = ip {
            query.push(("ip".to_string(), ip.to_string()));
        }
        if let Some(selector) = label_selector {
            query.push(("label_selector".to_string(), selector.to_string()));
        }
        self.list_all(Endpoint::Cloud, "/primary_ips", &query, "primary_ips")
            .await
    }

    /// Create a Primary IP and wait for the creation action.
    pub async fn create_primary_ip(&self, opts: &PrimaryIpCreateOpts) -> Result<PrimaryIp, Error> {
        let body = self
            .send(
                ApiRequest::new(Method::Post, Endpoint::Cloud, "/primary_ips")
                    .with_body(serde_json::to_value(opts)?),
            )
            .await?;
        let action = action_from_body(&body)?;
        let response: PrimaryIpResponse = serde_json::from_value(body)?;
        self.settle_actions(Endpoint::Cloud, [action]).await?;
        Ok(response.primary_ip)
    }

    /// Update name, auto delete, or labels.
    pub async fn update_primary_ip(
        &self,
        id: i64,
        opts: &PrimaryIpUpdateOpts,
    ) -> Result<PrimaryIp, Error> {
        let response: PrimaryIpResponse = self
            .put(Endpoint::Cloud, &format!("/primary_ips/{}", id), opts)
            .await?;
        Ok(response.primary_ip)
    }

    /// Delete a Primary IP.
    pub async fn delete_primary_ip(&self, id: i64) -> Result<Option<Action>, Error> {
        let path = format!("/primary_ips/{}", id);
        self.retry_locked(|| self.delete(Endpoint::Cloud, &path))
            .await
    }

    /// Assign a Primary IP to a resource.
    pub async fn assign_primary_ip(
        &self,
        id: i64,
        assignee_id: i64,
        assignee_type: &str,
    ) -> Result<(), Error> {
        self.run_action(
            Endpoint::Cloud,
            &format!("/primary_ips/{}/actions/assign", id),
            json!({"assignee_id": assignee_id, "assignee_type": assignee_type}),
        )
        .await
    }

    /// Unassign a Primary IP.
    pub async fn unassign_primary_ip(&self, id: i64) -> Result<(), Error> {
        self.run_action(
            Endpoint::Cloud,
            &format!("/primary_ips/{}/actions/unassign", id),
            json!({}),
        )
        .await
    }

    /// Change delete protection.
    pub async fn change_primary_ip_protection(&self, id: i64, delete: bool) -> Result<(), Error> {
        self.run_action(
            Endpoint::Cloud,
            &format!("/primary_ips/{}/actions/change_protection", id),
            json!({ "delete": delete }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(ip: &str, ip_type: &str) -> PrimaryIp {
        serde_json::from_value(json!({"id": 1, "name": "ip", "ip": ip, "type": ip_type}))
            .unwrap()
    }

    #[test]
    fn test_address() {
        assert_eq!(ip("203.0.113.7", "ipv4").address(), "203.0.113.7");
        assert_eq!(ip("2001:db8::/64", "ipv6").address(), "2001:db8::1");
        assert_eq!(ip("2001:db8::/64", "ipv6").network(), "2001:db8::/64");
    }

    #[test]
    fn test_location_name_falls_back_to_datacenter() {
        let with_dc: PrimaryIp = serde_json::from_value(json!({
            "id": 1, "name": "ip", "ip": "203.0.113.7", "type": "ipv4",
            "datacenter": {"id": 4, "name": "fsn1-dc14", "location": {"id": 1, "name": "fsn1"}}
        }))
        .unwrap();
        assert_eq!(with_dc.location_name(), Some("fsn1"));
        assert_eq!(ip("203.0.113.7", "ipv4").location_name(), None);
    }

    #[test]
    fn test_create_opts_skip_absent_fields() {
        let opts = PrimaryIpCreateOpts {
            name: "web".to_string(),
            ip_type: "ipv4".to_string(),
            assignee_type: "server".to_string(),
            location: Some("fsn1".to_string()),
            ..Default::default()
        };
        let body = serde_json::to_value(&opts).unwrap();
        assert_eq!(body["type"], "ipv4");
        assert!(body.get("assignee_id").is_none());
        assert!(body.get("datacenter").is_none());
    }
}
