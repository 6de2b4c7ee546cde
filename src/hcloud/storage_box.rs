//! Storage Boxes, their snapshots and subaccounts.
//!
//! These live on the Hetzner API (`api.hetzner.com`), not the Cloud API.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::action::action_from_body;
use super::common::{Location, Protection};
use super::error::Error;
use super::transport::{ApiRequest, Endpoint, Method};
use super::Client;

const ENDPOINT: Endpoint = Endpoint::Hetzner;

/// Product type of a Storage Box (for example `bx11`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StorageBoxType {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub snapshot_limit: Option<i64>,
    #[serde(default)]
    pub subaccounts_limit: Option<i64>,
}

/// Which protocols may reach a Storage Box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StorageBoxAccessSettings {
    #[serde(default)]
    pub reachable_externally: bool,
    #[serde(default)]
    pub samba_enabled: bool,
    #[serde(default)]
    pub ssh_enabled: bool,
    #[serde(default)]
    pub webdav_enabled: bool,
    #[serde(default)]
    pub zfs_enabled: bool,
}

/// Automatic snapshot schedule. `None` fields mean "every".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StorageBoxSnapshotPlan {
    pub max_snapshots: i64,
    #[serde(default)]
    pub minute: Option<i64>,
    #[serde(default)]
    pub hour: Option<i64>,
    #[serde(default)]
    pub day_of_week: Option<i64>,
    #[serde(default)]
    pub day_of_month: Option<i64>,
}

/// Disk usage in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StorageBoxStats {
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub size_data: i64,
    #[serde(default)]
    pub size_snapshots: i64,
}

/// A Storage Box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageBox {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub status: String,
    pub location: Location,
    pub storage_box_type: StorageBoxType,
    #[serde(default)]
    pub access_settings: StorageBoxAccessSettings,
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub protection: Protection,
    #[serde(default)]
    pub snapshot_plan: Option<StorageBoxSnapshotPlan>,
    #[serde(default)]
    pub stats: StorageBoxStats,
    #[serde(default)]
    pub created: String,
}

/// Body of `POST /storage_boxes`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageBoxCreateOpts {
    pub name: String,
    pub storage_box_type: String,
    pub location: String,
    pub password: String,
    pub labels: HashMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ssh_keys: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_settings: Option<StorageBoxAccessSettings>,
}

/// A snapshot of a Storage Box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageBoxSnapshot {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_automatic: bool,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub stats: Value,
    #[serde(default)]
    pub created: String,
    pub storage_box: i64,
}

/// Body of `POST /storage_boxes/{id}/snapshots`.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct StorageBoxSnapshotCreateOpts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub labels: HashMap<String, String>,
}

/// Access settings of a subaccount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StorageBoxSubaccountAccessSettings {
    #[serde(default)]
    pub reachable_externally: bool,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default)]
    pub samba_enabled: bool,
    #[serde(default)]
    pub ssh_enabled: bool,
    #[serde(default)]
    pub webdav_enabled: bool,
}

/// A subaccount of a Storage Box, restricted to a home directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageBoxSubaccount {
    pub id: i64,
    pub username: String,
    pub home_directory: String,
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub access_settings: StorageBoxSubaccountAccessSettings,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub created: String,
    pub storage_box: i64,
}

/// Body of `POST /storage_boxes/{id}/subaccounts`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageBoxSubaccountCreateOpts {
    pub home_directory: String,
    pub password: String,
    pub access_settings: StorageBoxSubaccountAccessSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub labels: HashMap<String, String>,
}

#[derive(Deserialize)]
struct StorageBoxResponse {
    storage_box: StorageBox,
}

#[derive(Deserialize)]
struct SnapshotResponse {
    snapshot: StorageBoxSnapshot,
}

#[derive(Deserialize)]
struct SubaccountResponse {
    subaccount: StorageBoxSubaccount,
}

fn box_path(id: i64) -> String {
    format!("/storage_boxes/{}", id)
}

fn snapshot_path(storage_box: i64, id: i64) -> String {
    format!("/storage_boxes/{}/snapshots/{}", storage_box, id)
}

fn subaccount_path(storage_box: i64, id: i64) -> String {
    format!("/storage_boxes/{}/subaccounts/{}", storage_box, id)
}

impl Client {
    // =========================================================================
    // Storage Boxes
    // =========================================================================

    /// Get a Storage Box. Returns `None` if it does not exist.
    pub async fn get_storage_box(&self, id: i64) -> Result<Option<StorageBox>, Error> {
        match self.get::<StorageBoxResponse>(ENDPOINT, &box_path(id)).await {
            Ok(response) => Ok(Some(response.storage_box)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// List Storage Boxes, optionally filtered.
    pub async fn list_storage_boxes(
        &self,
        name: Option<&str>,
        label_selector: Option<&str>,
    ) -> Result<Vec<StorageBox>, Error> {
        let mut query = Vec::new();
        if let Some(name) = name {
            query.push(("name".to_string(), name.to_string()));
        }
        if let Some(selector) = label_selector {
            query.push(("label_selector".to_string(), selector.to_string()));
        }
        self.list_all(ENDPOINT, "/storage_boxes", &query, "storage_boxes")
            .await
    }

    /// Create a Storage Box and wait until it is provisioned.
    pub async fn create_storage_box(&self, opts: &StorageBoxCreateOpts) -> Result<StorageBox, Error> {
        let body = self
            .send(
                ApiRequest::new(Method::Post, ENDPOINT, "/storage_boxes")
                    .with_body(serde_json::to_value(opts)?),
            )
            .await?;
        let action = action_from_body(&body)?;
        let response: StorageBoxResponse = serde_json::from_value(body)?;
        self.settle_actions(ENDPOINT, [action]).await?;
        Ok(response.storage_box)
    }

    /// Update name and labels.
    pub async fn update_storage_box(
        &self,
        id: i64,
        name: &str,
        labels: &HashMap<String, String>,
    ) -> Result<StorageBox, Error> {
        let response: StorageBoxResponse = self
            .put(
                ENDPOINT,
                &box_path(id),
                &json!({ "name": name, "labels": labels }),
            )
            .await?;
        Ok(response.storage_box)
    }

    /// Delete a Storage Box and wait for the deletion action.
    pub async fn delete_storage_box(&self, id: i64) -> Result<(), Error> {
        let path = box_path(id);
        let action = self.retry_locked(|| self.delete(ENDPOINT, &path)).await?;
        self.settle_actions(ENDPOINT, [action]).await
    }

    /// Change delete protection.
    pub async fn change_storage_box_protection(&self, id: i64, delete: bool) -> Result<(), Error> {
        self.run_action(
            ENDPOINT,
            &format!("{}/actions/change_protection", box_path(id)),
            json!({ "delete": delete }),
        )
        .await
    }

    /// Change the product type.
    pub async fn change_storage_box_type(&self, id: i64, storage_box_type: &str) -> Result<(), Error> {
        self.run_action(
            ENDPOINT,
            &format!("{}/actions/change_type", box_path(id)),
            json!({ "storage_box_type": storage_box_type }),
        )
        .await
    }

    /// Reset the password.
    pub async fn reset_storage_box_password(&self, id: i64, password: &str) -> Result<(), Error> {
        self.run_action(
            ENDPOINT,
            &format!("{}/actions/reset_password", box_path(id)),
            json!({ "password": password }),
        )
        .await
    }

    /// Replace the access settings.
    pub async fn update_storage_box_access_settings(
        &self,
        id: i64,
        settings: &StorageBoxAccessSettings,
    ) -> Result<(), Error> {
        self.run_action(
            ENDPOINT,
            &format!("{}/actions/update_access_settings", box_path(id)),
            serde_json::to_value(settings)?,
        )
        .await
    }

    /// Enable (or replace) the automatic snapshot plan.
    pub async fn enable_storage_box_snapshot_plan(
        &self,
        id: i64,
        plan: &StorageBoxSnapshotPlan,
    ) -> Result<(), Error> {
        self.run_action(
            ENDPOINT,
            &format!("{}/actions/enable_snapshot_plan", box_path(id)),
            serde_json::to_value(plan)?,
        )
        .await
    }

    /// Disable the automatic snapshot plan.
    pub async fn disable_storage_box_snapshot_plan(&self, id: i64) -> Result<(), Error> {
        self.run_action(
            ENDPOINT,
            &format!("{}/actions/disable_snapshot_plan", box_path(id)),
            json!({}),
        )
        .await
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Get a snapshot. Returns `None` if it does not exist.
    pub async fn get_storage_box_snapshot(
        &self,
        storage_box: i64,
        id: i64,
    ) -> Result<Option<StorageBoxSnapshot>, Error> {
        match self
            .get::<SnapshotResponse>(ENDPOINT, &snapshot_path(storage_box, id))
            .await
        {
            Ok(response) => Ok(Some(response.snapshot)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Create a snapshot and wait until it is taken.
    pub async fn create_storage_box_snapshot(
        &self,
        storage_box: i64,
        opts: &StorageBoxSnapshotCreateOpts,
    ) -> Result<StorageBoxSnapshot, Error> {
        let body = self
            .send(
                ApiRequest::new(
                    Method::Post,
                    ENDPOINT,
                    format!("{}/snapshots", box_path(storage_box)),
                )
                .with_body(serde_json::to_value(opts)?),
            )
            .await?;
        let action = action_from_body(&body)?;
        let response: SnapshotResponse = serde_json::from_value(body)?;
        self.settle_actions(ENDPOINT, [action]).await?;
        Ok(response.snapshot)
    }

    /// Update description and labels.
    pub async fn update_storage_box_snapshot(
        &self,
        storage_box: i64,
        id: i64,
        description: Option<&str>,
        labels: &HashMap<String, String>,
    ) -> Result<StorageBoxSnapshot, Error> {
        let response: SnapshotResponse = self
            .put(
                ENDPOINT,
                &snapshot_path(storage_box, id),
                &json!({ "description": description, "labels": labels }),
            )
            .await?;
        Ok(response.snapshot)
    }

    /// Delete a snapshot and wait for the deletion action.
    pub async fn delete_storage_box_snapshot(&self, storage_box: i64, id: i64) -> Result<(), Error> {
        let path = snapshot_path(storage_box, id);
        let action = self.retry_locked(|| self.delete(ENDPOINT, &path)).await?;
        self.settle_actions(ENDPOINT, [action]).await
    }

    // =========================================================================
    // Subaccounts
    // =========================================================================

    /// Get a subaccount. Returns `None` if it does not exist.
    pub async fn get_storage_box_subaccount(
        &self,
        storage_box: i64,
        id: i64,
    ) -> Result<Option<StorageBoxSubaccount>, Error> {
        match self
            .get::<SubaccountResponse>(ENDPOINT, &subaccount_path(storage_box, id))
            .await
        {
            Ok(response) => Ok(Some(response.subaccount)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Create a subaccount and wait until it is ready.
    pub async fn create_storage_box_subaccount(
        &self,
        storage_box: i64,
        opts: &StorageBoxSubaccountCreateOpts,
    ) -> Result<StorageBoxSubaccount, Error> {
        let body = self
            .send(
                ApiRequest::new(
                    Method::Post,
                    ENDPOINT,
                    format!("{}/subaccounts", box_path(storage_box)),
                )
                .with_body(serde_json::to_value(opts)?),
            )
            .await?;
        let action = action_from_body(&body)?;
        let response: SubaccountResponse = serde_json::from_value(body)?;
        self.settle_actions(ENDPOINT, [action]).await?;
        Ok(response.subaccount)
    }

    /// Update description and labels.
    pub async fn update_storage_box_subaccount(
        &self,
        storage_box: i64,
        id: i64,
        description: Option<&str>,
        labels: &HashMap<String, String>,
    ) -> Result<StorageBoxSubaccount, Error> {
        let response: SubaccountResponse = self
            .put(
                ENDPOINT,
                &subaccount_path(storage_box, id),
                &json!({ "description": description, "labels": labels }),
            )
            .await?;
        Ok(response.subaccount)
    }

    /// Delete a subaccount and wait for the deletion action.
    pub async fn delete_storage_box_subaccount(&self, storage_box: i64, id: i64) -> Result<(), Error> {
        let path = subaccount_path(storage_box, id);
        let action = self.retry_locked(|| self.delete(ENDPOINT, &path)).await?;
        self.settle_actions(ENDPOINT, [action]).await
    }

    /// Change the home directory of a subaccount.
    pub async fn change_storage_box_subaccount_home_directory(
        &self,
        storage_box: i64,
        id: i64,
        home_directory: &str,
    ) -> Result<(), Error> {
        self.run_action(
            ENDPOINT,
            &format!(
                "{}/actions/change_home_directory",
                subaccount_path(storage_box, id)
            ),
            json!({ "home_directory": home_directory }),
        )
        .await
    }

    /// Reset the password of a subaccount.
    pub async fn reset_storage_box_subaccount_password(
        &self,
        storage_box: i64,
        id: i64,
        password: &str,
    ) -> Result<(), Error> {
        self.run_action(
            ENDPOINT,
            &format!(
                "{}/actions/reset_subaccount_password",
                subaccount_path(storage_box, id)
            ),
            json!({ "password": password }),
        )
        .await
    }

    /// Replace the access settings of a subaccount.
    pub async fn update_storage_box_subaccount_access_settings(
        &self,
        storage_box: i64,
        id: i64,
        settings: &StorageBoxSubaccountAccessSettings,
    ) -> Result<(), Error> {
        self.run_action(
            ENDPOINT,
            &format!(
                "{}/actions/update_access_settings",
                subaccount_path(storage_box, id)
            ),
            serde_json::to_value(settings)?,
        )
        .await
    }
}
