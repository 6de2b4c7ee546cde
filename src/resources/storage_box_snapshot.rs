//! `hcloud_storage_box_snapshot` resource.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::{decode, encode, require, Resource};
use crate::error::ProviderError;
use crate::hcloud::{Client, StorageBoxSnapshot, StorageBoxSnapshotCreateOpts};
use crate::schema::{Attribute, Schema};
use crate::util::{experimental, id, labels};

pub const RESOURCE_TYPE: &str = "hcloud_storage_box_snapshot";

const ID_FORMAT: &str = "<storage_box_id>/<snapshot_id>";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageBoxSnapshotModel {
    pub id: Option<String>,
    pub storage_box_id: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub labels: Option<HashMap<String, String>>,
    pub is_automatic: Option<bool>,
}

impl StorageBoxSnapshotModel {
    pub fn from_api(snapshot: &StorageBoxSnapshot) -> Self {
        Self {
            id: Some(id::join(&[
                id::format(snapshot.storage_box),
                id::format(snapshot.id),
            ])),
            storage_box_id: Some(snapshot.storage_box),
            name: Some(snapshot.name.clone()),
            description: Some(snapshot.description.clone()).filter(|d| !d.is_empty()),
            labels: labels::from_api(&snapshot.labels),
            is_automatic: Some(snapshot.is_automatic),
        }
    }

    fn api_ids(&self) -> Result<(i64, i64), ProviderError> {
        id::parse_nested(&require(self.id.clone(), "id")?, ID_FORMAT)
    }
}

pub struct StorageBoxSnapshotResource;

#[async_trait]
impl Resource for StorageBoxSnapshotResource {
    fn type_name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A manual snapshot of a Storage Box.")
            .with_attribute("id", Attribute::id())
            .with_attribute("storage_box_id", Attribute::required_int64().with_force_new())
            .with_attribute("name", Attribute::computed_string())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute("labels", Attribute::labels())
            .with_attribute("is_automatic", Attribute::computed_bool())
    }

    fn experimental(&self) -> Option<&'static str> {
        Some(experimental::STORAGE_BOX)
    }

    async fn create(&self, client: &Client, planned: &Value) -> Result<Value, ProviderError> {
        let model: StorageBoxSnapshotModel = decode(planned)?;
        let box_id = require(model.storage_box_id, "storage_box_id")?;
        let opts = StorageBoxSnapshotCreateOpts {
            description: model.description.clone(),
            labels: labels::to_api(model.labels.as_ref()),
        };
        let snapshot = client.create_storage_box_snapshot(box_id, &opts).await?;
        info!(storage_box = box_id, id = snapshot.id, name = %snapshot.name, "Created Storage Box snapshot");
        encode(&StorageBoxSnapshotModel::from_api(&snapshot))
    }

    async fn read(&self, client: &Client, state: &Value) -> Result<Option<Value>, ProviderError> {
        let model: StorageBoxSnapshotModel = decode(state)?;
        let (box_id, snapshot_id) = model.api_ids()?;
        match client.get_storage_box_snapshot(box_id, snapshot_id).await? {
            Some(snapshot) => Ok(Some(encode(&StorageBoxSnapshotModel::from_api(&snapshot))?)),
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        client: &Client,
        prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError> {
        let prior: StorageBoxSnapshotModel = decode(prior)?;
        let planned: StorageBoxSnapshotModel = decode(planned)?;
        let (box_id, snapshot_id) = prior.api_ids()?;

        let snapshot = client
            .update_storage_box_snapshot(
                box_id,
                snapshot_id,
                planned.description.as_deref(),
                &labels::to_api(planned.labels.as_ref()),
            )
            .await?;
        info!(storage_box = box_id, id = snapshot_id, "Updated Storage Box snapshot");
        encode(&StorageBoxSnapshotModel::from_api(&snapshot))
    }

    async fn delete(&self, client: &Client, state: &Value) -> Result<(), ProviderError> {
        let model: StorageBoxSnapshotModel = decode(state)?;
        let (box_id, snapshot_id) = model.api_ids()?;
        match client.delete_storage_box_snapshot(box_id, snapshot_id).await {
            Ok(()) => info!(storage_box = box_id, id = snapshot_id, "Deleted Storage Box snapshot"),
            Err(err) if err.is_not_found() => {},
            Err(err) => return Err(err.into()),
        }
        Ok(())
    }
}
