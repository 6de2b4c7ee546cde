//! `hcloud_storage_box_subaccount` resource.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::{decode, encode, require, vanished, Resource};
use crate::error::ProviderError;
use crate::hcloud::{
    Client, StorageBoxSubaccount, StorageBoxSubaccountAccessSettings,
    StorageBoxSubaccountCreateOpts,
};
use crate::schema::{Attribute, Block, NestedBlock, Schema};
use crate::util::{experimental, id, labels};

pub const RESOURCE_TYPE: &str = "hcloud_storage_box_subaccount";

const ID_FORMAT: &str = "<storage_box_id>/<subaccount_id>";

/// State of a subaccount. `password` is carried over from the configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageBoxSubaccountModel {
    pub id: Option<String>,
    pub storage_box_id: Option<i64>,
    pub username: Option<String>,
    pub server: Option<String>,
    pub home_directory: Option<String>,
    pub password: Option<String>,
    pub access_settings: Option<StorageBoxSubaccountAccessSettings>,
    pub description: Option<String>,
    pub labels: Option<HashMap<String, String>>,
}

impl StorageBoxSubaccountModel {
    pub fn from_api(subaccount: &StorageBoxSubaccount, password: Option<String>) -> Self {
        Self {
            id: Some(id::join(&[
                id::format(subaccount.storage_box),
                id::format(subaccount.id),
            ])),
            storage_box_id: Some(subaccount.storage_box),
            username: Some(subaccount.username.clone()),
            server: Some(subaccount.server.clone()).filter(|s| !s.is_empty()),
            home_directory: Some(subaccount.home_directory.clone()),
            password,
            access_settings: Some(subaccount.access_settings),
            description: Some(subaccount.description.clone()).filter(|d| !d.is_empty()),
            labels: labels::from_api(&subaccount.labels),
        }
    }

    fn api_ids(&self) -> Result<(i64, i64), ProviderError> {
        id::parse_nested(&require(self.id.clone(), "id")?, ID_FORMAT)
    }
}

pub struct StorageBoxSubaccountResource;

#[async_trait]
impl Resource for StorageBoxSubaccountResource {
    fn type_name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A subaccount of a Storage Box, restricted to a home directory.")
            .with_attribute("id", Attribute::id())
            .with_attribute("storage_box_id", Attribute::required_int64().with_force_new())
            .with_attribute("username", Attribute::computed_string())
            .with_attribute("server", Attribute::computed_string())
            .with_attribute("home_directory", Attribute::required_string())
            .with_attribute("password", Attribute::required_string().sensitive())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute("labels", Attribute::labels())
            .with_block(
                "access_settings",
                NestedBlock::single(
                    Block::new()
                        .with_attribute("reachable_externally", Attribute::optional_bool())
                        .with_attribute("readonly", Attribute::optional_bool())
                        .with_attribute("samba_enabled", Attribute::optional_bool())
                        .with_attribute("ssh_enabled", Attribute::optional_bool())
                        .with_attribute("webdav_enabled", Attribute::optional_bool()),
                )
                .computed(),
            )
    }

    fn experimental(&self) -> Option<&'static str> {
        Some(experimental::STORAGE_BOX)
    }

    async fn create(&self, client: &Client, planned: &Value) -> Result<Value, ProviderError> {
        let model: StorageBoxSubaccountModel = decode(planned)?;
        let box_id = require(model.storage_box_id, "storage_box_id")?;
        let opts = StorageBoxSubaccountCreateOpts {
            home_directory: require(model.home_directory.clone(), "home_directory")?,
            password: require(model.password.clone(), "password")?,
            access_settings: model.access_settings.unwrap_or_default(),
            description: model.description.clone(),
            labels: labels::to_api(model.labels.as_ref()),
        };
        let subaccount = client.create_storage_box_subaccount(box_id, &opts).await?;
        info!(
            storage_box = box_id,
            id = subaccount.id,
            username = %subaccount.username,
            "Created Storage Box subaccount"
        );
        encode(&StorageBoxSubaccountModel::from_api(&subaccount, model.password))
    }

    async fn read(&self, client: &Client, state: &Value) -> Result<Option<Value>, ProviderError> {
        let model: StorageBoxSubaccountModel = decode(state)?;
        let (box_id, subaccount_id) = model.api_ids()?;
        match client
            .get_storage_box_subaccount(box_id, subaccount_id)
            .await?
        {
            Some(subaccount) => Ok(Some(encode(&StorageBoxSubaccountModel::from_api(
                &subaccount,
                model.password,
            ))?)),
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        client: &Client,
        prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError> {
        let prior: StorageBoxSubaccountModel = decode(prior)?;
        let planned: StorageBoxSubaccountModel = decode(planned)?;
        let (box_id, subaccount_id) = prior.api_ids()?;

        if planned.description != prior.description
            || labels::changed(prior.labels.as_ref(), planned.labels.as_ref())
        {
            client
                .update_storage_box_subaccount(
                    box_id,
                    subaccount_id,
                    planned.description.as_deref(),
                    &labels::to_api(planned.labels.as_ref()),
                )
                .await?;
        }
        if let Some(home) = planned
            .home_directory
            .as_deref()
            .filter(|h| Some(*h) != prior.home_directory.as_deref())
        {
            client
                .change_storage_box_subaccount_home_directory(box_id, subaccount_id, home)
                .await?;
        }
        if let Some(password) = planned
            .password
            .as_deref()
            .filter(|p| Some(*p) != prior.password.as_deref())
        {
            client
                .reset_storage_box_subaccount_password(box_id, subaccount_id, password)
                .await?;
        }
        if let Some(settings) = planned
            .access_settings
            .filter(|s| Some(*s) != prior.access_settings)
        {
            client
                .update_storage_box_subaccount_access_settings(box_id, subaccount_id, &settings)
                .await?;
        }

        info!(storage_box = box_id, id = subaccount_id, "Updated Storage Box subaccount");
        let subaccount = client
            .get_storage_box_subaccount(box_id, subaccount_id)
            .await?
            .ok_or_else(|| vanished("Storage Box subaccount", subaccount_id))?;
        encode(&StorageBoxSubaccountModel::from_api(&subaccount, planned.password))
    }

    async fn delete(&self, client: &Client, state: &Value) -> Result<(), ProviderError> {
        let model: StorageBoxSubaccountModel = decode(state)?;
        let (box_id, subaccount_id) = model.api_ids()?;
        match client
            .delete_storage_box_subaccount(box_id, subaccount_id)
            .await
        {
            Ok(()) => info!(storage_box = box_id, id = subaccount_id, "Deleted Storage Box subaccount"),
            Err(err) if err.is_not_found() => {},
            Err(err) => return Err(err.into()),
        }
        Ok(())
    }
}
