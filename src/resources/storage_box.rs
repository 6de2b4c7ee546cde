//! `hcloud_storage_box` resource and the `hcloud_storage_box` / `hcloud_storage_boxes` data sources.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::{decode, encode, require, vanished, DataSource, Resource};
use crate::error::ProviderError;
use crate::hcloud::{
    Client, StorageBox, StorageBoxAccessSettings, StorageBoxCreateOpts, StorageBoxSnapshotPlan,
};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Block, Diagnostic, NestedBlock, Schema};
use crate::util::{datasource, experimental, id, labels};
use crate::validation::validate_int_range;

pub const RESOURCE_TYPE: &str = "hcloud_storage_box";
pub const LIST_TYPE: &str = "hcloud_storage_boxes";

/// State of a Storage Box.
///
/// `password` and `ssh_keys` are never returned by the API; they are carried
/// over from the configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageBoxModel {
    pub id: Option<String>,
    pub name: Option<String>,
    pub storage_box_type: Option<String>,
    pub location: Option<String>,
    pub password: Option<String>,
    pub labels: Option<HashMap<String, String>>,
    pub ssh_keys: Option<Vec<String>>,
    pub access_settings: Option<StorageBoxAccessSettings>,
    pub snapshot_plan: Option<StorageBoxSnapshotPlan>,
    pub delete_protection: Option<bool>,
    pub username: Option<String>,
    pub server: Option<String>,
    pub system: Option<String>,
}

impl StorageBoxModel {
    pub fn from_api(storage_box: &StorageBox) -> Self {
        Self {
            id: Some(id::format(storage_box.id)),
            name: Some(storage_box.name.clone()),
            storage_box_type: Some(storage_box.storage_box_type.name.clone()),
            location: Some(storage_box.location.name.clone()),
            password: None,
            labels: labels::from_api(&storage_box.labels),
            ssh_keys: None,
            access_settings: Some(storage_box.access_settings),
            snapshot_plan: storage_box.snapshot_plan,
            delete_protection: Some(storage_box.protection.delete),
            username: storage_box.username.clone(),
            server: storage_box.server.clone(),
            system: storage_box.system.clone(),
        }
    }

    fn with_secrets_from(mut self, known: &StorageBoxModel) -> Self {
        self.password = known.password.clone();
        self.ssh_keys = known.ssh_keys.clone();
        self
    }

    fn api_id(&self) -> Result<i64, ProviderError> {
        id::parse(&require(self.id.clone(), "id")?, "Storage Box")
    }
}

fn access_settings_block() -> Block {
    Block::new()
        .with_attribute("reachable_externally", Attribute::optional_bool())
        .with_attribute("samba_enabled", Attribute::optional_bool())
        .with_attribute("ssh_enabled", Attribute::optional_bool())
        .with_attribute("webdav_enabled", Attribute::optional_bool())
        .with_attribute("zfs_enabled", Attribute::optional_bool())
}

fn snapshot_plan_block() -> Block {
    Block::new()
        .with_attribute("max_snapshots", Attribute::required_int64())
        .with_attribute("minute", Attribute::optional_int64())
        .with_attribute("hour", Attribute::optional_int64())
        .with_attribute("day_of_week", Attribute::optional_int64())
        .with_attribute("day_of_month", Attribute::optional_int64())
}

fn validate_snapshot_plan(plan: Option<&Value>) -> Vec<Diagnostic> {
    let Some(plan) = plan.filter(|p| p.is_object()) else {
        return Vec::new();
    };
    let field = |name: &str| plan.get(name);
    [
        validate_int_range(field("max_snapshots"), 1, i64::MAX, "snapshot_plan.max_snapshots"),
        validate_int_range(field("minute"), 0, 59, "snapshot_plan.minute"),
        validate_int_range(field("hour"), 0, 23, "snapshot_plan.hour"),
        validate_int_range(field("day_of_week"), 1, 7, "snapshot_plan.day_of_week"),
        validate_int_range(field("day_of_month"), 1, 31, "snapshot_plan.day_of_month"),
    ]
    .concat()
}

pub struct StorageBoxResource;

#[async_trait]
impl Resource for StorageBoxResource {
    fn type_name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A Storage Box.")
            .with_attribute("id", Attribute::id())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("storage_box_type", Attribute::required_string())
            .with_attribute("location", Attribute::required_string().with_force_new())
            .with_attribute(
                "password",
                Attribute::required_string()
                    .sensitive()
                    .with_description("Password of the main account. Changing it resets the password."),
            )
            .with_attribute("labels", Attribute::labels())
            .with_attribute(
                "ssh_keys",
                Attribute::new(AttributeType::list(AttributeType::String), AttributeFlags::optional())
                    .with_force_new(),
            )
            .with_attribute("delete_protection", Attribute::protection())
            .with_attribute("username", Attribute::computed_string())
            .with_attribute("server", Attribute::computed_string())
            .with_attribute("system", Attribute::computed_string())
            .with_block(
                "access_settings",
                NestedBlock::single(access_settings_block()).computed(),
            )
            .with_block("snapshot_plan", NestedBlock::single(snapshot_plan_block()))
    }

    fn experimental(&self) -> Option<&'static str> {
        Some(experimental::STORAGE_BOX)
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let mut diagnostics = super::validate_config(&self.schema(), config, self.experimental());
        diagnostics.extend(validate_snapshot_plan(config.get("snapshot_plan")));
        diagnostics
    }

    async fn create(&self, client: &Client, planned: &Value) -> Result<Value, ProviderError> {
        let model: StorageBoxModel = decode(planned)?;
        let opts = StorageBoxCreateOpts {
            name: require(model.name.clone(), "name")?,
            storage_box_type: require(model.storage_box_type.clone(), "storage_box_type")?,
            location: require(model.location.clone(), "location")?,
            password: require(model.password.clone(), "password")?,
            labels: labels::to_api(model.labels.as_ref()),
            ssh_keys: model.ssh_keys.clone().unwrap_or_default(),
            access_settings: model.access_settings,
        };

        let storage_box = client.create_storage_box(&opts).await?;
        let box_id = storage_box.id;
        info!(id = box_id, name = %storage_box.name, "Created Storage Box");

        let mut changed = false;
        if let Some(plan) = &model.snapshot_plan {
            client.enable_storage_box_snapshot_plan(box_id, plan).await?;
            changed = true;
        }
        if model.delete_protection == Some(true) {
            client.change_storage_box_protection(box_id, true).await?;
            changed = true;
        }

        let storage_box = if changed {
            client
                .get_storage_box(box_id)
                .await?
                .ok_or_else(|| vanished("Storage Box", box_id))?
        } else {
            storage_box
        };
        encode(&StorageBoxModel::from_api(&storage_box).with_secrets_from(&model))
    }

    async fn read(&self, client: &Client, state: &Value) -> Result<Option<Value>, ProviderError> {
        let model: StorageBoxModel = decode(state)?;
        match client.get_storage_box(model.api_id()?).await? {
            Some(storage_box) => Ok(Some(encode(
                &StorageBoxModel::from_api(&storage_box).with_secrets_from(&model),
            )?)),
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        client: &Client,
        prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError> {
        let prior: StorageBoxModel = decode(prior)?;
        let planned: StorageBoxModel = decode(planned)?;
        let box_id = prior.api_id()?;

        if planned.name != prior.name || labels::changed(prior.labels.as_ref(), planned.labels.as_ref()) {
            let name = require(planned.name.clone().or_else(|| prior.name.clone()), "name")?;
            let labels = labels::to_api(planned.labels.as_ref());
            client.update_storage_box(box_id, &name, &labels).await?;
        }
        if let Some(box_type) = planned
            .storage_box_type
            .as_deref()
            .filter(|t| Some(*t) != prior.storage_box_type.as_deref())
        {
            client.change_storage_box_type(box_id, box_type).await?;
        }
        if let Some(password) = planned
            .password
            .as_deref()
            .filter(|p| Some(*p) != prior.password.as_deref())
        {
            client.reset_storage_box_password(box_id, password).await?;
        }
        if let Some(settings) = planned
            .access_settings
            .filter(|s| Some(*s) != prior.access_settings)
        {
            client
                .update_storage_box_access_settings(box_id, &settings)
                .await?;
        }
        match (&planned.snapshot_plan, &prior.snapshot_plan) {
            (Some(plan), current) if Some(plan) != current.as_ref() => {
                client.enable_storage_box_snapshot_plan(box_id, plan).await?
            },
            (None, Some(_)) => client.disable_storage_box_snapshot_plan(box_id).await?,
            _ => {},
        }
        if let Some(protect) = planned
            .delete_protection
            .filter(|p| Some(*p) != prior.delete_protection)
        {
            client.change_storage_box_protection(box_id, protect).await?;
        }

        info!(id = box_id, "Updated Storage Box");
        let storage_box = client
            .get_storage_box(box_id)
            .await?
            .ok_or_else(|| vanished("Storage Box", box_id))?;
        encode(&StorageBoxModel::from_api(&storage_box).with_secrets_from(&planned))
    }

    async fn delete(&self, client: &Client, state: &Value) -> Result<(), ProviderError> {
        let model: StorageBoxModel = decode(state)?;
        let box_id = model.api_id()?;
        match client.delete_storage_box(box_id).await {
            Ok(()) => info!(id = box_id, "Deleted Storage Box"),
            Err(err) if err.is_not_found() => {},
            Err(err) => return Err(err.into()),
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StorageBoxLookup {
    id: Option<String>,
    name: Option<String>,
    with_selector: Option<String>,
}

/// Data source view of a Storage Box: no secrets.
fn public_state(storage_box: &StorageBox) -> Result<Value, ProviderError> {
    let mut state = encode(&StorageBoxModel::from_api(storage_box))?;
    if let Value::Object(map) = &mut state {
        map.remove("password");
        map.remove("ssh_keys");
    }
    Ok(state)
}

fn computed_block(block: Block) -> NestedBlock {
    let mut block = block;
    for attr in block.attributes.values_mut() {
        attr.flags = AttributeFlags::computed();
    }
    NestedBlock::single(block)
}

pub struct StorageBoxDataSource;

#[async_trait]
impl DataSource for StorageBoxDataSource {
    fn type_name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Look up a single Storage Box.")
            .with_attribute("id", Attribute::optional_computed_string())
            .with_attribute("name", Attribute::optional_computed_string())
            .with_attribute("with_selector", Attribute::optional_string())
            .with_attribute("storage_box_type", Attribute::computed_string())
            .with_attribute("location", Attribute::computed_string())
            .with_attribute(
                "labels",
                Attribute::new(AttributeType::map(AttributeType::String), AttributeFlags::computed()),
            )
            .with_attribute("delete_protection", Attribute::computed_bool())
            .with_attribute("username", Attribute::computed_string())
            .with_attribute("server", Attribute::computed_string())
            .with_attribute("system", Attribute::computed_string())
            .with_block("access_settings", computed_block(access_settings_block()))
            .with_block("snapshot_plan", computed_block(snapshot_plan_block()))
    }

    fn experimental(&self) -> Option<&'static str> {
        Some(experimental::STORAGE_BOX)
    }

    async fn read(&self, client: &Client, config: &Value) -> Result<Value, ProviderError> {
        experimental::log_once(experimental::STORAGE_BOX);
        let lookup: StorageBoxLookup = decode(config)?;

        let storage_box = if let Some(raw) = &lookup.id {
            client
                .get_storage_box(id::parse(raw, "Storage Box")?)
                .await?
                .ok_or_else(|| datasource::not_found("Storage Box", "id", raw))?
        } else if let Some(name) = &lookup.name {
            client
                .list_storage_boxes(Some(name), None)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| datasource::not_found("Storage Box", "name", name))?
        } else if let Some(selector) = &lookup.with_selector {
            let boxes = client.list_storage_boxes(None, Some(selector)).await?;
            datasource::one_result(boxes, "Storage Box", selector)?
        } else {
            return Err(ProviderError::Validation(
                "one of id, name or with_selector must be set".to_string(),
            ));
        };

        let mut state = public_state(&storage_box)?;
        state["with_selector"] = json!(lookup.with_selector);
        Ok(state)
    }
}

pub struct StorageBoxListDataSource;

#[async_trait]
impl DataSource for StorageBoxListDataSource {
    fn type_name(&self) -> &'static str {
        LIST_TYPE
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("List Storage Boxes, optionally filtered by label selector.")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("with_selector", Attribute::optional_string())
            .with_attribute(
                "storage_boxes",
                Attribute::new(
                    AttributeType::list(AttributeType::Dynamic),
                    AttributeFlags::computed(),
                ),
            )
    }

    fn experimental(&self) -> Option<&'static str> {
        Some(experimental::STORAGE_BOX)
    }

    async fn read(&self, client: &Client, config: &Value) -> Result<Value, ProviderError> {
        experimental::log_once(experimental::STORAGE_BOX);
        let selector = config.get("with_selector").and_then(Value::as_str);
        let boxes = client.list_storage_boxes(None, selector).await?;

        let states = boxes
            .iter()
            .map(public_state)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(json!({
            "id": datasource::list_id(boxes.iter().map(|b| b.id)),
            "with_selector": selector,
            "storage_boxes": states,
        }))
    }
}
