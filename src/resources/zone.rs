//! `hcloud_zone` resource and the `hcloud_zone` / `hcloud_zones` data sources.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::{decode, encode, require, vanished, DataSource, Resource};
use crate::error::ProviderError;
use crate::hcloud::{Client, PrimaryNameserver, Zone, ZoneCreateOpts, ZoneMode};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Block, Diagnostic, NestedBlock, Schema};
use crate::util::{datasource, experimental, id, labels};
use crate::validation::{validate_int_range, validate_one_of};

pub const RESOURCE_TYPE: &str = "hcloud_zone";
pub const LIST_TYPE: &str = "hcloud_zones";

const MODES: [&str; 2] = ["primary", "secondary"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthoritativeNameserversModel {
    pub assigned: Vec<String>,
    pub delegated: Vec<String>,
    pub delegation_status: Option<String>,
}

/// State of a zone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneModel {
    pub id: Option<String>,
    pub name: Option<String>,
    pub mode: Option<String>,
    pub ttl: Option<i64>,
    pub labels: Option<HashMap<String, String>>,
    pub delete_protection: Option<bool>,
    pub primary_nameservers: Option<Vec<PrimaryNameserver>>,
    pub authoritative_nameservers: Option<AuthoritativeNameserversModel>,
    pub registrar: Option<String>,
    pub status: Option<String>,
}

impl ZoneModel {
    pub fn from_api(zone: &Zone) -> Self {
        let authoritative = &zone.authoritative_nameservers;
        Self {
            id: Some(id::format(zone.id)),
            name: Some(zone.name.clone()),
            mode: Some(zone.mode.as_str().to_string()),
            ttl: Some(zone.ttl),
            labels: labels::from_api(&zone.labels),
            delete_protection: Some(zone.protection.delete),
            primary_nameservers: (!zone.primary_nameservers.is_empty())
                .then(|| zone.primary_nameservers.clone()),
            authoritative_nameservers: Some(AuthoritativeNameserversModel {
                assigned: authoritative.assigned.clone(),
                delegated: authoritative.delegated.clone(),
                delegation_status: authoritative.delegation_status.clone(),
            }),
            registrar: Some(zone.registrar.clone()).filter(|r| !r.is_empty()),
            status: Some(zone.status.clone()).filter(|s| !s.is_empty()),
        }
    }

    /// The API never returns TSIG keys; keep the ones known from `other`.
    fn keep_tsig_keys(mut self, other: &ZoneModel) -> Self {
        let known = other.primary_nameservers.as_deref().unwrap_or_default();
        for ns in self.primary_nameservers.iter_mut().flatten() {
            if ns.tsig_key.is_none() {
                ns.tsig_key = known
                    .iter()
                    .find(|k| k.address == ns.address)
                    .and_then(|k| k.tsig_key.clone());
            }
        }
        self
    }

    fn api_id(&self) -> Result<i64, ProviderError> {
        id::parse(&require(self.id.clone(), "id")?, "zone")
    }
}

fn primary_nameservers_block(computed: bool) -> NestedBlock {
    let flags = |attr: Attribute| {
        if computed {
            Attribute::new(attr.attr_type, AttributeFlags::computed())
        } else {
            attr
        }
    };
    NestedBlock::list(
        Block::new()
            .with_attribute("address", flags(Attribute::required_string()))
            .with_attribute("port", flags(Attribute::optional_int64()))
            .with_attribute("tsig_algorithm", flags(Attribute::optional_string()))
            .with_attribute("tsig_key", flags(Attribute::optional_string().sensitive())),
    )
}

fn authoritative_nameservers() -> Attribute {
    Attribute::new(
        AttributeType::object([
            ("assigned", AttributeType::list(AttributeType::String)),
            ("delegated", AttributeType::list(AttributeType::String)),
            ("delegation_status", AttributeType::String),
        ]),
        AttributeFlags::computed(),
    )
}

pub struct ZoneResource;

#[async_trait]
impl Resource for ZoneResource {
    fn type_name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A DNS zone.")
            .with_attribute("id", Attribute::id())
            .with_attribute("name", Attribute::required_string().with_force_new())
            .with_attribute(
                "mode",
                Attribute::required_string()
                    .with_force_new()
                    .with_description("Either `primary` or `secondary`."),
            )
            .with_attribute("ttl", Attribute::optional_computed_int64())
            .with_attribute("labels", Attribute::labels())
            .with_attribute("delete_protection", Attribute::protection())
            .with_attribute("authoritative_nameservers", authoritative_nameservers())
            .with_attribute("registrar", Attribute::computed_string())
            .with_attribute("status", Attribute::computed_string())
            .with_block("primary_nameservers", primary_nameservers_block(false))
    }

    fn experimental(&self) -> Option<&'static str> {
        Some(experimental::DNS)
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let mut diagnostics = super::validate_config(&self.schema(), config, self.experimental());
        diagnostics.extend(validate_one_of(config.get("mode"), &MODES, "mode"));
        diagnostics.extend(validate_int_range(config.get("ttl"), 60, 2_147_483_647, "ttl"));

        let has_nameservers = config
            .get("primary_nameservers")
            .and_then(Value::as_array)
            .is_some_and(|ns| !ns.is_empty());
        match config.get("mode").and_then(Value::as_str) {
            Some("secondary") if !has_nameservers => diagnostics.push(
                Diagnostic::error("Missing primary nameservers")
                    .with_detail("Secondary zones need at least one primary nameserver.")
                    .with_attribute("primary_nameservers"),
            ),
            Some("primary") if has_nameservers => diagnostics.push(
                Diagnostic::error("Unexpected primary nameservers")
                    .with_detail("Primary nameservers can only be set on secondary zones.")
                    .with_attribute("primary_nameservers"),
            ),
            _ => {},
        }
        diagnostics
    }

    async fn create(&self, client: &Client, planned: &Value) -> Result<Value, ProviderError> {
        let model: ZoneModel = decode(planned)?;
        let mode = require(model.mode.as_deref(), "mode")?;
        let opts = ZoneCreateOpts {
            name: require(model.name.clone(), "name")?,
            mode: ZoneMode::parse(mode)
                .ok_or_else(|| ProviderError::Validation(format!("invalid zone mode '{}'", mode)))?,
            ttl: model.ttl,
            labels: labels::to_api(model.labels.as_ref()),
            primary_nameservers: model.primary_nameservers.clone().unwrap_or_default(),
        };

        let mut zone = client.create_zone(&opts).await?;
        info!(id = zone.id, name = %zone.name, "Created zone");

        if model.delete_protection == Some(true) {
            client.change_zone_protection(zone.id, true).await?;
            zone.protection.delete = true;
        }
        encode(&ZoneModel::from_api(&zone).keep_tsig_keys(&model))
    }

    async fn read(&self, client: &Client, state: &Value) -> Result<Option<Value>, ProviderError> {
        let model: ZoneModel = decode(state)?;
        // Accepts a name too, which is how zones are imported by name.
        let key = require(model.id.clone(), "id")?;
        match client.get_zone(&key).await? {
            Some(zone) => Ok(Some(encode(&ZoneModel::from_api(&zone).keep_tsig_keys(&model))?)),
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        client: &Client,
        prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError> {
        let prior: ZoneModel = decode(prior)?;
        let planned: ZoneModel = decode(planned)?;
        let zone_id = prior.api_id()?;

        if labels::changed(prior.labels.as_ref(), planned.labels.as_ref()) {
            client
                .update_zone_labels(zone_id, &labels::to_api(planned.labels.as_ref()))
                .await?;
        }
        if let Some(ttl) = planned.ttl.filter(|ttl| Some(*ttl) != prior.ttl) {
            client.change_zone_ttl(zone_id, ttl).await?;
        }
        if planned.primary_nameservers != prior.primary_nameservers {
            client
                .change_zone_primary_nameservers(
                    zone_id,
                    planned.primary_nameservers.as_deref().unwrap_or_default(),
                )
                .await?;
        }
        if let Some(protect) = planned
            .delete_protection
            .filter(|p| Some(*p) != prior.delete_protection)
        {
            client.change_zone_protection(zone_id, protect).await?;
        }

        info!(id = zone_id, "Updated zone");
        let zone = client
            .get_zone(&id::format(zone_id))
            .await?
            .ok_or_else(|| vanished("Zone", zone_id))?;
        encode(&ZoneModel::from_api(&zone).keep_tsig_keys(&planned))
    }

    async fn delete(&self, client: &Client, state: &Value) -> Result<(), ProviderError> {
        let model: ZoneModel = decode(state)?;
        let zone_id = model.api_id()?;
        match client.delete_zone(zone_id).await {
            Ok(()) => info!(id = zone_id, "Deleted zone"),
            Err(err) if err.is_not_found() => {},
            Err(err) => return Err(err.into()),
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ZoneLookup {
    id: Option<String>,
    name: Option<String>,
    with_selector: Option<String>,
}

fn data_source_schema() -> Schema {
    let computed = |attr_type| Attribute::new(attr_type, AttributeFlags::computed());
    Schema::v0()
        .with_attribute("id", Attribute::optional_computed_string())
        .with_attribute("name", Attribute::optional_computed_string())
        .with_attribute("with_selector", Attribute::optional_string())
        .with_attribute("mode", Attribute::computed_string())
        .with_attribute("ttl", Attribute::computed_int64())
        .with_attribute("labels", computed(AttributeType::map(AttributeType::String)))
        .with_attribute("delete_protection", Attribute::computed_bool())
        .with_attribute("authoritative_nameservers", authoritative_nameservers())
        .with_attribute("registrar", Attribute::computed_string())
        .with_attribute("status", Attribute::computed_string())
        .with_block("primary_nameservers", primary_nameservers_block(true))
}

pub struct ZoneDataSource;

#[async_trait]
impl DataSource for ZoneDataSource {
    fn type_name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        data_source_schema().with_description("Look up a single DNS zone.")
    }

    fn experimental(&self) -> Option<&'static str> {
        Some(experimental::DNS)
    }

    async fn read(&self, client: &Client, config: &Value) -> Result<Value, ProviderError> {
        experimental::log_once(experimental::DNS);
        let lookup: ZoneLookup = decode(config)?;

        let zone = if let Some(raw) = &lookup.id {
            let zone_id = id::parse(raw, "zone")?;
            client
                .get_zone(&id::format(zone_id))
                .await?
                .ok_or_else(|| datasource::not_found("Zone", "id", raw))?
        } else if let Some(name) = &lookup.name {
            client
                .get_zone(name)
                .await?
                .ok_or_else(|| datasource::not_found("Zone", "name", name))?
        } else if let Some(selector) = &lookup.with_selector {
            datasource::one_result(client.list_zones(Some(selector)).await?, "Zone", selector)?
        } else {
            return Err(ProviderError::Validation(
                "one of id, name or with_selector must be set".to_string(),
            ));
        };

        let mut state = encode(&ZoneModel::from_api(&zone))?;
        state["with_selector"] = json!(lookup.with_selector);
        Ok(state)
    }
}

pub struct ZoneListDataSource;

#[async_trait]
impl DataSource for ZoneListDataSource {
    fn type_name(&self) -> &'static str {
        LIST_TYPE
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("List DNS zones, optionally filtered by label selector.")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("with_selector", Attribute::optional_string())
            .with_attribute(
                "zones",
                Attribute::new(
                    AttributeType::list(AttributeType::Dynamic),
                    AttributeFlags::computed(),
                ),
            )
    }

    fn experimental(&self) -> Option<&'static str> {
        Some(experimental::DNS)
    }

    async fn read(&self, client: &Client, config: &Value) -> Result<Value, ProviderError> {
        experimental::log_once(experimental::DNS);
        let selector = config.get("with_selector").and_then(Value::as_str);
        let zones = client.list_zones(selector).await?;

        let models: Vec<ZoneModel> = zones.iter().map(ZoneModel::from_api).collect();
        Ok(json!({
            "id": datasource::list_id(zones.iter().map(|z| z.id)),
            "with_selector": selector,
            "zones": encode(&models)?,
        }))
    }
}
