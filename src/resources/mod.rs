//! Resources and data sources.
//!
//! Every resource family follows one shape: a schema, a model struct that
//! mirrors the schema attributes and converts from the API type, and CRUD
//! functions that call the [`Client`] and map the result back into state.
//! State crosses this boundary as a JSON object; models are decoded from and
//! encoded to it with serde.

pub mod deprecation;
pub mod iso;
pub mod load_balancer_type;
pub mod primary_ip;
pub mod server_type;
pub mod storage_box;
pub mod storage_box_snapshot;
pub mod storage_box_subaccount;
pub mod zone;
pub mod zone_rrset;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::ProviderError;
use crate::hcloud::Client;
use crate::schema::{Diagnostic, Schema};
use crate::util::experimental;
use crate::validation;

/// A managed resource type.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Type name, e.g. `hcloud_zone`.
    fn type_name(&self) -> &'static str;

    /// Schema of the resource.
    fn schema(&self) -> Schema;

    /// Experimental product the resource belongs to, if any.
    fn experimental(&self) -> Option<&'static str> {
        None
    }

    /// Validate a configuration beyond what the schema expresses.
    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        validate_config(&self.schema(), config, self.experimental())
    }

    /// Create the resource and return its state.
    async fn create(&self, client: &Client, planned: &Value) -> Result<Value, ProviderError>;

    /// Read the resource; `None` if it no longer exists.
    async fn read(&self, client: &Client, state: &Value) -> Result<Option<Value>, ProviderError>;

    /// Apply the planned state to an existing resource.
    async fn update(
        &self,
        client: &Client,
        prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError>;

    /// Delete the resource. Deleting a resource that is already gone succeeds.
    async fn delete(&self, client: &Client, state: &Value) -> Result<(), ProviderError>;

    /// Import by ID. The default reads the resource with `id` set.
    async fn import(&self, client: &Client, id: &str) -> Result<Option<Value>, ProviderError> {
        self.read(client, &json!({ "id": id })).await
    }
}

/// A read-only data source type.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Type name, e.g. `hcloud_server_types`.
    fn type_name(&self) -> &'static str;

    /// Schema of the data source.
    fn schema(&self) -> Schema;

    /// Experimental product the data source belongs to, if any.
    fn experimental(&self) -> Option<&'static str> {
        None
    }

    /// Validate a configuration.
    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        validate_config(&self.schema(), config, self.experimental())
    }

    /// Look up the data and return the resulting state.
    async fn read(&self, client: &Client, config: &Value) -> Result<Value, ProviderError>;
}

/// Every resource the provider serves.
pub fn resources() -> Vec<Box<dyn Resource>> {
    vec![
        Box::new(primary_ip::PrimaryIpResource),
        Box::new(zone::ZoneResource),
        Box::new(zone_rrset::ZoneRRSetResource),
        Box::new(storage_box::StorageBoxResource),
        Box::new(storage_box_snapshot::StorageBoxSnapshotResource),
        Box::new(storage_box_subaccount::StorageBoxSubaccountResource),
    ]
}

/// Every data source the provider serves.
pub fn data_sources() -> Vec<Box<dyn DataSource>> {
    vec![
        Box::new(primary_ip::PrimaryIpDataSource),
        Box::new(primary_ip::PrimaryIpListDataSource),
        Box::new(zone::ZoneDataSource),
        Box::new(zone::ZoneListDataSource),
        Box::new(zone_rrset::ZoneRRSetDataSource),
        Box::new(storage_box::StorageBoxDataSource),
        Box::new(storage_box::StorageBoxListDataSource),
        Box::new(server_type::ServerTypeDataSource),
        Box::new(server_type::ServerTypeListDataSource),
        Box::new(load_balancer_type::LoadBalancerTypeDataSource),
        Box::new(load_balancer_type::LoadBalancerTypeListDataSource),
        Box::new(iso::IsoDataSource),
        Box::new(iso::IsoListDataSource),
    ]
}

/// Schema validation, label rules and the experimental warning.
pub fn validate_config(schema: &Schema, config: &Value, experimental: Option<&str>) -> Vec<Diagnostic> {
    let mut diagnostics = validation::validate(schema, config);
    if let Some(labels) = config.get("labels") {
        diagnostics.extend(validation::validate_labels(labels, "labels"));
    }
    if let Some(product) = experimental {
        diagnostics.push(experimental::warning(product));
    }
    diagnostics
}

/// Decode state or configuration into a model.
pub(crate) fn decode<T: DeserializeOwned>(value: &Value) -> Result<T, ProviderError> {
    Ok(serde_json::from_value(value.clone())?)
}

/// Encode a model as state.
pub(crate) fn encode<T: Serialize>(model: &T) -> Result<Value, ProviderError> {
    Ok(serde_json::to_value(model)?)
}

/// Unwrap a required model field.
pub(crate) fn require<T>(value: Option<T>, attribute: &str) -> Result<T, ProviderError> {
    value.ok_or_else(|| {
        ProviderError::Validation(format!("missing required attribute '{}'", attribute))
    })
}

/// Error for an object that vanished between a write and the read-back.
pub(crate) fn vanished(what: &str, id: impl std::fmt::Display) -> ProviderError {
    ProviderError::NotFound(format!("{} {} disappeared after update", what, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_type_names_are_unique() {
        let names: HashSet<&str> = resources().iter().map(|r| r.type_name()).collect();
        assert_eq!(names.len(), resources().len());

        let names: HashSet<&str> = data_sources().iter().map(|d| d.type_name()).collect();
        assert_eq!(names.len(), data_sources().len());
    }

    #[test]
    fn test_every_schema_has_an_id() {
        for resource in resources() {
            assert!(resource.schema().attribute("id").is_some(), "{}", resource.type_name());
        }
        for data_source in data_sources() {
            assert!(data_source.schema().attribute("id").is_some(), "{}", data_source.type_name());
        }
    }

    #[test]
    fn test_validate_config_checks_labels_and_warns() {
        let schema = Schema::v0().with_attribute("labels", crate::schema::Attribute::labels());
        let diagnostics = validate_config(&schema, &json!({"labels": {"-bad": "x"}}), Some("DNS"));
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics[0].is_error());
        assert!(!diagnostics[1].is_error());
    }

    #[test]
    fn test_require() {
        assert_eq!(require(Some(1), "ttl").unwrap(), 1);
        let err = require::<i64>(None, "ttl").unwrap_err();
        assert!(err.message().contains("'ttl'"));
    }
}
