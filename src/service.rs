//! The host-facing service trait.
//!
//! A host process drives the provider through [`ProviderService`]: it asks for
//! the schema, configures the provider once with credentials, then plans and
//! applies resources and reads data sources. State crosses this boundary as
//! JSON objects keyed by attribute name.

use serde_json::Value;

use crate::error::ProviderError;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::types::{ImportedResource, PlanResult, ProviderMetadata};

/// Operations a provider exposes to its host.
///
/// Only schema, configure, plan and the four CRUD calls are required. The
/// defaults accept every config, keep state as is, and refuse imports and
/// data source reads.
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    fn schema(&self) -> ProviderSchema;

    /// Type names from [`ProviderService::schema`], sorted.
    fn metadata(&self) -> ProviderMetadata {
        let schema = self.schema();
        let mut resources: Vec<String> = schema.resources.keys().cloned().collect();
        let mut data_sources: Vec<String> = schema.data_sources.keys().cloned().collect();
        resources.sort();
        data_sources.sort();
        ProviderMetadata {
            resources,
            data_sources,
        }
    }

    /// Check a provider block without building a client.
    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = config;
        Ok(vec![])
    }

    /// Build the API client. Error diagnostics leave the provider unconfigured.
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Drop the client. Later API calls fail until the next `configure`.
    async fn stop(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = (resource_type, config);
        Ok(vec![])
    }

    /// Rewrite stored state written under schema `version`.
    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        let _ = (resource_type, version);
        Ok(state)
    }

    /// `prior_state` is `None` on create; `proposed_state` is null on destroy.
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError>;

    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError>;

    /// Returns null once the object is gone, so the host drops it from state.
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError>;

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Deleting an object that is already gone succeeds.
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError>;

    /// Adopt an existing object by its import ID.
    async fn import_resource(
        &self,
        resource_type: &str,
        _id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        Err(ProviderError::Unimplemented(format!(
            "Import not supported for resource type: {}",
            resource_type
        )))
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = (data_source_type, config);
        Ok(vec![])
    }

    async fn read_data_source(
        &self,
        data_source_type: &str,
        _config: Value,
    ) -> Result<Value, ProviderError> {
        Err(ProviderError::UnknownResource(data_source_type.to_string()))
    }
}
