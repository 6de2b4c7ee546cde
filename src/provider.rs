//! The Hetzner Cloud provider.
//!
//! [`HcloudProvider`] implements [`ProviderService`] by looking up the
//! resource or data source for a type name and dispatching to it. The API
//! client is created by `configure` and shared by every later call.

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::config::{self, ProviderConfig};
use crate::error::ProviderError;
use crate::hcloud::Client;
use crate::plan;
use crate::resources::{self, DataSource, Resource};
use crate::schema::{Diagnostic, ProviderSchema};
use crate::service::ProviderService;
use crate::types::{ImportedResource, PlanResult};
use crate::util::experimental;
use crate::validation;

/// Provider for Hetzner Cloud and the Hetzner API.
pub struct HcloudProvider {
    client: RwLock<Option<Client>>,
    resources: Vec<Box<dyn Resource>>,
    data_sources: Vec<Box<dyn DataSource>>,
}

impl Default for HcloudProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl HcloudProvider {
    /// An unconfigured provider. `configure` must run before any API call.
    pub fn new() -> Self {
        Self {
            client: RwLock::new(None),
            resources: resources::resources(),
            data_sources: resources::data_sources(),
        }
    }

    /// A provider that is already configured with `client`.
    pub fn with_client(client: Client) -> Self {
        Self {
            client: RwLock::new(Some(client)),
            ..Self::new()
        }
    }

    fn resource(&self, resource_type: &str) -> Result<&dyn Resource, ProviderError> {
        self.resources
            .iter()
            .find(|r| r.type_name() == resource_type)
            .map(|r| r.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    fn data_source(&self, data_source_type: &str) -> Result<&dyn DataSource, ProviderError> {
        self.data_sources
            .iter()
            .find(|d| d.type_name() == data_source_type)
            .map(|d| d.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(data_source_type.to_string()))
    }

    // Client is a cheap handle around an Arc'd transport.
    async fn client(&self) -> Result<Client, ProviderError> {
        self.client.read().await.clone().ok_or_else(|| {
            ProviderError::Configuration(
                "provider not configured: configure must run before any API call".to_string(),
            )
        })
    }
}

#[async_trait::async_trait]
impl ProviderService for HcloudProvider {
    fn schema(&self) -> ProviderSchema {
        let schema = ProviderSchema::new().with_provider_config(config::schema());
        let schema = self
            .resources
            .iter()
            .fold(schema, |s, r| s.with_resource(r.type_name(), r.schema()));
        self.data_sources
            .iter()
            .fold(schema, |s, d| s.with_data_source(d.type_name(), d.schema()))
    }

    // The token may still come from the environment at configure time, so
    // only the shape and the polling settings are checked here.
    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let mut diagnostics = validation::validate(&config::schema(), &config);
        if !diagnostics.is_empty() {
            return Ok(diagnostics);
        }
        let provider_config = ProviderConfig::from_value(&config)?;
        if let Err(problems) = provider_config.resolve() {
            diagnostics.extend(
                problems
                    .into_iter()
                    .filter(|d| d.attribute.as_deref() != Some("token")),
            );
        }
        Ok(diagnostics)
    }

    #[instrument(skip(self, config), name = "provider.configure")]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let diagnostics = validation::validate(&config::schema(), &config);
        if !diagnostics.is_empty() {
            return Ok(diagnostics);
        }
        let resolved = match ProviderConfig::from_value(&config)?.resolve() {
            Ok(resolved) => resolved,
            Err(diagnostics) => {
                warn!(diagnostics = diagnostics.len(), "Provider configuration is invalid");
                return Ok(diagnostics);
            },
        };
        let client = resolved.build_client()?;
        *self.client.write().await = Some(client);
        info!(
            endpoint = %resolved.endpoint,
            endpoint_hetzner = %resolved.endpoint_hetzner,
            "Provider configured"
        );
        Ok(vec![])
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        self.client.write().await.take();
        info!("Provider stopped");
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(self.resource(resource_type)?.validate(&config))
    }

    #[instrument(skip(self, prior_state, proposed_state, _config), name = "provider.plan")]
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let resource = self.resource(resource_type)?;
        let plan = plan::diff(&resource.schema(), prior_state.as_ref(), &proposed_state);
        debug!(
            changes = plan.changes.len(),
            requires_replace = plan.requires_replace,
            "Plan computed"
        );
        Ok(plan)
    }

    #[instrument(skip(self, planned_state), name = "provider.create")]
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        if let Some(product) = resource.experimental() {
            experimental::log_once(product);
        }
        let client = self.client().await?;
        resource.create(&client, &planned_state).await
    }

    #[instrument(skip(self, current_state), name = "provider.read")]
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        match resource.read(&client, &current_state).await? {
            Some(state) => Ok(state),
            None => {
                info!("Resource no longer exists, removing from state");
                Ok(Value::Null)
            },
        }
    }

    #[instrument(skip(self, prior_state, planned_state), name = "provider.update")]
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        if let Some(product) = resource.experimental() {
            experimental::log_once(product);
        }
        let client = self.client().await?;
        resource.update(&client, &prior_state, &planned_state).await
    }

    #[instrument(skip(self, current_state), name = "provider.delete")]
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let resource = self.resource(resource_type)?;
        if let Some(product) = resource.experimental() {
            experimental::log_once(product);
        }
        let client = self.client().await?;
        resource.delete(&client, &current_state).await
    }

    #[instrument(skip(self), name = "provider.import")]
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        match resource.import(&client, id).await? {
            Some(state) => Ok(vec![ImportedResource::new(resource_type, state)]),
            None => Err(ProviderError::NotFound(format!(
                "{} with ID {} not found",
                resource_type, id
            ))),
        }
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(self.data_source(data_source_type)?.validate(&config))
    }

    #[instrument(skip(self, config), name = "provider.read_data_source")]
    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let data_source = self.data_source(data_source_type)?;
        if let Some(product) = data_source.experimental() {
            experimental::log_once(product);
        }
        let client = self.client().await?;
        data_source.read(&client, &config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hcloud::Method;
    use crate::testing::{assert_error_contains, MockTransport};
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    const TOKEN: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

    fn iso_json() -> Value {
        json!({
            "id": 7,
            "name": "debian-12.iso",
            "description": "Debian 12",
            "type": "public",
            "architecture": "x86",
            "deprecated": null,
            "deprecation": null
        })
    }

    #[test]
    fn test_schema_lists_every_type() {
        let provider = HcloudProvider::new();
        let schema = provider.schema();
        assert_eq!(schema.resources.len(), resources::resources().len());
        assert_eq!(schema.data_sources.len(), resources::data_sources().len());
        assert!(schema.provider.attribute("token").is_some());

        let metadata = provider.metadata();
        let mut sorted = metadata.resources.clone();
        sorted.sort();
        assert_eq!(metadata.resources, sorted);
    }

    #[tokio::test]
    async fn test_unconfigured_provider_refuses_api_calls() {
        let provider = HcloudProvider::new();
        let err = provider
            .read("hcloud_zone", json!({"id": "42"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_unknown_types() {
        let provider = HcloudProvider::new();
        let err = provider
            .create("hcloud_nothing", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
        let err = provider
            .validate_data_source_config("hcloud_nothing", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }

    #[tokio::test]
    async fn test_configure() {
        let provider = HcloudProvider::new();

        let diagnostics = provider
            .configure(json!({"token": TOKEN, "poll_function": "constant"}))
            .await
            .unwrap();
        assert!(diagnostics.is_empty());
        assert_ok!(provider.client().await);

        provider.stop().await.unwrap();
        assert_err!(provider.client().await);
    }

    #[tokio::test]
    async fn test_configure_reports_bad_settings() {
        let provider = HcloudProvider::new();
        let diagnostics = provider
            .configure(json!({"token": "short", "poll_interval": "soon"}))
            .await
            .unwrap();
        assert_error_contains(&diagnostics, "Invalid API token");
        assert_error_contains(&diagnostics, "Invalid poll interval");
        assert_err!(provider.client().await);
    }

    #[tokio::test]
    async fn test_validate_provider_config_ignores_token() {
        let provider = HcloudProvider::new();
        let diagnostics = provider
            .validate_provider_config(json!({"poll_function": "linear"}))
            .await
            .unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_error_contains(&diagnostics, "Invalid poll function");

        let diagnostics = provider.validate_provider_config(json!({})).await.unwrap();
        assert!(diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_validate_resource_config_warns_for_experimental() {
        let provider = HcloudProvider::new();
        let diagnostics = provider
            .validate_resource_config("hcloud_zone", json!({"name": "example.com", "mode": "primary"}))
            .await
            .unwrap();
        assert!(diagnostics.iter().all(|d| !d.is_error()));
        assert!(diagnostics.iter().any(|d| d.summary.contains("DNS")));
    }

    #[tokio::test]
    async fn test_read_missing_resource_is_null() {
        let mock = MockTransport::new();
        let provider = HcloudProvider::with_client(mock.client());
        let state = provider
            .read("hcloud_primary_ip", json!({"id": "5"}))
            .await
            .unwrap();
        assert!(state.is_null());
    }

    #[tokio::test]
    async fn test_import_missing_resource() {
        let mock = MockTransport::new();
        let provider = HcloudProvider::with_client(mock.client());
        let err = provider
            .import_resource("hcloud_primary_ip", "5")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_read_data_source() {
        let mock = MockTransport::new();
        mock.on(Method::Get, "/isos/7", 200, json!({"iso": iso_json()}));
        let provider = HcloudProvider::with_client(mock.client());
        let state = provider
            .read_data_source("hcloud_iso", json!({"id": "7"}))
            .await
            .unwrap();
        assert_eq!(state["name"], "debian-12.iso");
    }
}
