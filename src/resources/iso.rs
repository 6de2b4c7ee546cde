//! `hcloud_iso` and `hcloud_isos` data sources.
//!
//! The API only filters ISOs by name and architecture. Prefix, type and
//! deprecation filters are applied here, one linear pass each.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::deprecation::{self, DeprecationModel};
use super::{decode, encode, DataSource};
use crate::error::ProviderError;
use crate::hcloud::{Client, Iso};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Diagnostic, Schema};
use crate::util::{datasource, id, merge};
use crate::validation::validate_one_of;

pub const DATA_SOURCE_TYPE: &str = "hcloud_iso";
pub const LIST_TYPE: &str = "hcloud_isos";

const ISO_TYPES: [&str; 2] = ["public", "private"];
const ARCHITECTURES: [&str; 2] = ["x86", "arm"];

/// Keep ISOs whose name starts with `prefix`.
pub fn filter_by_name_prefix(isos: Vec<Iso>, prefix: &str) -> Vec<Iso> {
    isos.into_iter()
        .filter(|iso| iso.name.starts_with(prefix))
        .collect()
}

/// Keep ISOs of the given type, `public` or `private`.
pub fn filter_by_type(isos: Vec<Iso>, iso_type: &str) -> Vec<Iso> {
    isos.into_iter()
        .filter(|iso| iso.iso_type == iso_type)
        .collect()
}

/// Keep ISOs built for `architecture`. With `include_wildcard`, ISOs without
/// an architecture are kept as well.
pub fn filter_by_architecture(isos: Vec<Iso>, architecture: &str, include_wildcard: bool) -> Vec<Iso> {
    isos.into_iter()
        .filter(|iso| match &iso.architecture {
            Some(arch) => arch == architecture,
            None => include_wildcard,
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsoModel {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub iso_type: String,
    pub architecture: Option<String>,
    #[serde(flatten)]
    pub deprecation: DeprecationModel,
}

impl IsoModel {
    pub fn from_api(iso: &Iso) -> Self {
        Self {
            id: id::format(iso.id),
            name: iso.name.clone(),
            description: iso.description.clone(),
            iso_type: iso.iso_type.clone(),
            architecture: iso.architecture.clone(),
            deprecation: DeprecationModel::from_api(iso.deprecation.as_ref()),
        }
    }
}

/// Filters shared by both data sources.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IsoFilters {
    id: Option<String>,
    name: Option<String>,
    name_prefix: Option<String>,
    #[serde(rename = "type")]
    iso_type: Option<String>,
    architecture: Option<String>,
    include_architecture_wildcard: Option<bool>,
    with_deprecated: Option<bool>,
}

impl IsoFilters {
    fn apply(&self, mut isos: Vec<Iso>) -> Vec<Iso> {
        if let Some(prefix) = &self.name_prefix {
            isos = filter_by_name_prefix(isos, prefix);
        }
        if let Some(iso_type) = &self.iso_type {
            isos = filter_by_type(isos, iso_type);
        }
        if let Some(architecture) = &self.architecture {
            isos = filter_by_architecture(
                isos,
                architecture,
                self.include_architecture_wildcard.unwrap_or(false),
            );
        }
        if !self.with_deprecated.unwrap_or(false) {
            isos.retain(|iso| iso.deprecation.is_none());
        }
        isos
    }

    async fn list(&self, client: &Client) -> Result<Vec<Iso>, ProviderError> {
        let isos = client
            .list_isos(
                self.name.as_deref(),
                self.architecture.as_deref(),
                self.include_architecture_wildcard.unwrap_or(false),
            )
            .await?;
        Ok(self.apply(isos))
    }
}

fn filter_schema() -> Schema {
    Schema::v0()
        .with_attribute(
            "name_prefix",
            Attribute::optional_string().with_description("Only ISOs whose name starts with this."),
        )
        .with_attribute("type", Attribute::optional_string())
        .with_attribute("architecture", Attribute::optional_string())
        .with_attribute("include_architecture_wildcard", Attribute::optional_bool())
        .with_attribute("with_deprecated", Attribute::optional_bool())
}

fn validate_filters(config: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = validate_one_of(config.get("type"), &ISO_TYPES, "type");
    diagnostics.extend(validate_one_of(
        config.get("architecture"),
        &ARCHITECTURES,
        "architecture",
    ));
    diagnostics
}

pub struct IsoDataSource;

#[async_trait]
impl DataSource for IsoDataSource {
    fn type_name(&self) -> &'static str {
        DATA_SOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        let schema = filter_schema()
            .with_description("Look up a single ISO by ID, name or filters.")
            .with_attribute("id", Attribute::optional_computed_string())
            .with_attribute("name", Attribute::optional_computed_string())
            .with_attribute("description", Attribute::computed_string());
        merge::into_schema(schema, deprecation::attributes())
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let mut diagnostics = super::validate_config(&self.schema(), config, None);
        diagnostics.extend(validate_filters(config));
        diagnostics
    }

    async fn read(&self, client: &Client, config: &Value) -> Result<Value, ProviderError> {
        let filters: IsoFilters = decode(config)?;

        let iso = if let Some(raw) = &filters.id {
            client
                .get_iso(id::parse(raw, "ISO")?)
                .await?
                .ok_or_else(|| datasource::not_found("ISO", "id", raw))?
        } else if let Some(name) = &filters.name {
            client
                .list_isos(Some(name), None, false)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| datasource::not_found("ISO", "name", name))?
        } else {
            let mut isos = filters.list(client).await?;
            match isos.len() {
                0 => return Err(ProviderError::NotFound("no ISO matches the given filters".to_string())),
                1 => isos.remove(0),
                n => {
                    return Err(ProviderError::InvalidRequest(format!(
                        "more than one ISO matches the given filters ({} results)",
                        n
                    )))
                },
            }
        };

        let mut state = encode(&IsoModel::from_api(&iso))?;
        if let Value::Object(map) = &mut state {
            for key in [
                "name_prefix",
                "architecture",
                "include_architecture_wildcard",
                "with_deprecated",
            ] {
                if let Some(value) = config.get(key).filter(|v| !v.is_null()) {
                    map.insert(key.to_string(), value.clone());
                }
            }
        }
        Ok(state)
    }
}

pub struct IsoListDataSource;

#[async_trait]
impl DataSource for IsoListDataSource {
    fn type_name(&self) -> &'static str {
        LIST_TYPE
    }

    fn schema(&self) -> Schema {
        filter_schema()
            .with_description("List ISOs matching the given filters.")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "isos",
                Attribute::new(
                    AttributeType::list(AttributeType::Dynamic),
                    AttributeFlags::computed(),
                ),
            )
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let mut diagnostics = super::validate_config(&self.schema(), config, None);
        diagnostics.extend(validate_filters(config));
        diagnostics
    }

    async fn read(&self, client: &Client, config: &Value) -> Result<Value, ProviderError> {
        let filters: IsoFilters = decode(config)?;
        let isos = filters.list(client).await?;

        let models: Vec<IsoModel> = isos.iter().map(IsoModel::from_api).collect();
        let mut state = config.clone();
        if !state.is_object() {
            state = json!({});
        }
        state["id"] = json!(datasource::list_id(isos.iter().map(|iso| iso.id)));
        state["isos"] = encode(&models)?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hcloud::Method;
    use crate::testing::{assert_error_contains, MockTransport};

    fn iso(id: i64, name: &str, iso_type: &str, architecture: Option<&str>, deprecated: bool) -> Iso {
        serde_json::from_value(iso_json(id, name, iso_type, architecture, deprecated)).unwrap()
    }

    fn iso_json(id: i64, name: &str, iso_type: &str, architecture: Option<&str>, deprecated: bool) -> Value {
        let deprecation = deprecated.then(|| {
            json!({"announced": "2023-01-01T00:00:00+00:00", "unavailable_after": "2023-04-01T00:00:00+00:00"})
        });
        json!({
            "id": id,
            "name": name,
            "description": name,
            "type": iso_type,
            "architecture": architecture,
            "deprecation": deprecation
        })
    }

    fn catalogue() -> Vec<Value> {
        vec![
            iso_json(1, "ubuntu-22.04.iso", "public", Some("x86"), false),
            iso_json(2, "ubuntu-20.04.iso", "public", Some("x86"), true),
            iso_json(3, "ubuntu-22.04-arm.iso", "public", Some("arm"), false),
            iso_json(4, "virtio-win.iso", "public", None, false),
            iso_json(5, "custom.iso", "private", Some("x86"), false),
        ]
    }

    #[test]
    fn test_filters() {
        let isos = vec![
            iso(1, "ubuntu-22.04.iso", "public", Some("x86"), false),
            iso(2, "debian-12.iso", "private", Some("arm"), false),
            iso(3, "virtio-win.iso", "public", None, false),
        ];

        let names = |isos: Vec<Iso>| isos.into_iter().map(|i| i.name).collect::<Vec<_>>();
        assert_eq!(names(filter_by_name_prefix(isos.clone(), "ubuntu")), vec!["ubuntu-22.04.iso"]);
        assert_eq!(names(filter_by_type(isos.clone(), "private")), vec!["debian-12.iso"]);
        assert_eq!(names(filter_by_architecture(isos.clone(), "x86", false)), vec!["ubuntu-22.04.iso"]);
        assert_eq!(
            names(filter_by_architecture(isos, "x86", true)),
            vec!["ubuntu-22.04.iso", "virtio-win.iso"]
        );
    }

    #[test]
    fn test_deprecated_isos_are_dropped_by_default() {
        let isos: Vec<Iso> = catalogue()
            .into_iter()
            .map(|v| serde_json::from_value(v).unwrap())
            .collect();
        let filters = IsoFilters {
            name_prefix: Some("ubuntu-2".to_string()),
            architecture: Some("x86".to_string()),
            ..Default::default()
        };
        let kept = filters.apply(isos.clone());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, 1);

        let filters = IsoFilters {
            with_deprecated: Some(true),
            ..filters
        };
        assert_eq!(filters.apply(isos).len(), 2);
    }

    #[test]
    fn test_validate() {
        let diagnostics = IsoListDataSource.validate(&json!({"type": "shared", "architecture": "riscv"}));
        assert_error_contains(&diagnostics, "'type'");
        assert_error_contains(&diagnostics, "'architecture'");
    }

    #[tokio::test]
    async fn test_read_by_prefix_requires_one_match() {
        let mock = MockTransport::new();
        mock.on(
            Method::Get,
            "/isos",
            200,
            json!({"isos": catalogue(), "meta": {"pagination": {"next_page": null}}}),
        );
        let client = mock.client();

        let state = IsoDataSource
            .read(&client, &json!({"name_prefix": "ubuntu", "architecture": "arm"}))
            .await
            .unwrap();
        assert_eq!(state["id"], "3");
        assert_eq!(state["name_prefix"], "ubuntu");

        let err = IsoDataSource
            .read(&client, &json!({"name_prefix": "ubuntu"}))
            .await
            .unwrap_err();
        assert!(err.message().contains("more than one ISO"));
    }

    #[tokio::test]
    async fn test_list() {
        let mock = MockTransport::new();
        mock.on(
            Method::Get,
            "/isos",
            200,
            json!({"isos": catalogue(), "meta": {"pagination": {"next_page": null}}}),
        );

        let state = IsoListDataSource
            .read(
                &mock.client(),
                &json!({"architecture": "x86", "include_architecture_wildcard": true}),
            )
            .await
            .unwrap();
        assert_eq!(state["id"], "1-4-5");
        assert_eq!(state["isos"][1]["architecture"], Value::Null);

        let query = &mock.requests()[0].query;
        assert!(query.contains(&("include_architecture_wildcard".to_string(), "true".to_string())));
    }
}
