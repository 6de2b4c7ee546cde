//! Deprecation attributes shared by server types, load balancer types and ISOs.

use serde::{Deserialize, Serialize};

use crate::hcloud::Deprecation;
use crate::schema::Attribute;
use crate::util::merge::Attributes;

/// `is_deprecated`, `deprecation_announced`, `unavailable_after`.
pub fn attributes() -> Attributes {
    Attributes::from([
        (
            "is_deprecated".to_string(),
            Attribute::computed_bool().with_description("Whether the resource is deprecated."),
        ),
        (
            "deprecation_announced".to_string(),
            Attribute::computed_string()
                .with_description("Date when the deprecation was announced."),
        ),
        (
            "unavailable_after".to_string(),
            Attribute::computed_string()
                .with_description("Date after which the resource can no longer be used."),
        ),
    ])
}

/// State fields of a possibly deprecated resource; flattened into its model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeprecationModel {
    pub is_deprecated: bool,
    pub deprecation_announced: Option<String>,
    pub unavailable_after: Option<String>,
}

impl DeprecationModel {
    pub fn from_api(deprecation: Option<&Deprecation>) -> Self {
        match deprecation {
            Some(d) => Self {
                is_deprecated: true,
                deprecation_announced: Some(d.announced.clone()),
                unavailable_after: Some(d.unavailable_after.clone()),
            },
            None => Self::default(),
        }
    }
}
