//! Types shared by several resource families.

use serde::{Deserialize, Serialize};

/// Protection flags of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Protection {
    /// Deletion is blocked.
    #[serde(default)]
    pub delete: bool,
}

/// A location (for example `fsn1`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Location {
    /// Location ID.
    #[serde(default)]
    pub id: i64,
    /// Location name.
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub network_zone: String,
}

/// A datacenter inside a location (for example `fsn1-dc14`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Datacenter {
    /// Datacenter ID.
    #[serde(default)]
    pub id: i64,
    /// Datacenter name.
    pub name: String,
    /// Location of the datacenter.
    #[serde(default)]
    pub location: Location,
}

/// Deprecation notice attached to types, ISOs and locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deprecation {
    /// When the deprecation was announced (RFC 3339).
    pub announced: String,
    /// After this date the item can no longer be used (RFC 3339).
    pub unavailable_after: String,
}
