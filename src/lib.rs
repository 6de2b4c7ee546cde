//! Hemmer provider for Hetzner Cloud
//!
//! This crate manages Hetzner infrastructure through the Hetzner Cloud API
//! (`https://api.hetzner.cloud/v1`) and the Hetzner API
//! (`https://api.hetzner.com/v1`, used for Storage Boxes).
//!
//! # Overview
//!
//! - **Resources**: Primary IPs, DNS zones and RRSets, Storage Boxes with
//!   their snapshots and subaccounts
//! - **Data sources**: lookups and lists for the resources above, plus server
//!   types, Load Balancer types and ISOs
//! - **[`ProviderService`]**: the host-facing trait, implemented by
//!   [`HcloudProvider`]
//! - **[`hcloud`]**: a typed API client with action polling and retries
//! - **Logging**: structured logging through `tracing`
//!
//! # Quick Start
//!
//! ```ignore
//! use hemmer_provider_hcloud::{HcloudProvider, ProviderService};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     hemmer_provider_hcloud::init_logging();
//!
//!     let provider = HcloudProvider::new();
//!     provider.configure(json!({"token": std::env::var("HCLOUD_TOKEN")?})).await?;
//!
//!     let zone = provider
//!         .read_data_source("hcloud_zone", json!({"name": "example.com"}))
//!         .await?;
//!     println!("{}", zone["ttl"]);
//!     Ok(())
//! }
//! ```
//!
//! # Operations
//!
//! - **Schema / Metadata**: every resource and data source with its attributes
//! - **ValidateProviderConfig / Configure**: token, endpoints and polling
//! - **ValidateResourceConfig**: schema checks, label rules and warnings for
//!   experimental products
//! - **Plan**: attribute diff with replacement detection
//! - **Create/Read/Update/Delete**: CRUD against the APIs
//! - **ImportResource**: adopt an existing object by ID
//! - **ValidateDataSourceConfig / ReadDataSource**: lookups and lists

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod hcloud;
pub mod logging;
pub mod plan;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod service;
pub mod testing;
pub mod types;
pub mod util;
pub mod validation;

// Re-export main types at crate root
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::HcloudProvider;
pub use schema::ProviderSchema;
pub use service::ProviderService;
pub use types::{AttributeChange, ImportedResource, PlanResult, ProviderMetadata};
pub use validation::{is_valid, validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
