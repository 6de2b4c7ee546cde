//! Helpers shared by the resources and data sources.

pub mod datasource;
pub mod experimental;
pub mod id;
pub mod labels;
pub mod merge;
