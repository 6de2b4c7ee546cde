//! Merging shared attribute sets into schemas.

use std::collections::HashMap;

use crate::schema::{Attribute, Schema};

/// Attribute set keyed by name.
pub type Attributes = HashMap<String, Attribute>;

/// Add every attribute of `extra` to `schema`, replacing same-named ones.
pub fn into_schema(mut schema: Schema, extra: Attributes) -> Schema {
    schema.block.attributes.extend(extra);
    schema
}
