//! Schemas for the provider configuration, resources and data sources.
//!
//! A [`Schema`] is built once per type and drives both config validation
//! ([`crate::validation`]) and plan diffs ([`crate::plan`]). Attribute
//! shorthands are named `<usage>_<type>`, e.g. [`Attribute::optional_computed_int64`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Value type of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    String,
    Int64,
    Float64,
    Bool,
    List(Box<AttributeType>),
    /// String-keyed map, as used by `labels`.
    Map(Box<AttributeType>),
    /// Fixed member set. Members are never required.
    Object(HashMap<String, AttributeType>),
    /// Anything goes. Used for computed lists of nested models.
    Dynamic,
}

impl AttributeType {
    pub fn list(element: AttributeType) -> Self {
        Self::List(Box::new(element))
    }

    pub fn map(element: AttributeType) -> Self {
        Self::Map(Box::new(element))
    }

    /// Build an object type from `(name, type)` pairs.
    pub fn object<I, K>(members: I) -> Self
    where
        I: IntoIterator<Item = (K, AttributeType)>,
        K: Into<String>,
    {
        Self::Object(members.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Who may set an attribute: the configuration, the API, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AttributeFlags {
    pub required: bool,
    pub optional: bool,
    /// Filled in from the API response.
    pub computed: bool,
    /// Never logged or shown in plans. Passwords and TSIG keys.
    pub sensitive: bool,
}

impl AttributeFlags {
    pub fn required() -> Self {
        Self { required: true, ..Self::default() }
    }

    pub fn optional() -> Self {
        Self { optional: true, ..Self::default() }
    }

    pub fn computed() -> Self {
        Self { computed: true, ..Self::default() }
    }

    /// Configurable, with the API choosing a value when left unset.
    pub fn optional_computed() -> Self {
        Self { optional: true, computed: true, ..Self::default() }
    }

    /// Set only by the API; configuration values are ignored.
    pub fn is_computed_only(&self) -> bool {
        self.computed && !self.optional && !self.required
    }
}

/// One attribute of a schema block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    #[serde(flatten)]
    pub flags: AttributeFlags,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// A change to this attribute destroys and recreates the object.
    #[serde(default)]
    pub force_new: bool,
    /// Planned in place of a null configuration value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

macro_rules! shorthands {
    ($($name:ident => $ty:ident, $flags:ident;)*) => {
        $(
            #[doc = concat!("`", stringify!($ty), "` attribute with `", stringify!($flags), "` flags.")]
            pub fn $name() -> Self {
                Self::new(AttributeType::$ty, AttributeFlags::$flags())
            }
        )*
    };
}

impl Attribute {
    pub fn new(attr_type: AttributeType, flags: AttributeFlags) -> Self {
        Self {
            attr_type,
            flags,
            description: None,
            force_new: false,
            default: None,
        }
    }

    shorthands! {
        required_string => String, required;
        optional_string => String, optional;
        computed_string => String, computed;
        optional_computed_string => String, optional_computed;
        required_int64 => Int64, required;
        optional_int64 => Int64, optional;
        computed_int64 => Int64, computed;
        optional_computed_int64 => Int64, optional_computed;
        computed_float64 => Float64, computed;
        required_bool => Bool, required;
        optional_bool => Bool, optional;
        computed_bool => Bool, computed;
        optional_computed_bool => Bool, optional_computed;
    }

    /// `labels`: a string map owned by the configuration. Removing it
    /// clears the labels on the object.
    pub fn labels() -> Self {
        Self::new(
            AttributeType::map(AttributeType::String),
            AttributeFlags::optional(),
        )
        .with_description("User-defined labels (key-value pairs).")
    }

    /// A protection flag. Unset plans `false`, so dropping it from the
    /// configuration turns the protection off again.
    pub fn protection() -> Self {
        Self::optional_bool()
            .with_default(serde_json::Value::Bool(false))
            .with_description("Protect the resource against deletion. Unset means off.")
    }

    /// `id`: the API-assigned identifier, kept as a string in state.
    pub fn id() -> Self {
        Self::computed_string().with_description("ID of the resource.")
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.flags.sensitive = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlockNestingMode {
    /// A JSON object, at most one.
    #[default]
    Single,
    /// A JSON array of objects.
    List,
}

/// Attributes plus nested blocks. The root of every [`Schema`] is a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Block {
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, Attribute>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub blocks: HashMap<String, NestedBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.attributes.insert(name.into(), attr);
        self
    }

    pub fn with_block(mut self, name: impl Into<String>, block: NestedBlock) -> Self {
        self.blocks.insert(name.into(), block);
        self
    }
}

/// A block nested under a name, such as `access_settings` or `records`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedBlock {
    #[serde(flatten)]
    pub block: Block,
    #[serde(default)]
    pub nesting_mode: BlockNestingMode,
    #[serde(default)]
    pub min_items: u32,
    /// An omitted block keeps the value the API last reported.
    #[serde(default)]
    pub computed: bool,
}

impl NestedBlock {
    pub fn single(block: Block) -> Self {
        Self {
            block,
            nesting_mode: BlockNestingMode::Single,
            min_items: 0,
            computed: false,
        }
    }

    pub fn list(block: Block) -> Self {
        Self {
            nesting_mode: BlockNestingMode::List,
            ..Self::single(block)
        }
    }

    pub fn with_min_items(mut self, min: u32) -> Self {
        self.min_items = min;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }
}

/// Schema of one resource or data source type, or of the provider config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Schema {
    /// State version, bumped when stored state needs an upgrade.
    #[serde(default)]
    pub version: u64,
    #[serde(flatten)]
    pub block: Block,
}

impl Schema {
    /// Every type in this provider is still at state version 0.
    pub fn v0() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.block.attributes.insert(name.into(), attr);
        self
    }

    pub fn with_block(mut self, name: impl Into<String>, block: NestedBlock) -> Self {
        self.block.blocks.insert(name.into(), block);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.block.description = Some(description.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.block.attributes.get(name)
    }
}

/// Everything the provider exposes, keyed by type name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProviderSchema {
    #[serde(default)]
    pub provider: Schema,
    #[serde(default)]
    pub resources: HashMap<String, Schema>,
    #[serde(default)]
    pub data_sources: HashMap<String, Schema>,
}

impl ProviderSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider_config(mut self, schema: Schema) -> Self {
        self.provider = schema;
        self
    }

    pub fn with_resource(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.resources.insert(name.into(), schema);
        self
    }

    pub fn with_data_source(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.data_sources.insert(name.into(), schema);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

/// A validation or API message for the host, optionally tied to an attribute path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Dotted path such as `access_settings.ssh_enabled` or `records.0.value`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    fn with_severity(severity: DiagnosticSeverity, summary: impl Into<String>) -> Self {
        Self {
            severity,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    pub fn error(summary: impl Into<String>) -> Self {
        Self::with_severity(DiagnosticSeverity::Error, summary)
    }

    pub fn warning(summary: impl Into<String>) -> Self {
        Self::with_severity(DiagnosticSeverity::Warning, summary)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}
