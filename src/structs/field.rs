use serde_json::Value;
use std::collections::BTreeMap;

/// Core schema types allowed for a configuration field
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Boolean,
    Integer,
    Number,
    Array,
    Object,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Array => "array",
            FieldType::Object => "object",
        }
    }
}

/// Audience classification for a configuration field
///
/// Forces lowercase values of this enum to be used
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Shown in the first level of any configuration surface
    Exposed,
    /// Shown behind an advanced toggle
    Advanced,
    /// Only for people who read the source
    Expert,
    /// Never shown
    Hidden,
}
impl Default for Visibility {
    fn default() -> Visibility {
        Visibility::Exposed
    }
}
impl Visibility {
    fn is_default(&self) -> bool {
        *self == Visibility::Exposed
    }
}

/// How the state engine interprets a field's default
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum DefaultHandling {
    /// The default is a curated value the deployment starts out with
    Preloaded,
    /// The default records a value the operator chose
    UserConfigured,
    /// There is no usable default
    Unset,
}
impl Default for DefaultHandling {
    fn default() -> DefaultHandling {
        DefaultHandling::Preloaded
    }
}
impl DefaultHandling {
    fn is_default(&self) -> bool {
        *self == DefaultHandling::Preloaded
    }
}

/// Configuration field definition
///
/// Carries the core schema attributes plus the `x-` extension metadata
/// layered on top of them. Unknown extension attributes are kept verbatim in
/// `extensions` so documents round-trip, but the engine never consults them.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FieldDef {
    /// Core schema type
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<FieldType>,
    /// Human description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Current value of the field (the document is the as-configured state)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Allowed values
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,

    /// Environment variable surfaced in the container unit
    #[serde(rename = "x-env-var", skip_serializing_if = "Option::is_none")]
    pub env_var: Option<String>,
    /// Free form grouping tag used by the configuration reference
    #[serde(rename = "x-category", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Sort key within a category
    #[serde(
        rename = "x-display-order",
        default = "display_order_default",
        skip_serializing_if = "is_default_order"
    )]
    pub display_order: i32,
    /// Who gets to see the field
    #[serde(rename = "x-visibility", default, skip_serializing_if = "Visibility::is_default")]
    pub visibility: Visibility,
    /// Whether the value must be masked in reports
    #[serde(rename = "x-sensitive", default, skip_serializing_if = "is_false")]
    pub sensitive: bool,
    /// Dotted path into the secrets region
    #[serde(rename = "x-secret-ref", skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<String>,
    /// Provenance path back into the source blueprint
    #[serde(rename = "x-template-path", skip_serializing_if = "Option::is_none")]
    pub template_path: Option<String>,
    /// Cross service dotted path this field depends on
    #[serde(rename = "x-requires-field", skip_serializing_if = "Option::is_none")]
    pub requires_field: Option<String>,
    /// Display time gating on sibling fields
    #[serde(rename = "x-depends-on", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub depends_on: BTreeMap<String, Value>,
    /// How the state engine interprets the default
    #[serde(
        rename = "x-default-handling",
        default,
        skip_serializing_if = "DefaultHandling::is_default"
    )]
    pub default_handling: DefaultHandling,
    /// Why the default is what it is
    #[serde(rename = "x-rationale", skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    /// Services unconditionally enabled when this field is truthy
    #[serde(rename = "x-enables-services", default, skip_serializing_if = "Vec::is_empty")]
    pub enables_services: Vec<String>,
    /// Which service backs each provider choice (null means no extra service)
    #[serde(rename = "x-affects-services", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub affects_services: BTreeMap<String, Option<String>>,
    /// Fields required once a provider choice is made
    #[serde(rename = "x-provider-fields", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub provider_fields: BTreeMap<String, Vec<String>>,

    /// Unrecognised extension attributes, preserved verbatim
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}
fn display_order_default() -> i32 {
    999
}
fn is_default_order(order: &i32) -> bool {
    *order == 999
}
fn is_false(b: &bool) -> bool {
    !*b
}

impl FieldDef {
    /// Schema type as rendered in snapshots and docs
    pub fn type_name(&self) -> &'static str {
        match self.field_type {
            Some(t) => t.as_str(),
            None => "unknown",
        }
    }
}
