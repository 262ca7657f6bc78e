//! Schema types for describing provider and resource structure.
//!
//! Schemas describe the shape of provider configuration, resources, and data sources.
//! They are served to Terraform through `GetProviderSchema`, drive config
//! validation, and decide which attribute changes force a replacement.

use std::collections::BTreeMap;

use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;

use crate::value::DynamicValue;

/// The type of an attribute value.
///
/// Serializes to the cty type JSON Terraform expects in a schema, e.g.
/// `"string"` or `["list","string"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeType {
    /// A string value.
    String,
    /// A 64-bit integer (a cty `number`).
    Int64,
    /// A 64-bit floating point number (a cty `number`).
    Float64,
    /// A boolean value.
    Bool,
    /// A list of values of a single type.
    List(Box<AttributeType>),
    /// A set of unique values of a single type.
    Set(Box<AttributeType>),
    /// A map from string keys to values of a single type.
    Map(Box<AttributeType>),
    /// An object with a fixed set of attributes.
    Object(BTreeMap<String, AttributeType>),
    /// A dynamic type that can hold any value (use sparingly).
    Dynamic,
}

impl AttributeType {
    /// Create a list type.
    pub fn list(element_type: AttributeType) -> Self {
        Self::List(Box::new(element_type))
    }

    /// Create a set type.
    pub fn set(element_type: AttributeType) -> Self {
        Self::Set(Box::new(element_type))
    }

    /// Create a map type.
    pub fn map(element_type: AttributeType) -> Self {
        Self::Map(Box::new(element_type))
    }

    /// Create an object type.
    pub fn object(attributes: BTreeMap<String, AttributeType>) -> Self {
        Self::Object(attributes)
    }

    /// Encode as cty type JSON.
    pub fn to_json_bytes(&self) -> Vec<u8> {
        // Serializing this enum into memory cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }
}

impl Serialize for AttributeType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let collection = |serializer: S, kind: &str, element: &AttributeType| {
            let mut seq = serializer.serialize_seq(Some(2))?;
            seq.serialize_element(kind)?;
            seq.serialize_element(element)?;
            seq.end()
        };

        match self {
            AttributeType::String => serializer.serialize_str("string"),
            AttributeType::Int64 | AttributeType::Float64 => serializer.serialize_str("number"),
            AttributeType::Bool => serializer.serialize_str("bool"),
            AttributeType::Dynamic => serializer.serialize_str("dynamic"),
            AttributeType::List(element) => collection(serializer, "list", element),
            AttributeType::Set(element) => collection(serializer, "set", element),
            AttributeType::Map(element) => collection(serializer, "map", element),
            AttributeType::Object(attrs) => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element("object")?;
                seq.serialize_element(attrs)?;
                seq.end()
            }
        }
    }
}

/// Who may set an attribute: the practitioner, the provider, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttributeFlags {
    /// Must be set in configuration.
    pub required: bool,
    /// May be set in configuration.
    pub optional: bool,
    /// Set by the provider when configuration leaves it null.
    pub computed: bool,
    /// Redacted in Terraform's plan output.
    pub sensitive: bool,
}

impl AttributeFlags {
    pub fn required() -> Self {
        Self {
            required: true,
            ..Default::default()
        }
    }

    pub fn optional() -> Self {
        Self {
            optional: true,
            ..Default::default()
        }
    }

    pub fn computed() -> Self {
        Self {
            computed: true,
            ..Default::default()
        }
    }

    /// Whether the attribute can only be set by the provider.
    pub fn is_computed_only(&self) -> bool {
        self.computed && !self.optional && !self.required
    }
}

/// How a nested attribute holds its object(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NestingMode {
    /// Exactly one object (or null).
    #[default]
    Single,
    /// An ordered list of objects.
    List,
    /// A set of objects.
    Set,
    /// A map of objects keyed by string.
    Map,
}

/// The attributes of a nested object, together with how it is nested.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedAttributes {
    /// Attributes of each nested object.
    pub attributes: BTreeMap<String, Attribute>,
    /// How the objects are nested.
    pub nesting: NestingMode,
}

/// Describes a single attribute in a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// The type of the attribute. Ignored when `nested` is set.
    pub attr_type: AttributeType,
    /// Nested object attributes, for attributes whose value is structured.
    pub nested: Option<NestedAttributes>,
    /// Flags describing how the attribute can be used.
    pub flags: AttributeFlags,
    /// Human-readable description of the attribute (markdown).
    pub description: Option<String>,
    /// If set, changing this attribute forces resource replacement.
    pub force_new: bool,
}

impl Attribute {
    /// Create a new attribute with the given type and flags.
    pub fn new(attr_type: AttributeType, flags: AttributeFlags) -> Self {
        Self {
            attr_type,
            nested: None,
            flags,
            description: None,
            force_new: false,
        }
    }

    /// Create an attribute holding nested objects.
    pub fn nested(
        nesting: NestingMode,
        attributes: impl IntoIterator<Item = (&'static str, Attribute)>,
        flags: AttributeFlags,
    ) -> Self {
        let attributes: BTreeMap<String, Attribute> = attributes
            .into_iter()
            .map(|(name, attr)| (name.to_string(), attr))
            .collect();

        let object = AttributeType::Object(
            attributes
                .iter()
                .map(|(name, attr)| (name.clone(), attr.value_type()))
                .collect(),
        );
        let attr_type = match nesting {
            NestingMode::Single => object,
            NestingMode::List => AttributeType::list(object),
            NestingMode::Set => AttributeType::set(object),
            NestingMode::Map => AttributeType::map(object),
        };

        Self {
            attr_type,
            nested: Some(NestedAttributes {
                attributes,
                nesting,
            }),
            flags,
            description: None,
            force_new: false,
        }
    }

    /// Create a required string attribute.
    pub fn required_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::required())
    }

    /// Create an optional string attribute.
    pub fn optional_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::optional())
    }

    /// Create a computed string attribute.
    pub fn computed_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::computed())
    }

    /// Create a required int64 attribute.
    pub fn required_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::required())
    }

    /// Create an optional int64 attribute.
    pub fn optional_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::optional())
    }

    /// Create a computed int64 attribute.
    pub fn computed_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::computed())
    }

    /// Create an optional bool attribute.
    pub fn optional_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::optional())
    }

    /// Create an optional list attribute.
    pub fn optional_list(element_type: AttributeType) -> Self {
        Self::new(AttributeType::list(element_type), AttributeFlags::optional())
    }

    /// Create a single nested object attribute.
    pub fn single_nested(
        attributes: impl IntoIterator<Item = (&'static str, Attribute)>,
        flags: AttributeFlags,
    ) -> Self {
        Self::nested(NestingMode::Single, attributes, flags)
    }

    /// Create a list of nested objects.
    pub fn list_nested(
        attributes: impl IntoIterator<Item = (&'static str, Attribute)>,
        flags: AttributeFlags,
    ) -> Self {
        Self::nested(NestingMode::List, attributes, flags)
    }

    /// Set the description for this attribute.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark this attribute as forcing resource replacement when changed.
    pub fn with_force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// Mark this attribute as sensitive.
    pub fn sensitive(mut self) -> Self {
        self.flags.sensitive = true;
        self
    }

    /// The full value type of the attribute, including nested objects.
    pub fn value_type(&self) -> AttributeType {
        self.attr_type.clone()
    }
}

/// A block of attributes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    /// The attributes within this block.
    pub attributes: BTreeMap<String, Attribute>,
    /// Human-readable description of the block.
    pub description: Option<String>,
}

impl Block {
    /// Create a new empty block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute to this block.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.attributes.insert(name.into(), attr);
        self
    }

    /// Set the description for this block.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Schema for a resource or data source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    /// The version of this schema (for state upgrades).
    pub version: i64,
    /// The root block containing all attributes.
    pub block: Block,
}

impl Schema {
    /// Create a new schema with the given version.
    pub fn new(version: i64) -> Self {
        Self {
            version,
            block: Block::new(),
        }
    }

    /// Create a schema at version 0.
    pub fn v0() -> Self {
        Self::new(0)
    }

    /// Add an attribute to the schema.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.block.attributes.insert(name.into(), attr);
        self
    }

    /// Set the description of the root block.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.block.description = Some(description.into());
        self
    }

    /// Top-level attributes marked `force_new` whose value differs between
    /// `prior` and `proposed`.
    ///
    /// Unknown proposed values count as a change, since they may resolve to
    /// anything at apply time.
    pub fn replacement_paths(&self, prior: &DynamicValue, proposed: &DynamicValue) -> Vec<String> {
        self.block
            .attributes
            .iter()
            .filter(|(_, attr)| attr.force_new)
            .filter(|(name, _)| {
                let before = prior.get(name).unwrap_or(&DynamicValue::Null);
                let after = proposed.get(name).unwrap_or(&DynamicValue::Null);
                after.contains_unknown() || before != after
            })
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Schema for the provider configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProviderSchema {
    /// Schema for provider configuration.
    pub provider: Schema,
    /// Schemas for each resource type.
    pub resources: BTreeMap<String, Schema>,
    /// Schemas for each data source type.
    pub data_sources: BTreeMap<String, Schema>,
}

impl ProviderSchema {
    /// Create a new empty provider schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the provider configuration schema.
    pub fn with_provider_config(mut self, schema: Schema) -> Self {
        self.provider = schema;
        self
    }

    /// Add a resource schema.
    pub fn with_resource(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.resources.insert(name.into(), schema);
        self
    }

    /// Add a data source schema.
    pub fn with_data_source(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.data_sources.insert(name.into(), schema);
        self
    }
}

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    /// An error that prevents the operation from completing.
    Error,
    /// A warning that doesn't prevent the operation but should be addressed.
    Warning,
}

/// A diagnostic message from the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The severity of the diagnostic.
    pub severity: DiagnosticSeverity,
    /// A short summary of the issue.
    pub summary: String,
    /// A detailed description of the issue.
    pub detail: Option<String>,
    /// The attribute path where the issue occurred, dot separated.
    /// Numeric segments address list elements (`tags.0.name`).
    pub attribute: Option<String>,
}

impl Diagnostic {
    /// Create an error diagnostic.
    pub fn error(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Create a warning diagnostic.
    pub fn warning(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Add detail to this diagnostic.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Set the attribute path for this diagnostic.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Whether this diagnostic is an error.
    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

/// Whether any of the diagnostics is an error.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_type_cty_json() {
        let json = |t: AttributeType| String::from_utf8(t.to_json_bytes()).unwrap();

        assert_eq!(json(AttributeType::String), r#""string""#);
        assert_eq!(json(AttributeType::Int64), r#""number""#);
        assert_eq!(json(AttributeType::Bool), r#""bool""#);
        assert_eq!(
            json(AttributeType::list(AttributeType::String)),
            r#"["list","string"]"#
        );
        assert_eq!(
            json(AttributeType::map(AttributeType::set(AttributeType::Int64))),
            r#"["map",["set","number"]]"#
        );

        let object = AttributeType::object(BTreeMap::from([
            ("id".to_string(), AttributeType::Int64),
            ("name".to_string(), AttributeType::String),
        ]));
        assert_eq!(json(object), r#"["object",{"id":"number","name":"string"}]"#);
    }

    #[test]
    fn test_computed_only() {
        assert!(AttributeFlags::computed().is_computed_only());
        assert!(!AttributeFlags::required().is_computed_only());
        let optional_computed = AttributeFlags {
            optional: true,
            computed: true,
            ..Default::default()
        };
        assert!(!optional_computed.is_computed_only());
    }

    #[test]
    fn test_nested_attribute_types() {
        let single = Attribute::single_nested(
            [
                ("id", Attribute::required_int64()),
                ("name", Attribute::required_string()),
            ],
            AttributeFlags::required(),
        );
        let nested = single.nested.as_ref().unwrap();
        assert_eq!(nested.nesting, NestingMode::Single);
        assert_eq!(nested.attributes.len(), 2);
        assert!(matches!(single.attr_type, AttributeType::Object(_)));

        let list = Attribute::list_nested(
            [("name", Attribute::optional_string())],
            AttributeFlags::optional(),
        );
        assert_eq!(
            String::from_utf8(list.value_type().to_json_bytes()).unwrap(),
            r#"["list",["object",{"name":"string"}]]"#
        );
    }

    #[test]
    fn test_provider_schema_lookup() {
        let schema = ProviderSchema::new()
            .with_provider_config(Schema::v0().with_attribute("server", Attribute::optional_string()))
            .with_resource(
                "petstore_pet",
                Schema::v0().with_attribute(
                    "category",
                    Attribute::single_nested(
                        [("name", Attribute::required_string())],
                        AttributeFlags::required(),
                    )
                    .with_force_new(),
                ),
            )
            .with_data_source(
                "petstore_user",
                Schema::v0().with_attribute("password", Attribute::computed_string().sensitive()),
            );

        assert!(schema.resources["petstore_pet"].block.attributes["category"].force_new);
        assert!(schema.data_sources["petstore_user"].block.attributes["password"].flags.sensitive);
        assert!(schema.provider.block.attributes["server"].flags.optional);
    }

    #[test]
    fn test_replacement_paths() {
        let schema = Schema::v0()
            .with_attribute("name", Attribute::required_string())
            .with_attribute("zone", Attribute::required_string().with_force_new())
            .with_attribute(
                "labels",
                Attribute::optional_list(AttributeType::String).with_force_new(),
            );

        let prior = DynamicValue::object([
            ("name", DynamicValue::from("a")),
            ("zone", DynamicValue::from("eu")),
            ("labels", DynamicValue::Null),
        ]);

        let rename = DynamicValue::object([
            ("name", DynamicValue::from("b")),
            ("zone", DynamicValue::from("eu")),
            ("labels", DynamicValue::Null),
        ]);
        assert!(schema.replacement_paths(&prior, &rename).is_empty());

        let moved = DynamicValue::object([
            ("name", DynamicValue::from("a")),
            ("zone", DynamicValue::from("us")),
            ("labels", DynamicValue::Unknown),
        ]);
        assert_eq!(
            schema.replacement_paths(&prior, &moved),
            vec!["labels".to_string(), "zone".to_string()]
        );
    }

    #[test]
    fn test_has_errors_ignores_warnings() {
        let missing = Diagnostic::error("Unknown Petstore API Host").with_attribute("server");
        assert!(missing.is_error());
        assert!(has_errors(&[Diagnostic::warning("deprecated"), missing]));
        assert!(!has_errors(&[Diagnostic::warning("deprecated")]));
        assert!(!has_errors(&[]));
    }
}
