//! Schema validation helpers.
//!
//! This module validates a configuration [`DynamicValue`] against a [`Schema`]
//! and reports problems as diagnostics pointing at the offending attribute.
//!
//! # Example
//!
//! ```
//! use terraform_provider_petstore::schema::{Schema, Attribute};
//! use terraform_provider_petstore::validation::validate;
//! use terraform_provider_petstore::value::DynamicValue;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute("count", Attribute::optional_int64());
//!
//! // Valid input
//! let input = DynamicValue::object([
//!     ("name", DynamicValue::from("test")),
//!     ("count", DynamicValue::from(42)),
//! ]);
//! assert!(validate(&schema, &input).is_empty());
//!
//! // Invalid input - wrong type for count
//! let input = DynamicValue::object([
//!     ("name", DynamicValue::from("test")),
//!     ("count", DynamicValue::from("not a number")),
//! ]);
//! let diagnostics = validate(&schema, &input);
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("count".to_string()));
//! ```

use std::collections::BTreeMap;

use crate::schema::{Attribute, AttributeType, Diagnostic, NestingMode, Schema};
use crate::value::DynamicValue;

/// Validate a configuration value against a schema.
///
/// Returns a list of diagnostics for any validation errors found.
/// An empty list means the value is valid.
///
/// # Validation Rules
///
/// - Required attributes must be present and non-null
/// - Optional attributes may be absent or null
/// - Computed-only attributes are skipped (provider sets these)
/// - Unknown values are accepted anywhere; they are checked once known
/// - Attribute types must match the schema
/// - Nested attributes are validated recursively
pub fn validate(schema: &Schema, value: &DynamicValue) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    match value {
        DynamicValue::Null | DynamicValue::Unknown => {}
        DynamicValue::Object(obj) => {
            validate_attributes(&schema.block.attributes, obj, "", &mut diagnostics)
        }
        other => diagnostics.push(
            Diagnostic::error("Expected object").with_detail(format!("Got {}", other.kind())),
        ),
    }
    diagnostics
}

fn validate_attributes(
    attributes: &BTreeMap<String, Attribute>,
    obj: &BTreeMap<String, DynamicValue>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (name, attr) in attributes {
        let attr_path = join_path(path, name);
        validate_attribute(attr, obj.get(name), &attr_path, diagnostics);
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&DynamicValue>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.is_computed_only() {
        return;
    }

    match value {
        None | Some(DynamicValue::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        }
        Some(DynamicValue::Unknown) => {}
        Some(v) => match &attr.nested {
            Some(nested) => validate_nested(&nested.attributes, nested.nesting, v, path, diagnostics),
            None => validate_attribute_type(&attr.attr_type, v, path, diagnostics),
        },
    }
}

fn validate_nested(
    attributes: &BTreeMap<String, Attribute>,
    nesting: NestingMode,
    value: &DynamicValue,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let object = |item: &DynamicValue, item_path: &str, diagnostics: &mut Vec<Diagnostic>| {
        match item {
            DynamicValue::Unknown => {}
            DynamicValue::Object(obj) => {
                validate_attributes(attributes, obj, item_path, diagnostics)
            }
            other => diagnostics.push(type_error(item_path, "object", other)),
        }
    };

    match (nesting, value) {
        (NestingMode::Single, item) => object(item, path, diagnostics),
        (NestingMode::List | NestingMode::Set, DynamicValue::List(items)) => {
            for (i, item) in items.iter().enumerate() {
                object(item, &format!("{}.{}", path, i), diagnostics);
            }
        }
        (NestingMode::Map, DynamicValue::Object(items)) => {
            for (key, item) in items {
                object(item, &format!("{}.{}", path, key), diagnostics);
            }
        }
        (NestingMode::List, other) => diagnostics.push(type_error(path, "list", other)),
        (NestingMode::Set, other) => diagnostics.push(type_error(path, "set", other)),
        (NestingMode::Map, other) => diagnostics.push(type_error(path, "map", other)),
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &DynamicValue,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if value.is_unknown() || value.is_null() {
        return;
    }

    match attr_type {
        AttributeType::String => {
            if value.as_str().is_none() {
                diagnostics.push(type_error(path, "string", value));
            }
        }
        AttributeType::Int64 => {
            if !is_int64(value) {
                diagnostics.push(type_error(path, "int64", value));
            }
        }
        AttributeType::Float64 => {
            if !matches!(value, DynamicValue::Number(_)) {
                diagnostics.push(type_error(path, "float64", value));
            }
        }
        AttributeType::Bool => {
            if !matches!(value, DynamicValue::Bool(_)) {
                diagnostics.push(type_error(path, "bool", value));
            }
        }
        AttributeType::List(element_type) | AttributeType::Set(element_type) => {
            if let DynamicValue::List(items) = value {
                for (i, elem) in items.iter().enumerate() {
                    let elem_path = format!("{}.{}", path, i);
                    validate_attribute_type(element_type, elem, &elem_path, diagnostics);
                }
            } else {
                let expected = if matches!(attr_type, AttributeType::Set(_)) {
                    "set"
                } else {
                    "list"
                };
                diagnostics.push(type_error(path, expected, value));
            }
        }
        AttributeType::Map(value_type) => {
            if let DynamicValue::Object(obj) = value {
                for (key, val) in obj {
                    let key_path = format!("{}.{}", path, key);
                    validate_attribute_type(value_type, val, &key_path, diagnostics);
                }
            } else {
                diagnostics.push(type_error(path, "map", value));
            }
        }
        AttributeType::Object(attrs) => {
            if let DynamicValue::Object(obj) = value {
                // Object type attributes carry no presence flags.
                for (name, attr_type) in attrs {
                    if let Some(v) = obj.get(name) {
                        validate_attribute_type(attr_type, v, &join_path(path, name), diagnostics);
                    }
                }
            } else {
                diagnostics.push(type_error(path, "object", value));
            }
        }
        AttributeType::Dynamic => {}
    }
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn is_int64(value: &DynamicValue) -> bool {
    match value {
        DynamicValue::Number(n) => {
            n.as_i64().is_some()
                || n.as_f64().is_some_and(|f| {
                    f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64
                })
        }
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, got: &DynamicValue) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, got.kind()))
        .with_attribute(path)
}
