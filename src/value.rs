//! Terraform dynamic values.
//!
//! Terraform exchanges configuration, plans and state as msgpack-encoded
//! values conforming to the schema's type. Stored state being upgraded
//! arrives as JSON instead. [`DynamicValue`] is the in-memory form of both,
//! and additionally carries *unknown* values, which only exist in plans and
//! configuration.
//!
//! Resource implementations rarely match on [`DynamicValue`] directly.
//! Instead they decode it into a serde model with [`DynamicValue::decode`]
//! and encode the result back with [`DynamicValue::encode`].
//!
//! ```
//! use terraform_provider_petstore::value::DynamicValue;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Model {
//!     id: Option<String>,
//!     name: Option<String>,
//! }
//!
//! let value = DynamicValue::object([("name", DynamicValue::from("rex"))]);
//! let model: Model = value.decode().unwrap();
//! assert_eq!(model.name.as_deref(), Some("rex"));
//! assert!(model.id.is_none());
//!
//! let state = DynamicValue::encode(&model).unwrap();
//! assert!(state.get("id").unwrap().is_null());
//! ```

use std::collections::BTreeMap;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::ProviderError;

/// msgpack extension type cty uses to mark a value as unknown.
const UNKNOWN_EXT_TYPE: i8 = 0;

/// A Terraform value as carried over the plugin protocol.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DynamicValue {
    /// A null value (also used for attributes absent from an object).
    #[default]
    Null,
    /// A value that will only be known after apply.
    Unknown,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    /// Lists, sets and tuples.
    List(Vec<DynamicValue>),
    /// Objects and maps.
    Object(BTreeMap<String, DynamicValue>),
}

impl DynamicValue {
    /// Build an object value from attribute pairs.
    pub fn object<K: Into<String>>(attrs: impl IntoIterator<Item = (K, DynamicValue)>) -> Self {
        DynamicValue::Object(attrs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DynamicValue::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, DynamicValue::Unknown)
    }

    /// Whether this value, or anything nested inside it, is unknown.
    pub fn contains_unknown(&self) -> bool {
        match self {
            DynamicValue::Unknown => true,
            DynamicValue::List(items) => items.iter().any(DynamicValue::contains_unknown),
            DynamicValue::Object(attrs) => attrs.values().any(DynamicValue::contains_unknown),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DynamicValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DynamicValue::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, DynamicValue>> {
        match self {
            DynamicValue::Object(attrs) => Some(attrs),
            _ => None,
        }
    }

    /// Look up an attribute of an object value.
    pub fn get(&self, key: &str) -> Option<&DynamicValue> {
        self.as_object()?.get(key)
    }

    /// Set an attribute on an object value. Does nothing for other kinds.
    pub fn set(&mut self, key: impl Into<String>, value: DynamicValue) {
        if let DynamicValue::Object(attrs) = self {
            attrs.insert(key.into(), value);
        }
    }

    /// Short, user-facing name of the value's kind.
    pub fn kind(&self) -> &'static str {
        match self {
            DynamicValue::Null => "null",
            DynamicValue::Unknown => "unknown",
            DynamicValue::Bool(_) => "bool",
            DynamicValue::Number(_) => "number",
            DynamicValue::String(_) => "string",
            DynamicValue::List(_) => "list",
            DynamicValue::Object(_) => "object",
        }
    }

    // =========================================================================
    // serde models
    // =========================================================================

    /// Decode into a serde model. Unknown values decode as null.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ProviderError> {
        Ok(serde_json::from_value(self.to_json())?)
    }

    /// Encode a serde model. `None` fields become null attributes, so every
    /// field of the model is present in the resulting object.
    pub fn encode<T: Serialize>(model: &T) -> Result<Self, ProviderError> {
        Ok(Self::from_json(serde_json::to_value(model)?))
    }

    /// Convert to JSON, mapping unknown values to null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            DynamicValue::Null | DynamicValue::Unknown => serde_json::Value::Null,
            DynamicValue::Bool(b) => serde_json::Value::Bool(*b),
            DynamicValue::Number(n) => serde_json::Value::Number(n.clone()),
            DynamicValue::String(s) => serde_json::Value::String(s.clone()),
            DynamicValue::List(items) => {
                serde_json::Value::Array(items.iter().map(DynamicValue::to_json).collect())
            }
            DynamicValue::Object(attrs) => serde_json::Value::Object(
                attrs
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => DynamicValue::Null,
            serde_json::Value::Bool(b) => DynamicValue::Bool(b),
            serde_json::Value::Number(n) => DynamicValue::Number(n),
            serde_json::Value::String(s) => DynamicValue::String(s),
            serde_json::Value::Array(items) => {
                DynamicValue::List(items.into_iter().map(DynamicValue::from_json).collect())
            }
            serde_json::Value::Object(attrs) => DynamicValue::Object(
                attrs
                    .into_iter()
                    .map(|(k, v)| (k, DynamicValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    // =========================================================================
    // Wire encodings
    // =========================================================================

    /// Decode a msgpack payload. An empty payload is null.
    pub fn from_msgpack(data: &[u8]) -> Result<Self, ProviderError> {
        if data.is_empty() {
            return Ok(DynamicValue::Null);
        }
        let mut reader = data;
        let value = rmpv::decode::read_value(&mut reader)
            .map_err(|e| ProviderError::Encoding(format!("invalid msgpack value: {}", e)))?;
        Self::from_rmpv(value)
    }

    /// Decode stored JSON state. An empty payload is null.
    pub fn from_json_slice(data: &[u8]) -> Result<Self, ProviderError> {
        if data.is_empty() {
            return Ok(DynamicValue::Null);
        }
        Ok(Self::from_json(serde_json::from_slice(data)?))
    }

    pub fn to_msgpack(&self) -> Result<Vec<u8>, ProviderError> {
        let mut buf = Vec::new();
        rmpv::encode::write_value(&mut buf, &self.to_rmpv())
            .map_err(|e| ProviderError::Encoding(format!("cannot encode msgpack value: {}", e)))?;
        Ok(buf)
    }

    fn from_rmpv(value: rmpv::Value) -> Result<Self, ProviderError> {
        Ok(match value {
            rmpv::Value::Nil => DynamicValue::Null,
            rmpv::Value::Boolean(b) => DynamicValue::Bool(b),
            rmpv::Value::Integer(i) => {
                if let Some(n) = i.as_i64() {
                    DynamicValue::Number(n.into())
                } else if let Some(n) = i.as_u64() {
                    DynamicValue::Number(n.into())
                } else {
                    return Err(ProviderError::Encoding(format!("integer out of range: {}", i)));
                }
            }
            rmpv::Value::F32(f) => float_value(f as f64)?,
            rmpv::Value::F64(f) => float_value(f)?,
            rmpv::Value::String(s) => match s.into_str() {
                Some(s) => DynamicValue::String(s),
                None => return Err(ProviderError::Encoding("string is not valid UTF-8".into())),
            },
            rmpv::Value::Binary(_) => {
                return Err(ProviderError::Encoding("unexpected binary value".into()))
            }
            rmpv::Value::Array(items) => DynamicValue::List(
                items
                    .into_iter()
                    .map(Self::from_rmpv)
                    .collect::<Result<_, _>>()?,
            ),
            rmpv::Value::Map(entries) => {
                let mut attrs = BTreeMap::new();
                for (key, value) in entries {
                    let key = match key {
                        rmpv::Value::String(s) => s.into_str().ok_or_else(|| {
                            ProviderError::Encoding("object key is not valid UTF-8".into())
                        })?,
                        other => {
                            return Err(ProviderError::Encoding(format!(
                                "object key must be a string, got {}",
                                other
                            )))
                        }
                    };
                    attrs.insert(key, Self::from_rmpv(value)?);
                }
                DynamicValue::Object(attrs)
            }
            // Any extension is an unknown value; newer Terraform versions
            // attach refinements with other extension types.
            rmpv::Value::Ext(_, _) => DynamicValue::Unknown,
        })
    }

    fn to_rmpv(&self) -> rmpv::Value {
        match self {
            DynamicValue::Null => rmpv::Value::Nil,
            DynamicValue::Unknown => rmpv::Value::Ext(UNKNOWN_EXT_TYPE, vec![0]),
            DynamicValue::Bool(b) => rmpv::Value::Boolean(*b),
            DynamicValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    rmpv::Value::from(i)
                } else if let Some(u) = n.as_u64() {
                    rmpv::Value::from(u)
                } else {
                    rmpv::Value::F64(n.as_f64().unwrap_or_default())
                }
            }
            DynamicValue::String(s) => rmpv::Value::from(s.as_str()),
            DynamicValue::List(items) => {
                rmpv::Value::Array(items.iter().map(DynamicValue::to_rmpv).collect())
            }
            DynamicValue::Object(attrs) => rmpv::Value::Map(
                attrs
                    .iter()
                    .map(|(k, v)| (rmpv::Value::from(k.as_str()), v.to_rmpv()))
                    .collect(),
            ),
        }
    }
}

fn float_value(f: f64) -> Result<DynamicValue, ProviderError> {
    serde_json::Number::from_f64(f)
        .map(DynamicValue::Number)
        .ok_or_else(|| ProviderError::Encoding(format!("number is not finite: {}", f)))
}

impl From<&str> for DynamicValue {
    fn from(s: &str) -> Self {
        DynamicValue::String(s.to_string())
    }
}

impl From<String> for DynamicValue {
    fn from(s: String) -> Self {
        DynamicValue::String(s)
    }
}

impl From<i64> for DynamicValue {
    fn from(n: i64) -> Self {
        DynamicValue::Number(n.into())
    }
}

impl From<i32> for DynamicValue {
    fn from(n: i32) -> Self {
        DynamicValue::Number(n.into())
    }
}

impl From<bool> for DynamicValue {
    fn from(b: bool) -> Self {
        DynamicValue::Bool(b)
    }
}
