//! Value types for commit headers and payloads
//!
//! Commit headers, event bodies and snapshot payloads are dynamically typed:
//! a header map may hold a string next to an integer next to a domain object.
//! Two types cover this:
//!
//! - [`Value`]: a closed set of variants for header values. Nested domain
//!   objects go in [`Value::Payload`].
//! - [`Payload`]: an opaque typed value. The type tag travels next to the
//!   serialized bytes, so type identity survives a storage round trip without
//!   runtime reflection.
//!
//! ## Equality Rules
//!
//! - Different variants are NEVER equal (no type coercion)
//! - `Int(1)` != `Float(1.0)`
//! - `String("abc")` != `Bytes([97, 98, 99])`
//! - Float uses IEEE-754 equality: `NaN != NaN`, `-0.0 == 0.0`
//! - Two payloads are equal when both the type tag and the bytes match

use crate::error::{Error, Result};
use crate::serializer::Serializer;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Capability a domain type implements to be stored as a [`Payload`]
///
/// `TYPE_NAME` must be unique among the types stored in one log and must not
/// change once data has been written with it.
///
/// # Examples
///
/// ```
/// use chronolog_core::value::PayloadType;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct OrderPlaced {
///     order_id: u64,
/// }
///
/// impl PayloadType for OrderPlaced {
///     const TYPE_NAME: &'static str = "orders.OrderPlaced";
/// }
/// ```
pub trait PayloadType: Serialize + DeserializeOwned {
    /// Stable type tag written next to the serialized bytes
    const TYPE_NAME: &'static str;
}

/// Opaque typed value: a type tag plus the serializer's bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Payload {
    type_name: String,
    data: Vec<u8>,
}

impl Payload {
    /// Build a payload from raw parts
    ///
    /// Use this when bytes were produced elsewhere; the tag is taken as given.
    pub fn from_parts(type_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            type_name: type_name.into(),
            data,
        }
    }

    /// Serialize a typed value into a payload
    pub fn encode<T: PayloadType, S: Serializer>(value: &T, serializer: &S) -> Result<Self> {
        Ok(Self {
            type_name: T::TYPE_NAME.to_string(),
            data: serializer.serialize(value)?,
        })
    }

    /// Deserialize the payload back into `T`
    ///
    /// Fails with [`Error::Serialization`] when the stored tag is not `T`'s.
    pub fn decode<T: PayloadType, S: Serializer>(&self, serializer: &S) -> Result<T> {
        if !self.is::<T>() {
            return Err(Error::Serialization(format!(
                "payload type mismatch: stored {}, requested {}",
                self.type_name,
                T::TYPE_NAME
            )));
        }
        serializer.deserialize(&self.data)
    }

    /// Check whether this payload holds a `T`
    pub fn is<T: PayloadType>(&self) -> bool {
        self.type_name == T::TYPE_NAME
    }

    /// Stored type tag
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Serialized bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Size of the serialized bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the serialized form is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Dynamically typed header value
///
/// ## The Variants
///
/// 1. `Null` - absence of value
/// 2. `Bool` - Boolean true or false
/// 3. `Int` - 64-bit signed integer
/// 4. `Float` - 64-bit IEEE-754 floating point
/// 5. `String` - UTF-8 encoded string
/// 6. `Bytes` - Arbitrary binary data (distinct from String)
/// 7. `Uuid` - Identifier value
/// 8. `Timestamp` - UTC date/time
/// 9. `Array` - Ordered sequence of values
/// 10. `Object` - String-keyed map of values
/// 11. `Payload` - Nested domain object with its type tag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    /// Absence of value
    Null,
    /// Boolean true or false
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit IEEE-754 floating point
    Float(f64),
    /// UTF-8 encoded string
    String(String),
    /// Arbitrary binary data
    Bytes(Vec<u8>),
    /// Identifier value
    Uuid(Uuid),
    /// UTC date/time
    Timestamp(DateTime<Utc>),
    /// Ordered sequence of values
    Array(Vec<Value>),
    /// String-keyed map of values
    Object(BTreeMap<String, Value>),
    /// Nested domain object
    Payload(Payload),
}

impl Value {
    /// Returns the type name as a string (for error messages)
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::Bytes(_) => "Bytes",
            Value::Uuid(_) => "Uuid",
            Value::Timestamp(_) => "Timestamp",
            Value::Array(_) => "Array",
            Value::Object(_) => "Object",
            Value::Payload(_) => "Payload",
        }
    }

    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get as i64
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as UUID
    pub fn as_uuid(&self) -> Option<&Uuid> {
        match self {
            Value::Uuid(u) => Some(u),
            _ => None,
        }
    }

    /// Try to get as timestamp
    pub fn as_timestamp(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::Timestamp(t) => Some(t),
            _ => None,
        }
    }

    /// Try to get as nested payload
    pub fn as_payload(&self) -> Option<&Payload> {
        match self {
            Value::Payload(p) => Some(p),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            // IEEE-754: NaN != NaN, -0.0 == 0.0
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Uuid(a), Value::Uuid(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Payload(a), Value::Payload(b)) => a == b,
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Value::Uuid(u)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Timestamp(t)
    }
}

impl From<Payload> for Value {
    fn from(p: Payload) -> Self {
        Value::Payload(p)
    }
}
