//! Serializer contract
//!
//! The commit log never inspects payload bytes itself. It hands typed values
//! to a [`Serializer`] and stores whatever comes back, next to the type tag
//! (see [`crate::value::Payload`]).
//!
//! Two formats ship with the crate:
//! - [`MsgPackSerializer`]: MessagePack with named fields (default)
//! - [`JsonSerializer`]: JSON, handy when a human needs to read the store
//!
//! [`SerializerKind`] picks one at configuration time and dispatches to it.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Narrow serialization contract
///
/// Implementations must round-trip primitive values, identifiers, date/time
/// values and nested typed objects without loss, and preserve element count
/// and order of sequences.
pub trait Serializer: Send + Sync {
    /// Short format name, used in logs
    fn name(&self) -> &'static str;

    /// Serialize a value to bytes
    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;

    /// Deserialize bytes into the expected shape
    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;
}

/// MessagePack serializer (rmp-serde, struct fields written by name)
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackSerializer;

impl Serializer for MsgPackSerializer {
    fn name(&self) -> &'static str {
        "msgpack"
    }

    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

/// JSON serializer (serde_json)
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn name(&self) -> &'static str {
        "json"
    }

    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Serializer selected by configuration
// Only `Deserialize` is derived: a derived `serde::Serialize` would make
// `kind.serialize(..)` ambiguous with `Serializer::serialize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializerKind {
    /// MessagePack
    #[default]
    MsgPack,
    /// JSON
    Json,
}

impl Serializer for SerializerKind {
    fn name(&self) -> &'static str {
        match self {
            SerializerKind::MsgPack => MsgPackSerializer.name(),
            SerializerKind::Json => JsonSerializer.name(),
        }
    }

    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        match self {
            SerializerKind::MsgPack => MsgPackSerializer.serialize(value),
            SerializerKind::Json => JsonSerializer.serialize(value),
        }
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        match self {
            SerializerKind::MsgPack => MsgPackSerializer.deserialize(bytes),
            SerializerKind::Json => JsonSerializer.deserialize(bytes),
        }
    }
}
