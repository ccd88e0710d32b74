//! Response envelope normalization.
//!
//! The provider wraps resources inconsistently: `{"server": {...}}` for single objects,
//! `[{"server": {...}}, ...]` for most lists, and sometimes no wrapper at all. This module
//! reduces every shape to the bare resource (or array of resources) before decoding.

use crate::error::{Error, Result};
use serde_json::Value;

/// A known wrapper key and how to pull the payload out of a wrapped object.
#[derive(Debug, Clone, Copy)]
pub struct WrapperKey {
    /// Field name used by the provider
    pub name: &'static str,
    extract: fn(&mut serde_json::Map<String, Value>, &'static str) -> Option<Value>,
}

impl WrapperKey {
    const fn field(name: &'static str) -> Self {
        Self {
            name,
            extract: take_populated,
        }
    }

    fn extract(&self, object: &mut serde_json::Map<String, Value>) -> Option<Value> {
        (self.extract)(object, self.name)
    }
}

fn take_populated(
    object: &mut serde_json::Map<String, Value>,
    name: &'static str,
) -> Option<Value> {
    match object.get(name) {
        Some(Value::Null) | None => None,
        Some(_) => object.remove(name),
    }
}

/// Wrapper keys in probe order. The first populated key wins.
pub const WRAPPER_KEYS: &[WrapperKey] = &[
    WrapperKey::field("data"),
    WrapperKey::field("server"),
    WrapperKey::field("servers"),
    WrapperKey::field("firewall"),
    WrapperKey::field("ip"),
    WrapperKey::field("reset"),
    WrapperKey::field("boot"),
    WrapperKey::field("rescue"),
    WrapperKey::field("key"),
    WrapperKey::field("vswitch"),
    WrapperKey::field("rdns"),
    WrapperKey::field("failover"),
    WrapperKey::field("traffic"),
    WrapperKey::field("subnet"),
    WrapperKey::field("transaction"),
    WrapperKey::field("product"),
    WrapperKey::field("server_market_product"),
    WrapperKey::field("server_addon_product"),
    WrapperKey::field("cancellation"),
    WrapperKey::field("wol"),
    WrapperKey::field("linux"),
    WrapperKey::field("vnc"),
    WrapperKey::field("windows"),
    WrapperKey::field("plesk"),
    WrapperKey::field("cpanel"),
    WrapperKey::field("template"),
];

/// Field whose presence marks an object as an already-bare resource.
const RESOURCE_ID_FIELD: &str = "id";

/// Parse a raw body and strip its envelope.
///
/// # Errors
///
/// Returns [`Error::Parse`] if the body is not valid JSON.
pub fn unwrap(body: &[u8]) -> Result<Value> {
    let value: Value =
        serde_json::from_slice(body).map_err(|err| Error::parse("invalid response body", err))?;
    Ok(unwrap_value(value))
}

/// Strip the envelope from an already parsed value.
#[must_use]
pub fn unwrap_value(value: Value) -> Value {
    match value {
        Value::Object(object) => unwrap_object(object),
        Value::Array(items) => unwrap_items(items),
        other => other,
    }
}

/// Parse a raw body holding an array whose elements are each wrapped under `key`.
///
/// Elements that do not carry `key` are passed through unchanged.
///
/// # Errors
///
/// Returns [`Error::Parse`] if the body is not valid JSON or not an array.
pub fn unwrap_array(body: &[u8], key: &str) -> Result<Value> {
    let value: Value =
        serde_json::from_slice(body).map_err(|err| Error::parse("invalid response body", err))?;
    let Value::Array(items) = value else {
        return Err(Error::parse(
            format!("expected an array of `{key}` objects"),
            NotAnArray,
        ));
    };

    Ok(Value::Array(
        items
            .into_iter()
            .map(|item| match item {
                Value::Object(mut object) => match object.remove(key) {
                    Some(inner) => inner,
                    None => Value::Object(object),
                },
                other => other,
            })
            .collect(),
    ))
}

fn unwrap_object(mut object: serde_json::Map<String, Value>) -> Value {
    if object.contains_key(RESOURCE_ID_FIELD) {
        return Value::Object(object);
    }

    for key in WRAPPER_KEYS {
        if let Some(inner) = key.extract(&mut object) {
            return inner;
        }
    }

    Value::Object(object)
}

fn unwrap_items(items: Vec<Value>) -> Value {
    let Some(key) = items.first().and_then(detect_item_key) else {
        return Value::Array(items);
    };

    Value::Array(
        items
            .into_iter()
            .map(|item| match item {
                Value::Object(mut object) => key
                    .extract(&mut object)
                    .unwrap_or(Value::Object(object)),
                other => other,
            })
            .collect(),
    )
}

fn detect_item_key(first: &Value) -> Option<&'static WrapperKey> {
    let object = first.as_object()?;
    if object.contains_key(RESOURCE_ID_FIELD) {
        return None;
    }
    WRAPPER_KEYS
        .iter()
        .find(|key| object.get(key.name).is_some_and(|v| !v.is_null()))
}

#[derive(Debug)]
struct NotAnArray;

impl std::fmt::Display for NotAnArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("response body is not a JSON array")
    }
}

impl std::error::Error for NotAnArray {}
