//! JSON mapping shared by every TestRail entity.
//!
//! # Design
//! Entities only derive serde and name themselves; hydration and
//! serialization rules live here so no call site converts by hand.
//!
//! - `from_json` tolerates undeclared keys and drops them. `TestResult` and
//!   `Run` collect them into a flattened `custom_fields` map instead.
//! - `from_json_strict` rejects undeclared keys.
//! - `to_json(false)` omits absent values ("leave unchanged" on update);
//!   `to_json(true)` emits every declared field, absent ones as `null`.
//!   Keys named by `custom_keys` are sent as given, so an explicit `null`
//!   there clears the custom field.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Identifier assigned by TestRail. Never generated locally.
pub type ModelId = u64;

/// UNIX timestamp in seconds, as TestRail reports `created_on` and friends.
pub type Timestamp = i64;

/// A TestRail entity with a bidirectional JSON mapping.
pub trait Model: Serialize + DeserializeOwned {
    /// Entity name used in error messages.
    const NAME: &'static str;

    /// Hydrate an entity from a decoded JSON payload.
    ///
    /// Fails when a required field is missing or `null`, or when a value has
    /// the wrong JSON type.
    fn from_json(payload: Value) -> Result<Self> {
        serde_json::from_value(payload).map_err(|source| Error::Decode {
            entity: Self::NAME,
            source,
        })
    }

    /// Like `from_json`, but rejects keys the entity does not declare.
    fn from_json_strict(payload: Value) -> Result<Self> {
        let keys: Vec<String> = match &payload {
            Value::Object(map) => map.keys().cloned().collect(),
            _ => Vec::new(),
        };
        let entity = Self::from_json(payload)?;
        let known = entity.to_json(true)?;
        if let Some(field) = keys.into_iter().find(|key| !known.contains_key(key)) {
            return Err(Error::UnknownField {
                entity: Self::NAME,
                field,
            });
        }
        Ok(entity)
    }

    /// Top-level keys that bypass null stripping.
    fn custom_keys(&self) -> Vec<&str> {
        Vec::new()
    }

    /// Serialize into a field-name-to-value mapping usable as a request body.
    fn to_json(&self, include_none: bool) -> Result<Map<String, Value>> {
        match serde_json::to_value(self).map_err(Error::Serialize)? {
            Value::Object(mut map) => {
                if !include_none {
                    let keep = self.custom_keys();
                    map.retain(|key, value| !value.is_null() || keep.contains(&key.as_str()));
                    for (key, value) in map.iter_mut() {
                        if !keep.contains(&key.as_str()) {
                            strip_value(value);
                        }
                    }
                }
                Ok(map)
            }
            _ => Err(Error::UnexpectedResponse {
                expected: "a JSON object",
            }),
        }
    }
}

/// Hydrate every element of a JSON array.
pub fn from_json_list<M: Model>(payload: Value) -> Result<Vec<M>> {
    match payload {
        Value::Array(items) => items.into_iter().map(M::from_json).collect(),
        _ => Err(Error::UnexpectedResponse {
            expected: "a JSON array",
        }),
    }
}

/// Remove `null` entries, descending into nested objects and into objects
/// held by arrays. Array elements themselves are never removed.
fn strip_nulls(map: &mut Map<String, Value>) {
    map.retain(|_, value| !value.is_null());
    for value in map.values_mut() {
        strip_value(value);
    }
}

fn strip_value(value: &mut Value) {
    match value {
        Value::Object(map) => strip_nulls(map),
        Value::Array(items) => items.iter_mut().for_each(strip_value),
        _ => {}
    }
}
