//! Canonical JSON encoding for domain hashing.
//!
//! All hashes in this system are SHA-256 over a canonical serialization:
//! object keys ordered lexicographically, numbers rendered without
//! trailing zeros, strings as-is. `serde_json::Value`'s `Map` is backed by
//! a `BTreeMap` when the `preserve_order` feature is off, which is the
//! case here, so `to_string` on a `Value` already yields sorted keys at
//! every nesting level.

use crate::hash::Hash256;
use serde::Serialize;
use serde_json::Value;

/// Re-serializes `value` with object keys in lexicographic order at every
/// level and returns the resulting bytes.
pub fn canonical_bytes<T: Serialize>(value: &T) -> serde_json::Result<Vec<u8>> {
    let as_value: Value = serde_json::to_value(value)?;
    Ok(sorted(&as_value).to_string().into_bytes())
}

/// Hashes `value`'s canonical encoding with SHA-256.
pub fn canonical_hash<T: Serialize>(value: &T) -> serde_json::Result<Hash256> {
    Ok(Hash256::sha256(&canonical_bytes(value)?))
}

fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted_map = serde_json::Map::new();
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                sorted_map.insert(key.clone(), sorted(&map[key]));
            }
            Value::Object(sorted_map)
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}
