//! Deterministic serialization of vote payloads (wire contract v1).
//!
//! Two semantically identical payloads must hash identically regardless of
//! map insertion order, so object keys are sorted bytewise at every nesting
//! level before hashing. Arrays keep their order, numbers use serde_json's
//! default formatting, and timestamps are rendered in chrono's RFC3339
//! serde form. Changing any of this breaks every previously issued token.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Serialize a value as canonical compact JSON.
pub fn canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let value = serde_json::to_value(value)?;
    let mut out = Vec::new();
    write_value(&value, &mut out)?;
    Ok(out)
}

/// SHA-256 digest of the canonical serialization of a value.
pub fn hash<T: Serialize>(value: &T) -> Result<[u8; 32], serde_json::Error> {
    let bytes = canonical_bytes(value)?;
    Ok(Sha256::digest(&bytes).into())
}

fn write_value(value: &Value, out: &mut Vec<u8>) -> Result<(), serde_json::Error> {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
            out.push(b'{');
            for (i, (key, value)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                serde_json::to_writer(&mut *out, key)?;
                out.push(b':');
                write_value(value, out)?;
            }
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_value(item, out)?;
            }
            out.push(b']');
        }
        scalar => serde_json::to_writer(&mut *out, scalar)?,
    }
    Ok(())
}
