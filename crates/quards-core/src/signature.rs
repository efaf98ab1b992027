//! # Canonical Encoding & Signatures
//!
//! A state's identity is derived from its content:
//!
//! ```text
//! signature = hex(BLAKE3(game_id || 0x00 || canonical_json(data)))
//! ```
//!
//! The canonical encoding sorts object keys and emits no whitespace, so two
//! structurally equal values always encode to the same bytes regardless of
//! key insertion order. The same encoding is what the stores persist and what
//! the transition queue uses for its `params` natural key.

use crate::{GameId, Result, Signature};
use serde_json::Value;

/// Encode a JSON value canonically (sorted keys, compact separators).
pub fn canonical_json(value: &Value) -> Result<String> {
    let mut out = String::new();
    write_canonical(value, &mut out)?;
    Ok(out)
}

fn write_canonical(value: &Value, out: &mut String) -> Result<()> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => out.push_str(&serde_json::to_string(s)?),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key)?);
                out.push(':');
                if let Some(v) = map.get(key) {
                    write_canonical(v, out)?;
                }
            }
            out.push('}');
        }
    }
    Ok(())
}

/// Compute the signature of already-canonical state bytes.
#[must_use]
pub fn signature_of_canonical(game_id: &GameId, canonical: &str) -> Signature {
    let mut hasher = blake3::Hasher::new();
    hasher.update(game_id.as_str().as_bytes());
    hasher.update(&[0]);
    hasher.update(canonical.as_bytes());
    Signature(hasher.finalize().to_hex().to_string())
}

/// Compute the signature of a state value within a run.
pub fn signature(game_id: &GameId, data: &Value) -> Result<Signature> {
    let canonical = canonical_json(data)?;
    Ok(signature_of_canonical(game_id, &canonical))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_sorts_keys_and_strips_whitespace() {
        let value: Value =
            serde_json::from_str(r#"{ "b": [1, 2], "a": { "z": null, "y": "q" } }"#)
                .expect("parse");
        assert_eq!(
            canonical_json(&value).expect("encode"),
            r#"{"a":{"y":"q","z":null},"b":[1,2]}"#
        );
    }

    #[test]
    fn canonical_escapes_strings() {
        let value = json!({"quote\"key": "line\nbreak"});
        assert_eq!(
            canonical_json(&value).expect("encode"),
            r#"{"quote\"key":"line\nbreak"}"#
        );
    }

    #[test]
    fn signature_ignores_key_insertion_order() {
        let game = GameId::new("g");
        let a: Value = serde_json::from_str(r#"{"a":1,"b":2}"#).expect("parse");
        let b: Value = serde_json::from_str(r#"{"b":2,"a":1}"#).expect("parse");
        assert_eq!(
            signature(&game, &a).expect("sig"),
            signature(&game, &b).expect("sig")
        );
    }

    #[test]
    fn signature_changes_with_leaf_value() {
        let game = GameId::new("g");
        let a = json!({"a": 1, "b": 2});
        let b = json!({"a": 1, "b": 3});
        assert_ne!(
            signature(&game, &a).expect("sig"),
            signature(&game, &b).expect("sig")
        );
    }

    #[test]
    fn signature_is_scoped_by_game() {
        let data = json!({"turn": 0});
        assert_ne!(
            signature(&GameId::new("one"), &data).expect("sig"),
            signature(&GameId::new("two"), &data).expect("sig")
        );
    }

    #[test]
    fn signature_is_hex_blake3() {
        let sig = signature(&GameId::new("g"), &json!({})).expect("sig");
        assert_eq!(sig.as_str().len(), 64);
        assert!(sig.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }
}
