//! Cache-key derivation: a content digest of (document, variables).
//!
//! The key must be deterministic under variable insertion order, so the
//! variables are serialized in canonical form (keys sorted lexicographically
//! at every nesting level, compact separators) before hashing. SHA-256 keeps
//! collision probability negligible at any realistic cache size; nothing
//! here depends on cryptographic strength.

use std::fmt;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::request::Variables;

/// A deterministic digest of one (document, variables) pair, used as the
/// result-cache key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Derive the fingerprint of `document` with `variables`.
    pub fn of(document: &str, variables: &Variables) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(document.as_bytes());
        hasher.update(canonical_json(&Value::Object(variables.clone())).as_bytes());
        Self(hasher.finalize().into())
    }

    /// Hex form of the digest.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Serialize `value` in canonical form: object keys sorted lexicographically
/// at every nesting level, compact separators.
pub fn canonical_json(value: &Value) -> String {
    // A canonicalized Value has string keys and finite numbers throughout,
    // so serialization cannot fail.
    serde_json::to_string(&canonicalize(value)).expect("canonical JSON serialization is infallible")
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        scalar => scalar.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn variables(value: Value) -> Variables {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test variables must be objects"),
        }
    }

    #[test]
    fn key_is_independent_of_insertion_order() {
        let q = "query ($a: Int!, $b: Int!) { sum(a: $a, b: $b) }";
        let ab = variables(json!({"a": 1, "b": 2}));
        let ba = {
            let mut m = Map::new();
            m.insert("b".to_string(), json!(2));
            m.insert("a".to_string(), json!(1));
            m
        };
        assert_eq!(Fingerprint::of(q, &ab), Fingerprint::of(q, &ba));
    }

    #[test]
    fn key_depends_on_document_and_values() {
        let vars = variables(json!({"a": 1}));
        assert_ne!(
            Fingerprint::of("{ books { id } }", &vars),
            Fingerprint::of("{ authors { id } }", &vars)
        );
        assert_ne!(
            Fingerprint::of("{ books { id } }", &vars),
            Fingerprint::of("{ books { id } }", &variables(json!({"a": 2})))
        );
    }

    #[test]
    fn canonical_form_sorts_nested_objects() {
        let value = json!({"z": {"b": 2, "a": 1}, "a": [{"y": 0, "x": 0}]});
        assert_eq!(
            canonical_json(&value),
            r#"{"a":[{"x":0,"y":0}],"z":{"a":1,"b":2}}"#
        );
    }

    #[test]
    fn canonical_form_preserves_scalars() {
        let value = json!({"s": "a \"quoted\" string", "n": 1.5, "b": true, "nil": null});
        assert_eq!(
            canonical_json(&value),
            r#"{"b":true,"n":1.5,"nil":null,"s":"a \"quoted\" string"}"#
        );
    }

    #[test]
    fn hex_form_is_stable() {
        let vars = variables(json!({}));
        let fp = Fingerprint::of("{ books { id } }", &vars);
        assert_eq!(fp.to_hex().len(), 64);
        assert_eq!(fp.to_hex(), Fingerprint::of("{ books { id } }", &vars).to_hex());
    }
}
