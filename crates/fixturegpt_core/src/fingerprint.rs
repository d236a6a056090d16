//! Call fingerprints.
//!
//! A fingerprint is the SHA-256 digest of a call's canonical form:
//! `{"args": [...], "kwargs": {...}, "name": "..."}` with every object's keys
//! sorted recursively. Positional order is preserved.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A SHA-256 call fingerprint (256 bits / 32 bytes)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// The number of bytes in a fingerprint
    pub const LEN: usize = 32;

    /// Fingerprint a call from its name and already-resolved arguments
    #[must_use]
    pub fn of(name: &str, args: &[Value], kwargs: &BTreeMap<String, Value>) -> Self {
        Self::digest(canonical_form(name, args, kwargs).as_bytes())
    }

    /// SHA-256 of raw bytes
    #[must_use]
    pub fn digest(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Create from bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get as bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to lowercase hex string
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 16 hex characters, for display
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }

    /// Parse from hex string
    ///
    /// # Errors
    ///
    /// Returns error if hex is invalid or not 32 bytes
    pub fn from_hex(hex: &str) -> CoreResult<Self> {
        let bytes = hex::decode(hex).map_err(|e| CoreError::InvalidFingerprint {
            reason: e.to_string(),
        })?;
        let arr: [u8; 32] =
            bytes
                .try_into()
                .map_err(|bytes: Vec<u8>| CoreError::InvalidFingerprint {
                    reason: format!("expected 32 bytes, got {}", bytes.len()),
                })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short())
    }
}

impl FromStr for Fingerprint {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl AsRef<[u8]> for Fingerprint {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

/// Recursively sort object keys so equal values render to equal text
#[must_use]
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> =
                map.iter().map(|(k, v)| (k, canonicalize(v))).collect();
            let mut out = Map::with_capacity(sorted.len());
            for (k, v) in sorted {
                out.insert(k.clone(), v);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Compact canonical text that the fingerprint is computed over
#[must_use]
pub fn canonical_form(name: &str, args: &[Value], kwargs: &BTreeMap<String, Value>) -> String {
    let mut doc = Map::with_capacity(3);
    doc.insert(
        "args".to_string(),
        Value::Array(args.iter().map(canonicalize).collect()),
    );
    let mut sorted_kwargs = Map::with_capacity(kwargs.len());
    for (k, v) in kwargs {
        sorted_kwargs.insert(k.clone(), canonicalize(v));
    }
    doc.insert("kwargs".to_string(), Value::Object(sorted_kwargs));
    doc.insert("name".to_string(), Value::String(name.to_string()));
    Value::Object(doc).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn kwargs(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_fingerprint_hex_length() {
        let fp = Fingerprint::of("greet", &[json!("Alice")], &BTreeMap::new());
        assert_eq!(fp.to_hex().len(), 64);
        assert_eq!(fp.short().len(), 16);
        assert!(fp.to_hex().starts_with(&fp.short()));
    }

    #[test]
    fn test_fingerprint_from_to_hex() {
        let fp = Fingerprint::digest(b"test");
        let restored = Fingerprint::from_hex(&fp.to_hex()).unwrap();
        assert_eq!(fp, restored);
        assert_eq!(fp.to_string().parse::<Fingerprint>().unwrap(), fp);
    }

    #[test]
    fn test_fingerprint_rejects_bad_hex() {
        assert!(Fingerprint::from_hex("zz").is_err());
        assert!(matches!(
            Fingerprint::from_hex("abcd"),
            Err(CoreError::InvalidFingerprint { .. })
        ));
    }

    #[test]
    fn test_known_digest_is_stable() {
        // Pinned so that a change to the canonical form is caught across releases.
        let form = canonical_form("greet", &[json!("Alice")], &BTreeMap::new());
        assert_eq!(form, r#"{"args":["Alice"],"kwargs":{},"name":"greet"}"#);
        assert_eq!(
            Fingerprint::of("greet", &[json!("Alice")], &BTreeMap::new()),
            Fingerprint::digest(form.as_bytes())
        );
    }

    #[test]
    fn test_name_is_part_of_identity() {
        let a = Fingerprint::of("a", &[json!(1)], &BTreeMap::new());
        let b = Fingerprint::of("b", &[json!(1)], &BTreeMap::new());
        assert_ne!(a, b);
    }

    #[test]
    fn test_nested_objects_are_canonicalized() {
        let left = json!({"outer": {"b": 1, "a": [ {"y": 2, "x": 1} ]}});
        let right = json!({"outer": {"a": [ {"x": 1, "y": 2} ], "b": 1}});
        assert_eq!(canonicalize(&left).to_string(), canonicalize(&right).to_string());

        let fp1 = Fingerprint::of("q", &[left], &BTreeMap::new());
        let fp2 = Fingerprint::of("q", &[right], &BTreeMap::new());
        assert_eq!(fp1, fp2);
    }

    #[test]
    fn test_kwargs_vs_args_are_distinct() {
        let positional = Fingerprint::of("f", &[json!(5)], &BTreeMap::new());
        let keyword = Fingerprint::of("f", &[], &kwargs(&[("x", json!(5))]));
        assert_ne!(positional, keyword);
    }

    #[test]
    fn test_serde_as_hex_string() {
        let fp = Fingerprint::digest(b"serde");
        let encoded = serde_json::to_string(&fp).unwrap();
        assert_eq!(encoded, format!("\"{}\"", fp.to_hex()));
        let decoded: Fingerprint = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, fp);
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            "[a-z]{0,8}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 16, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_fingerprint_is_stable(
            name in "[a-z_]{1,12}",
            args in prop::collection::vec(arb_json(), 0..4),
            kw in prop::collection::btree_map("[a-z]{1,6}", arb_json(), 0..4),
        ) {
            let first = Fingerprint::of(&name, &args, &kw);
            let second = Fingerprint::of(&name, &args.clone(), &kw.clone());
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_key_insertion_order_does_not_matter(
            entries in prop::collection::btree_map("[a-z]{1,6}", arb_json(), 0..6),
        ) {
            let mut forward = Map::new();
            for (k, v) in &entries {
                forward.insert(k.clone(), v.clone());
            }
            let mut backward = Map::new();
            for (k, v) in entries.iter().rev() {
                backward.insert(k.clone(), v.clone());
            }
            let kw: BTreeMap<String, Value> = entries.clone().into_iter().collect();
            prop_assert_eq!(
                Fingerprint::of("f", &[Value::Object(forward)], &kw),
                Fingerprint::of("f", &[Value::Object(backward)], &kw)
            );
        }

        #[test]
        fn prop_positional_order_matters(a in any::<i64>(), b in any::<i64>()) {
            prop_assume!(a != b);
            let ab = Fingerprint::of("f", &[json!(a), json!(b)], &BTreeMap::new());
            let ba = Fingerprint::of("f", &[json!(b), json!(a)], &BTreeMap::new());
            prop_assert_ne!(ab, ba);
        }
    }
}
