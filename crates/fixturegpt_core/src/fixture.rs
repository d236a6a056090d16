//! Fixtures: a call's identity paired with its captured response.

use crate::error::CoreResult;
use crate::fingerprint::Fingerprint;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Key marking a string-fallback record inside `response`
pub const FALLBACK_MARKER: &str = "$fallback";
const FALLBACK_KIND: &str = "string";
const FALLBACK_REPR: &str = "repr";

/// A captured value, resolved once at capture time.
///
/// On disk a `Json` payload is the value itself; a `StringFallback` is
/// `{"$fallback": "string", "repr": "<text>"}`.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Value representable as JSON
    Json(Value),
    /// Value that could not be represented; only its `Debug` form is kept
    StringFallback(String),
}

impl Payload {
    /// Capture a value, degrading to its `Debug` text when it has no JSON form.
    ///
    /// Degradation is never an error; it is reported as a `warn` diagnostic.
    pub fn capture<T>(value: &T) -> Self
    where
        T: Serialize + fmt::Debug + ?Sized,
    {
        match serde_json::to_value(value) {
            Ok(json) => Self::Json(json),
            Err(err) => {
                tracing::warn!(error = %err, "value is not JSON-representable; storing its string form");
                Self::StringFallback(format!("{value:?}"))
            }
        }
    }

    /// Whether this payload is a string fallback
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::StringFallback(_))
    }

    /// Flatten into a plain JSON value; fallbacks become strings
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::StringFallback(text) => Value::String(text),
        }
    }

    /// Decode into a concrete type.
    ///
    /// A fallback decodes only into types that accept a JSON string.
    ///
    /// # Errors
    ///
    /// Returns error if the stored shape does not match `T`
    pub fn decode<T: DeserializeOwned>(&self) -> CoreResult<T> {
        let value = match self {
            Self::Json(value) => value.clone(),
            Self::StringFallback(text) => Value::String(text.clone()),
        };
        Ok(serde_json::from_value(value)?)
    }

    fn from_value(value: Value) -> Self {
        if let Value::Object(map) = &value {
            if map.len() == 2
                && map.get(FALLBACK_MARKER).and_then(Value::as_str) == Some(FALLBACK_KIND)
            {
                if let Some(text) = map.get(FALLBACK_REPR).and_then(Value::as_str) {
                    return Self::StringFallback(text.to_string());
                }
            }
        }
        Self::Json(value)
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Json(value) => value.serialize(serializer),
            Self::StringFallback(text) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry(FALLBACK_MARKER, FALLBACK_KIND)?;
                map.serialize_entry(FALLBACK_REPR, text)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from_value)
    }
}

/// Storage tier a fixture was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tier {
    /// Local durable store
    #[default]
    Local,
    /// Remote service
    Cloud,
}

impl Tier {
    /// Stable lowercase name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Cloud => "cloud",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted call outcome, identified by `(name, fingerprint)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    /// User-chosen call label
    pub name: String,
    /// Digest of name and arguments
    pub fingerprint: Fingerprint,
    /// Positional arguments, in call order
    #[serde(default)]
    pub args: Vec<Value>,
    /// Keyword arguments
    #[serde(default)]
    pub kwargs: BTreeMap<String, Value>,
    /// Captured response
    pub response: Payload,
    /// When the response was captured
    pub timestamp: DateTime<Utc>,
    /// Tier this copy came from; not persisted
    #[serde(skip)]
    pub source: Tier,
}

impl Fixture {
    /// Build a fixture for a call, fingerprinting it and stamping the current time
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        args: Vec<Value>,
        kwargs: BTreeMap<String, Value>,
        response: Payload,
    ) -> Self {
        let name = name.into();
        let fingerprint = Fingerprint::of(&name, &args, &kwargs);
        Self::with_fingerprint(name, fingerprint, args, kwargs, response)
    }

    /// Build a fixture with a precomputed fingerprint
    #[must_use]
    pub fn with_fingerprint(
        name: impl Into<String>,
        fingerprint: Fingerprint,
        args: Vec<Value>,
        kwargs: BTreeMap<String, Value>,
        response: Payload,
    ) -> Self {
        Self {
            name: name.into(),
            fingerprint,
            args,
            kwargs,
            response,
            timestamp: Utc::now(),
            source: Tier::Local,
        }
    }

    /// Mark the tier this copy was loaded from
    #[must_use]
    pub fn with_source(mut self, tier: Tier) -> Self {
        self.source = tier;
        self
    }

    /// Whether this fixture sits at `(name, fingerprint)`
    #[must_use]
    pub fn is_keyed(&self, name: &str, fingerprint: &Fingerprint) -> bool {
        self.name == name && self.fingerprint == *fingerprint
    }
}
