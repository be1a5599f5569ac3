//! Strongly-typed identifier value objects.
//!
//! The wardrobe API issues integer primary keys, while derived views are
//! keyed by a slug. `RecordId` accepts both on the wire and normalises them
//! to a string so collections can be keyed uniformly.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// Identifier of an account on the wardrobe API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Creates a UserId from the server's integer key.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw integer key.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|e| ValidationError::invalid_format("user_id", e.to_string()))
    }
}

/// Key of a record inside a domain collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(String);

impl RecordId {
    /// Creates a record id, rejecting empty keys.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("record_id"));
        }
        Ok(Self(id))
    }

    /// Key for a derived view, named after its domain.
    pub(crate) fn from_slug(slug: &'static str) -> Self {
        Self(slug.to_string())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extracts a record id from a JSON value (string or integer).
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(Self(s.clone())),
            serde_json::Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Numeric keys go back out as numbers so request bodies match the API.
        match self.0.parse::<i64>() {
            Ok(n) => serializer.serialize_i64(n),
            Err(_) => serializer.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecordIdVisitor;

        impl<'de> Visitor<'de> for RecordIdVisitor {
            type Value = RecordId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string or integer record id")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<RecordId, E> {
                Ok(RecordId::from(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<RecordId, E> {
                Ok(RecordId(v.to_string()))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<RecordId, E> {
                RecordId::new(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(RecordIdVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_id_parses_from_string() {
        let id: UserId = "42".parse().unwrap();
        assert_eq!(id.as_i64(), 42);
        assert!("abc".parse::<UserId>().is_err());
    }

    #[test]
    fn record_id_rejects_empty() {
        assert!(RecordId::new("  ").is_err());
        assert_eq!(RecordId::new("style-dna").unwrap().as_str(), "style-dna");
    }

    #[test]
    fn record_id_deserializes_integers_and_strings() {
        let from_int: RecordId = serde_json::from_value(json!(17)).unwrap();
        let from_str: RecordId = serde_json::from_value(json!("17")).unwrap();
        assert_eq!(from_int, from_str);
    }

    #[test]
    fn record_id_serializes_numeric_keys_as_numbers() {
        assert_eq!(serde_json::to_value(RecordId::from(5)).unwrap(), json!(5));
        assert_eq!(
            serde_json::to_value(RecordId::new("gaps").unwrap()).unwrap(),
            json!("gaps")
        );
    }

    #[test]
    fn record_id_from_json_ignores_other_shapes() {
        assert!(RecordId::from_json(&json!(null)).is_none());
        assert!(RecordId::from_json(&json!({"id": 1})).is_none());
        assert_eq!(RecordId::from_json(&json!(3)), Some(RecordId::from(3)));
    }
}
