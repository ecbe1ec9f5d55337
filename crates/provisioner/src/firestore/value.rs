//! Firestore typed values as they appear on the REST wire.
//!
//! Every field value is an object with exactly one key naming its type,
//! e.g. `{"stringValue": "admin"}` or `{"integerValue": "42"}`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Document fields keyed by name.
pub type Fields = BTreeMap<String, Value>;

/// A Firestore field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    IntegerValue(#[serde(with = "int64_string")] i64),
    DoubleValue(f64),
    TimestampValue(DateTime<Utc>),
    StringValue(String),
    /// Base64-encoded bytes.
    BytesValue(String),
    /// Full resource name of another document.
    ReferenceValue(String),
    GeoPointValue(LatLng),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

/// A geographic point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

/// Array payload; the API omits `values` for an empty array.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Value>,
}

/// Map payload; the API omits `fields` for an empty map.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: Fields,
}

impl Value {
    /// Convenience constructor for a string value.
    pub fn string(s: impl Into<String>) -> Self {
        Self::StringValue(s.into())
    }

    /// The string payload, if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::StringValue(s) => Some(s),
            _ => None,
        }
    }

    /// Plain JSON rendering without the type wrappers, for display.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Self::NullValue(()) => Json::Null,
            Self::BooleanValue(b) => Json::Bool(*b),
            Self::IntegerValue(i) => Json::from(*i),
            Self::DoubleValue(d) => Json::from(*d),
            Self::TimestampValue(t) => Json::String(t.to_rfc3339()),
            Self::StringValue(s) | Self::BytesValue(s) | Self::ReferenceValue(s) => {
                Json::String(s.clone())
            }
            Self::GeoPointValue(p) => serde_json::json!({
                "latitude": p.latitude,
                "longitude": p.longitude,
            }),
            Self::ArrayValue(a) => Json::Array(a.values.iter().map(Self::to_json).collect()),
            Self::MapValue(m) => fields_to_json(&m.fields),
        }
    }
}

/// Render a field map as a plain JSON object.
#[must_use]
pub fn fields_to_json(fields: &Fields) -> serde_json::Value {
    serde_json::Value::Object(
        fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}

/// Firestore encodes 64-bit integers as JSON strings.
mod int64_string {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Str(String),
            Num(i64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Str(s) => s.parse().map_err(D::Error::custom),
            Repr::Num(n) => Ok(n),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_string_value_wire_shape() {
        let value = serde_json::to_value(Value::string("admin")).unwrap();
        assert_eq!(value, json!({ "stringValue": "admin" }));
    }

    #[test]
    fn test_integer_is_string_encoded() {
        let value = serde_json::to_value(Value::IntegerValue(42)).unwrap();
        assert_eq!(value, json!({ "integerValue": "42" }));

        let parsed: Value = serde_json::from_value(json!({ "integerValue": "-7" })).unwrap();
        assert_eq!(parsed, Value::IntegerValue(-7));
    }

    #[test]
    fn test_null_value() {
        let value = serde_json::to_value(Value::NullValue(())).unwrap();
        assert_eq!(value, json!({ "nullValue": null }));

        let parsed: Value = serde_json::from_value(json!({ "nullValue": null })).unwrap();
        assert_eq!(parsed, Value::NullValue(()));
    }

    #[test]
    fn test_nested_document_fields() {
        let parsed: Fields = serde_json::from_value(json!({
            "email": { "stringValue": "admin@example.com" },
            "createdAt": { "timestampValue": "2024-05-01T12:30:00.123456Z" },
            "tags": { "arrayValue": { "values": [{ "stringValue": "ops" }] } },
            "prefs": { "mapValue": {} },
            "active": { "booleanValue": true }
        }))
        .unwrap();

        assert_eq!(parsed["email"].as_str(), Some("admin@example.com"));
        assert!(matches!(parsed["createdAt"], Value::TimestampValue(_)));
        assert_eq!(parsed["prefs"], Value::MapValue(MapValue::default()));

        assert_eq!(
            fields_to_json(&parsed),
            json!({
                "active": true,
                "createdAt": "2024-05-01T12:30:00.123456+00:00",
                "email": "admin@example.com",
                "prefs": {},
                "tags": ["ops"]
            })
        );
    }
}
