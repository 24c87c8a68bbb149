//! Conversions between [`FirestoreValue`] and dynamic `serde_json` values.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Number, Value as JsonValue};

use crate::error::{invalid_argument, FirestoreResult};
use crate::value::{FirestoreValue, MapValue, ValueKind};

impl FirestoreValue {
    /// Encodes a dynamic JSON value.
    ///
    /// Numbers that fit `i64` become integers and everything else numeric
    /// becomes a double, except unsigned values above `i64::MAX`, which have no
    /// Firestore representation and are stored as their decimal string.
    pub fn from_json(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::null(),
            JsonValue::Bool(flag) => Self::from_bool(flag),
            JsonValue::Number(number) => from_number(&number),
            JsonValue::String(text) => Self::from_string(text),
            JsonValue::Array(values) => {
                Self::from_array(values.into_iter().map(Self::from_json).collect())
            }
            JsonValue::Object(object) => Self::from_map(
                object
                    .into_iter()
                    .map(|(key, value)| (key, Self::from_json(value)))
                    .collect(),
            ),
        }
    }

    /// Encodes any serializable value through its JSON form.
    pub fn from_serializable<T>(value: &T) -> FirestoreResult<Self>
    where
        T: Serialize + ?Sized,
    {
        let json = serde_json::to_value(value)
            .map_err(|err| invalid_argument(format!("Value is not serializable: {err}")))?;
        Ok(Self::from_json(json))
    }

    /// Decodes to a dynamic JSON value. Timestamps become RFC 3339 strings and
    /// non-finite doubles become `null`.
    pub fn to_json(&self) -> JsonValue {
        match self.kind() {
            ValueKind::Null => JsonValue::Null,
            ValueKind::Boolean(flag) => JsonValue::Bool(*flag),
            ValueKind::Integer(integer) => JsonValue::Number(Number::from(*integer)),
            ValueKind::Double(double) => Number::from_f64(*double)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            ValueKind::Timestamp(timestamp) => JsonValue::String(timestamp.to_rfc3339()),
            ValueKind::String(text) => JsonValue::String(text.clone()),
            ValueKind::Array(array) => {
                JsonValue::Array(array.values().iter().map(Self::to_json).collect())
            }
            ValueKind::Map(map) => map.to_json(),
        }
    }

    /// Deserializes the JSON form into `T`.
    pub fn deserialize<T>(&self) -> FirestoreResult<T>
    where
        T: DeserializeOwned,
    {
        serde_json::from_value(self.to_json())
            .map_err(|err| invalid_argument(format!("Failed to deserialize value: {err}")))
    }
}

impl MapValue {
    /// Builds a document map from a JSON object. Any other JSON shape is rejected.
    pub fn from_json(value: JsonValue) -> FirestoreResult<Self> {
        match value {
            JsonValue::Object(object) => Ok(Self::new(
                object
                    .into_iter()
                    .map(|(key, value)| (key, FirestoreValue::from_json(value)))
                    .collect(),
            )),
            other => Err(invalid_argument(format!(
                "Document data must be a JSON object, got {other}"
            ))),
        }
    }

    pub fn from_serializable<T>(value: &T) -> FirestoreResult<Self>
    where
        T: Serialize + ?Sized,
    {
        let json = serde_json::to_value(value)
            .map_err(|err| invalid_argument(format!("Document data is not serializable: {err}")))?;
        Self::from_json(json)
    }

    pub fn to_json(&self) -> JsonValue {
        let object: Map<String, JsonValue> = self
            .fields()
            .iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect();
        JsonValue::Object(object)
    }
}

fn from_number(number: &Number) -> FirestoreValue {
    if let Some(integer) = number.as_i64() {
        return FirestoreValue::from_integer(integer);
    }
    if number.is_f64() {
        if let Some(double) = number.as_f64() {
            return FirestoreValue::from_double(double);
        }
    }
    log::debug!("number {number} does not fit a Firestore integer; encoding it as a string");
    FirestoreValue::from_string(number.to_string())
}

impl From<JsonValue> for FirestoreValue {
    fn from(value: JsonValue) -> Self {
        Self::from_json(value)
    }
}

impl From<BTreeMap<String, JsonValue>> for MapValue {
    fn from(fields: BTreeMap<String, JsonValue>) -> Self {
        Self::new(
            fields
                .into_iter()
                .map(|(key, value)| (key, FirestoreValue::from_json(value)))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Timestamp;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn json_roundtrip_preserves_number_kinds() {
        let source = json!({
            "count": 3,
            "ratio": 3.0,
            "flag": true,
            "none": null,
            "tags": ["vegan", 1],
            "nested": { "city": "Lyon" }
        });
        let value = FirestoreValue::from_json(source.clone());
        let map = value.as_map().unwrap();
        assert_eq!(map["count"].as_i64(), Some(3));
        assert!(matches!(map["ratio"].kind(), ValueKind::Double(d) if *d == 3.0));
        assert!(map["none"].is_null());
        assert_eq!(value.to_json(), source);
    }

    #[test]
    fn oversized_unsigned_falls_back_to_string() {
        let value = FirestoreValue::from_json(json!(u64::MAX));
        assert_eq!(value.as_str(), Some("18446744073709551615"));
    }

    #[test]
    fn timestamps_render_as_rfc3339() {
        let value = FirestoreValue::from(Timestamp::new(0, 0));
        assert_eq!(value.to_json(), json!("1970-01-01T00:00:00.000000000Z"));
    }

    #[test]
    fn map_from_json_requires_object() {
        let err = MapValue::from_json(json!([1, 2])).unwrap_err();
        assert_eq!(err.code_str(), "firestore/invalid-argument");
    }

    #[test]
    fn serde_roundtrip_through_values() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Listing {
            title: String,
            quantity: i64,
            price: f64,
        }

        let listing = Listing {
            title: "Bagels".into(),
            quantity: 12,
            price: 4.5,
        };
        let value = FirestoreValue::from_serializable(&listing).unwrap();
        let decoded: Listing = value.deserialize().unwrap();
        assert_eq!(decoded, listing);
    }
}
