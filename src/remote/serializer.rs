use std::collections::BTreeMap;
use std::str::FromStr;

use serde_json::{json, Value as JsonValue};

use crate::error::{internal_error, invalid_argument, FirestoreResult};
use crate::model::{DatabaseId, DocumentKey, Timestamp};
use crate::value::{FirestoreValue, MapValue, ValueKind};

/// A document as returned by the REST API, decoded.
#[derive(Clone, Debug)]
pub struct DecodedDocument {
    pub key: DocumentKey,
    pub fields: MapValue,
    pub create_time: Option<Timestamp>,
    pub update_time: Option<Timestamp>,
}

/// Translates between typed values and the REST API's JSON encoding of
/// `google.firestore.v1.Value`.
#[derive(Clone, Debug)]
pub struct JsonProtoSerializer {
    database_id: DatabaseId,
}

impl JsonProtoSerializer {
    pub fn new(database_id: DatabaseId) -> Self {
        Self { database_id }
    }

    pub fn database_id(&self) -> &DatabaseId {
        &self.database_id
    }

    pub fn encode_document_fields(&self, map: &MapValue) -> JsonValue {
        json!({
            "fields": encode_map_fields(map)
        })
    }

    /// Decodes a `Document` resource (`name`, `fields`, `createTime`, `updateTime`).
    pub fn decode_document(&self, document: &JsonValue) -> FirestoreResult<DecodedDocument> {
        let name = document
            .get("name")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| internal_error("Firestore document is missing its 'name' field"))?;
        let key = DocumentKey::from_name(&self.database_id, name)?;
        let fields = decode_map_value(document)?;
        Ok(DecodedDocument {
            key,
            fields,
            create_time: decode_optional_time(document, "createTime"),
            update_time: decode_optional_time(document, "updateTime"),
        })
    }
}

fn decode_optional_time(document: &JsonValue, field: &str) -> Option<Timestamp> {
    document
        .get(field)
        .and_then(JsonValue::as_str)
        .and_then(|value| Timestamp::parse_rfc3339(value).ok())
}

fn encode_map_fields(map: &MapValue) -> JsonValue {
    let mut fields = serde_json::Map::new();
    for (key, value) in map.fields() {
        fields.insert(key.clone(), encode_value(value));
    }
    JsonValue::Object(fields)
}

pub(crate) fn encode_value(value: &FirestoreValue) -> JsonValue {
    match value.kind() {
        ValueKind::Null => json!({ "nullValue": JsonValue::Null }),
        ValueKind::Boolean(boolean) => json!({ "booleanValue": boolean }),
        ValueKind::Integer(integer) => json!({ "integerValue": integer.to_string() }),
        ValueKind::Double(double) => json!({ "doubleValue": encode_double(*double) }),
        ValueKind::Timestamp(timestamp) => json!({ "timestampValue": timestamp.to_rfc3339() }),
        ValueKind::String(string) => json!({ "stringValue": string }),
        ValueKind::Array(array) => {
            let values = array.values().iter().map(encode_value).collect::<Vec<_>>();
            json!({ "arrayValue": { "values": values } })
        }
        ValueKind::Map(map) => json!({
            "mapValue": {
                "fields": encode_map_fields(map)
            }
        }),
    }
}

fn encode_double(double: f64) -> JsonValue {
    if double.is_nan() {
        json!("NaN")
    } else if double.is_infinite() {
        json!(if double > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        json!(double)
    }
}

fn decode_map_value(value: &JsonValue) -> FirestoreResult<MapValue> {
    let map = value
        .as_object()
        .ok_or_else(|| invalid_argument("Expected object for map value"))?;
    let fields_object = match map.get("fields") {
        Some(fields_value) => fields_value
            .as_object()
            .ok_or_else(|| invalid_argument("Expected 'fields' to be an object"))?,
        None => return Ok(MapValue::default()),
    };

    let mut fields = BTreeMap::new();
    for (key, value) in fields_object {
        fields.insert(key.clone(), decode_value(value)?);
    }
    Ok(MapValue::new(fields))
}

pub(crate) fn decode_value(value: &JsonValue) -> FirestoreResult<FirestoreValue> {
    let object = value
        .as_object()
        .ok_or_else(|| invalid_argument("Expected Firestore value object"))?;
    if object.contains_key("nullValue") {
        return Ok(FirestoreValue::null());
    }
    if let Some(bool_value) = object.get("booleanValue") {
        let value = bool_value
            .as_bool()
            .ok_or_else(|| invalid_argument("booleanValue must be bool"))?;
        return Ok(FirestoreValue::from_bool(value));
    }
    if let Some(integer_value) = object.get("integerValue") {
        let parsed = match integer_value {
            JsonValue::String(value) => i64::from_str(value)
                .map_err(|err| invalid_argument(format!("Invalid integerValue: {err}")))?,
            JsonValue::Number(number) => number
                .as_i64()
                .ok_or_else(|| invalid_argument("Integer out of range"))?,
            _ => return Err(invalid_argument("integerValue must be a string or number")),
        };
        return Ok(FirestoreValue::from_integer(parsed));
    }
    if let Some(double_value) = object.get("doubleValue") {
        let parsed = match double_value {
            JsonValue::Number(number) => number
                .as_f64()
                .ok_or_else(|| invalid_argument("Invalid doubleValue"))?,
            JsonValue::String(value) => value
                .parse::<f64>()
                .map_err(|err| invalid_argument(format!("Invalid doubleValue: {err}")))?,
            _ => return Err(invalid_argument("doubleValue must be a number or string")),
        };
        return Ok(FirestoreValue::from_double(parsed));
    }
    if let Some(timestamp_value) = object.get("timestampValue") {
        let timestamp = match timestamp_value {
            JsonValue::String(text) => Timestamp::parse_lenient(text)?,
            JsonValue::Number(number) => Timestamp::parse_lenient(&number.to_string())?,
            _ => return Err(invalid_argument("timestampValue must be a string")),
        };
        return Ok(FirestoreValue::from_timestamp(timestamp));
    }
    if let Some(string_value) = object.get("stringValue") {
        let str_value = string_value
            .as_str()
            .ok_or_else(|| invalid_argument("stringValue must be string"))?;
        return Ok(FirestoreValue::from_string(str_value));
    }
    if let Some(array_value) = object.get("arrayValue") {
        let decoded = match array_value.get("values").and_then(JsonValue::as_array) {
            Some(entries) => entries
                .iter()
                .map(decode_value)
                .collect::<FirestoreResult<Vec<_>>>()?,
            None => Vec::new(),
        };
        return Ok(FirestoreValue::from_array(decoded));
    }
    if let Some(map_value) = object.get("mapValue") {
        let map = decode_map_value(map_value)?;
        return Ok(FirestoreValue::from_map(map.into_fields()));
    }
    if let Some(flattened) = decode_unsupported_kind(object) {
        return Ok(flattened);
    }

    Err(invalid_argument("Unknown Firestore value type"))
}

/// Kinds outside this adapter's value model are surfaced as strings instead of
/// failing the whole document.
fn decode_unsupported_kind(object: &serde_json::Map<String, JsonValue>) -> Option<FirestoreValue> {
    let (kind, text) = if let Some(bytes) = object.get("bytesValue").and_then(JsonValue::as_str) {
        ("bytesValue", bytes.to_string())
    } else if let Some(reference) = object.get("referenceValue").and_then(JsonValue::as_str) {
        ("referenceValue", reference.to_string())
    } else if let Some(point) = object.get("geoPointValue") {
        let latitude = point.get("latitude").and_then(JsonValue::as_f64).unwrap_or(0.0);
        let longitude = point.get("longitude").and_then(JsonValue::as_f64).unwrap_or(0.0);
        ("geoPointValue", format!("{latitude},{longitude}"))
    } else {
        return None;
    };
    log::debug!("decoding {kind} as a plain string");
    Some(FirestoreValue::from_string(text))
}
