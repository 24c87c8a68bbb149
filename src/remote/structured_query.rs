use serde_json::{json, Value as JsonValue};

use crate::api::query::{FieldFilter, QueryDefinition};
use crate::remote::serializer::encode_value;

/// Encodes a query definition as a REST `StructuredQuery`.
pub(crate) fn encode_structured_query(definition: &QueryDefinition) -> JsonValue {
    let mut structured = serde_json::Map::new();

    if let Some(fields) = definition.projection() {
        let field_entries: Vec<_> = fields
            .iter()
            .map(|field| json!({ "fieldPath": field.server_format() }))
            .collect();
        structured.insert("select".to_string(), json!({ "fields": field_entries }));
    }

    structured.insert(
        "from".to_string(),
        json!([{ "collectionId": definition.collection_id() }]),
    );

    if !definition.filters().is_empty() {
        structured.insert("where".to_string(), encode_filters(definition.filters()));
    }

    if !definition.order_by().is_empty() {
        let orders: Vec<_> = definition
            .order_by()
            .iter()
            .map(|order| {
                json!({
                    "field": { "fieldPath": order.field().server_format() },
                    "direction": order.direction().as_str(),
                })
            })
            .collect();
        structured.insert("orderBy".to_string(), JsonValue::Array(orders));
    }

    if let Some(limit) = definition.limit() {
        structured.insert("limit".to_string(), json!(limit));
    }

    JsonValue::Object(structured)
}

fn encode_filters(filters: &[FieldFilter]) -> JsonValue {
    if let [single] = filters {
        return encode_field_filter(single);
    }

    let nested: Vec<_> = filters.iter().map(encode_field_filter).collect();
    json!({
        "compositeFilter": {
            "op": "AND",
            "filters": nested
        }
    })
}

fn encode_field_filter(filter: &FieldFilter) -> JsonValue {
    json!({
        "fieldFilter": {
            "field": { "fieldPath": filter.field().server_format() },
            "op": filter.operator().as_str(),
            "value": encode_value(filter.value())
        }
    })
}
