use std::collections::BTreeMap;

use crate::model::FieldPath;
use crate::value::{FirestoreValue, ValueKind};

/// Field name to value mapping for a document or a nested `mapValue`.
///
/// Keys are kept sorted; Firestore itself promises no field order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapValue {
    fields: BTreeMap<String, FirestoreValue>,
}

impl MapValue {
    pub fn new(fields: BTreeMap<String, FirestoreValue>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &BTreeMap<String, FirestoreValue> {
        &self.fields
    }

    pub fn into_fields(self) -> BTreeMap<String, FirestoreValue> {
        self.fields
    }

    pub fn get(&self, key: &str) -> Option<&FirestoreValue> {
        self.fields.get(key)
    }

    /// Walks nested maps following `path`.
    pub fn get_path(&self, path: &FieldPath) -> Option<&FirestoreValue> {
        let (first, rest) = path.segments().split_first()?;
        let mut current = self.fields.get(first)?;
        for segment in rest {
            current = match current.kind() {
                ValueKind::Map(map) => map.fields.get(segment)?,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Keeps only the listed top-level fields (or the top-level parent of a nested path).
    pub fn project(&self, paths: &[FieldPath]) -> MapValue {
        let fields = self
            .fields
            .iter()
            .filter(|(key, _)| {
                paths
                    .iter()
                    .any(|path| path.segments().first().map(String::as_str) == Some(key.as_str()))
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        MapValue::new(fields)
    }
}

impl From<BTreeMap<String, FirestoreValue>> for MapValue {
    fn from(fields: BTreeMap<String, FirestoreValue>) -> Self {
        Self::new(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_map_entries() {
        let mut map = BTreeMap::new();
        map.insert("status".to_string(), FirestoreValue::from_string("active"));
        let value = MapValue::new(map.clone());
        assert_eq!(value.get("status"), map.get("status"));
    }

    #[test]
    fn follows_nested_paths() {
        let pickup = BTreeMap::from([(
            "city".to_string(),
            FirestoreValue::from_string("Lyon"),
        )]);
        let value = MapValue::new(BTreeMap::from([(
            "pickup".to_string(),
            FirestoreValue::from_map(pickup),
        )]));

        let city = FieldPath::from_dot_separated("pickup.city").unwrap();
        assert_eq!(value.get_path(&city).and_then(FirestoreValue::as_str), Some("Lyon"));
        let missing = FieldPath::from_dot_separated("pickup.city.zip").unwrap();
        assert!(value.get_path(&missing).is_none());
    }

    #[test]
    fn projection_keeps_requested_roots() {
        let value = MapValue::new(BTreeMap::from([
            ("title".to_string(), FirestoreValue::from_string("Bread")),
            ("price".to_string(), FirestoreValue::from_double(2.5)),
            ("owner".to_string(), FirestoreValue::from_string("u1")),
        ]));
        let projected = value.project(&[
            FieldPath::from_dot_separated("title").unwrap(),
            FieldPath::from_dot_separated("price.amount").unwrap(),
        ]);
        assert_eq!(projected.len(), 2);
        assert!(projected.get("owner").is_none());
    }
}
