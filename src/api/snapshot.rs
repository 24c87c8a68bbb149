use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::{invalid_argument, FirestoreResult};
use crate::model::{DocumentKey, IntoFieldPath, ResourcePath, Timestamp};
use crate::remote::serializer::DecodedDocument;
use crate::value::{FirestoreValue, MapValue};

/// A document read at a point in time. Missing documents are represented by
/// `exists() == false` and an empty data map.
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentSnapshot {
    key: DocumentKey,
    data: MapValue,
    exists: bool,
    create_time: Option<Timestamp>,
    update_time: Option<Timestamp>,
}

impl DocumentSnapshot {
    pub fn new(key: DocumentKey, data: MapValue) -> Self {
        Self {
            key,
            data,
            exists: true,
            create_time: None,
            update_time: None,
        }
    }

    pub fn missing(key: DocumentKey) -> Self {
        Self {
            key,
            data: MapValue::default(),
            exists: false,
            create_time: None,
            update_time: None,
        }
    }

    pub fn with_times(
        mut self,
        create_time: Option<Timestamp>,
        update_time: Option<Timestamp>,
    ) -> Self {
        self.create_time = create_time;
        self.update_time = update_time;
        self
    }

    pub fn id(&self) -> &str {
        self.key.id()
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    pub fn path(&self) -> &ResourcePath {
        self.key.path()
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn data(&self) -> &MapValue {
        &self.data
    }

    pub fn into_data(self) -> MapValue {
        self.data
    }

    pub fn create_time(&self) -> Option<Timestamp> {
        self.create_time
    }

    pub fn update_time(&self) -> Option<Timestamp> {
        self.update_time
    }

    /// Looks up a dot-separated field path inside nested maps.
    pub fn get(&self, field_path: impl IntoFieldPath) -> Option<&FirestoreValue> {
        let path = field_path.into_field_path().ok()?;
        self.data.get_path(&path)
    }

    /// The document fields as plain JSON.
    pub fn to_json(&self) -> JsonValue {
        self.data.to_json()
    }

    pub fn deserialize<T>(&self) -> FirestoreResult<T>
    where
        T: DeserializeOwned,
    {
        if !self.exists {
            return Err(invalid_argument(format!(
                "Document '{}' does not exist",
                self.key.path()
            )));
        }
        serde_json::from_value(self.to_json()).map_err(|err| {
            invalid_argument(format!(
                "Failed to deserialize document '{}': {err}",
                self.key.path()
            ))
        })
    }
}

impl From<DecodedDocument> for DocumentSnapshot {
    fn from(document: DecodedDocument) -> Self {
        DocumentSnapshot::new(document.key, document.fields)
            .with_times(document.create_time, document.update_time)
    }
}

/// The fully materialised result of a query. Iterating does not consume it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuerySnapshot {
    documents: Vec<DocumentSnapshot>,
}

impl QuerySnapshot {
    pub fn new(documents: Vec<DocumentSnapshot>) -> Self {
        Self { documents }
    }

    pub fn documents(&self) -> &[DocumentSnapshot] {
        &self.documents
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DocumentSnapshot> {
        self.documents.iter()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn into_documents(self) -> Vec<DocumentSnapshot> {
        self.documents
    }
}

impl IntoIterator for QuerySnapshot {
    type Item = DocumentSnapshot;
    type IntoIter = std::vec::IntoIter<DocumentSnapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.into_iter()
    }
}

impl<'a> IntoIterator for &'a QuerySnapshot {
    type Item = &'a DocumentSnapshot;
    type IntoIter = std::slice::Iter<'a, DocumentSnapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.iter()
    }
}
