use std::fmt::{Display, Formatter};

use crate::error::{invalid_argument, FirestoreResult};
use crate::model::{DocumentKey, FieldPath, IntoFieldPath, ResourcePath};
use crate::value::{FirestoreValue, MapValue};

use super::query::{OrderDirection, Query, QueryDefinition};
use super::snapshot::{DocumentSnapshot, QuerySnapshot};
use super::Firestore;

#[derive(Clone, Debug)]
pub struct CollectionReference {
    firestore: Firestore,
    path: ResourcePath,
}

impl CollectionReference {
    pub(crate) fn new(firestore: Firestore, path: ResourcePath) -> FirestoreResult<Self> {
        if path.len() % 2 == 0 {
            return Err(invalid_argument(format!(
                "Collection reference '{path}' must point to a collection (odd number of segments)"
            )));
        }
        Ok(Self { firestore, path })
    }

    pub fn firestore(&self) -> &Firestore {
        &self.firestore
    }

    /// Full path of the collection, e.g. `users/u1/donations`.
    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    pub fn id(&self) -> &str {
        self.path.last_segment().unwrap_or_default()
    }

    /// The document owning this collection, if it is a subcollection.
    pub fn parent(&self) -> Option<DocumentReference> {
        let parent = self.path.without_last();
        if parent.is_empty() {
            return None;
        }
        DocumentReference::new(self.firestore.clone(), parent).ok()
    }

    pub fn document(&self, document_id: &str) -> FirestoreResult<DocumentReference> {
        if document_id.trim().is_empty() || document_id.contains('/') {
            return Err(invalid_argument(format!(
                "Invalid document id '{document_id}': must be non-empty and contain no '/'"
            )));
        }
        if document_id.trim() != document_id {
            return Err(invalid_argument(format!(
                "Invalid document id '{document_id}': leading or trailing whitespace"
            )));
        }
        DocumentReference::new(self.firestore.clone(), self.path.child([document_id]))
    }

    /// Creates a document with a server-assigned id and returns that id.
    pub async fn add(&self, data: MapValue) -> FirestoreResult<String> {
        let key = self
            .firestore
            .datastore()
            .create_document(&self.path, data)
            .await?;
        Ok(key.id().to_string())
    }

    /// An unfiltered query over this collection.
    pub fn query(&self) -> Query {
        Query::new(
            self.firestore.clone(),
            QueryDefinition::for_collection(self.path.clone()),
        )
    }

    pub fn where_field(
        &self,
        field: impl IntoFieldPath,
        operator: &str,
        value: impl Into<FirestoreValue>,
    ) -> FirestoreResult<Query> {
        self.query().where_field(field, operator, value)
    }

    pub fn order_by(
        &self,
        field: impl IntoFieldPath,
        direction: impl Into<OrderDirection>,
    ) -> FirestoreResult<Query> {
        self.query().order_by(field, direction)
    }

    pub fn limit(&self, limit: i64) -> Query {
        self.query().limit(limit)
    }

    pub fn select<I, S>(&self, fields: I) -> FirestoreResult<Query>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.query().select(fields)
    }

    /// Every document in the collection.
    pub async fn documents(&self) -> FirestoreResult<QuerySnapshot> {
        self.query().documents().await
    }
}

impl Display for CollectionReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "CollectionReference({})", self.path.canonical_string())
    }
}

#[derive(Clone, Debug)]
pub struct DocumentReference {
    firestore: Firestore,
    key: DocumentKey,
}

impl DocumentReference {
    pub(crate) fn new(firestore: Firestore, path: ResourcePath) -> FirestoreResult<Self> {
        let key = DocumentKey::from_path(path)?;
        Ok(Self { firestore, key })
    }

    pub fn firestore(&self) -> &Firestore {
        &self.firestore
    }

    pub fn id(&self) -> &str {
        self.key.id()
    }

    pub fn path(&self) -> &ResourcePath {
        self.key.path()
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    pub fn parent(&self) -> CollectionReference {
        CollectionReference {
            firestore: self.firestore.clone(),
            path: self.key.collection_path(),
        }
    }

    /// A subcollection below this document.
    pub fn collection(&self, collection_id: &str) -> FirestoreResult<CollectionReference> {
        let relative = ResourcePath::from_string(collection_id)?;
        let full_path = self.key.path().child(relative.segments().iter().cloned());
        CollectionReference::new(self.firestore.clone(), full_path)
    }

    /// Reads the document. A document that does not exist yields a snapshot
    /// with `exists() == false` rather than an error.
    pub async fn snapshot(&self) -> FirestoreResult<DocumentSnapshot> {
        self.firestore.datastore().get_document(&self.key).await
    }

    /// Writes the given top-level fields and leaves every other field as is.
    pub async fn update(&self, data: MapValue) -> FirestoreResult<()> {
        if data.is_empty() {
            return Err(invalid_argument(format!(
                "Update of '{}' needs at least one field",
                self.key.path()
            )));
        }
        let mask = data
            .fields()
            .keys()
            .map(|field| FieldPath::single(field.as_str()))
            .collect::<FirestoreResult<Vec<_>>>()?;
        self.firestore
            .datastore()
            .update_document(&self.key, data, mask)
            .await
    }

    /// Replaces the whole document, creating it if needed.
    pub async fn set(&self, data: MapValue) -> FirestoreResult<()> {
        self.firestore.datastore().set_document(&self.key, data).await
    }

    pub async fn delete(&self) -> FirestoreResult<()> {
        self.firestore.datastore().delete_document(&self.key).await
    }
}

impl Display for DocumentReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "DocumentReference({})", self.key.path().canonical_string())
    }
}
