use serde_json::Value as JsonValue;

use crate::api::{
    CollectionReference, DocumentReference, DocumentSnapshot, Firestore, OrderDirection, Query,
    QuerySnapshot,
};
use crate::error::FirestoreResult;
use crate::model::{IntoFieldPath, ResourcePath};
use crate::settings::FirestoreSettings;
use crate::value::{FirestoreValue, MapValue};

use super::{block_on, block_on_methods};

#[derive(Clone, Debug)]
pub struct BlockingFirestore {
    inner: Firestore,
}

impl BlockingFirestore {
    pub fn new(settings: FirestoreSettings) -> FirestoreResult<Self> {
        Ok(Self {
            inner: Firestore::new(settings)?,
        })
    }

    pub fn from_env() -> FirestoreResult<Self> {
        Self::new(FirestoreSettings::from_env()?)
    }

    /// The async client backing this handle.
    pub fn inner(&self) -> &Firestore {
        &self.inner
    }

    pub fn collection(&self, path: &str) -> FirestoreResult<BlockingCollectionReference> {
        self.inner.collection(path).map(BlockingCollectionReference::from)
    }

    pub fn document(&self, path: &str) -> FirestoreResult<BlockingDocumentReference> {
        self.inner.document(path).map(BlockingDocumentReference::from)
    }

    pub fn update_document(
        &self,
        collection: &str,
        document_id: &str,
        data: MapValue,
    ) -> FirestoreResult<()> {
        block_on(self.inner.update_document(collection, document_id, data))
    }
}

impl From<Firestore> for BlockingFirestore {
    fn from(inner: Firestore) -> Self {
        Self { inner }
    }
}

#[derive(Clone, Debug)]
pub struct BlockingCollectionReference {
    inner: CollectionReference,
}

impl BlockingCollectionReference {
    block_on_methods! {
        fn add(data: MapValue) -> FirestoreResult<String>;
        fn documents() -> FirestoreResult<QuerySnapshot>;
    }

    pub fn id(&self) -> &str {
        self.inner.id()
    }

    pub fn path(&self) -> &ResourcePath {
        self.inner.path()
    }

    pub fn document(&self, document_id: &str) -> FirestoreResult<BlockingDocumentReference> {
        self.inner.document(document_id).map(BlockingDocumentReference::from)
    }

    pub fn query(&self) -> BlockingQuery {
        BlockingQuery::from(self.inner.query())
    }

    pub fn where_field(
        &self,
        field: impl IntoFieldPath,
        operator: &str,
        value: impl Into<FirestoreValue>,
    ) -> FirestoreResult<BlockingQuery> {
        self.query().where_field(field, operator, value)
    }

    pub fn order_by(
        &self,
        field: impl IntoFieldPath,
        direction: impl Into<OrderDirection>,
    ) -> FirestoreResult<BlockingQuery> {
        self.query().order_by(field, direction)
    }

    pub fn limit(&self, limit: i64) -> BlockingQuery {
        self.query().limit(limit)
    }
}

impl From<CollectionReference> for BlockingCollectionReference {
    fn from(inner: CollectionReference) -> Self {
        Self { inner }
    }
}

#[derive(Clone, Debug)]
pub struct BlockingQuery {
    inner: Query,
}

impl BlockingQuery {
    block_on_methods! {
        fn documents() -> FirestoreResult<QuerySnapshot>;
    }

    pub fn where_field(
        &self,
        field: impl IntoFieldPath,
        operator: &str,
        value: impl Into<FirestoreValue>,
    ) -> FirestoreResult<BlockingQuery> {
        self.inner.where_field(field, operator, value).map(BlockingQuery::from)
    }

    pub fn order_by(
        &self,
        field: impl IntoFieldPath,
        direction: impl Into<OrderDirection>,
    ) -> FirestoreResult<BlockingQuery> {
        self.inner.order_by(field, direction).map(BlockingQuery::from)
    }

    pub fn limit(&self, limit: i64) -> BlockingQuery {
        BlockingQuery::from(self.inner.limit(limit))
    }

    pub fn select<I, S>(&self, fields: I) -> FirestoreResult<BlockingQuery>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.inner.select(fields).map(BlockingQuery::from)
    }

    pub fn structured_query(&self) -> JsonValue {
        self.inner.structured_query()
    }
}

impl From<Query> for BlockingQuery {
    fn from(inner: Query) -> Self {
        Self { inner }
    }
}

#[derive(Clone, Debug)]
pub struct BlockingDocumentReference {
    inner: DocumentReference,
}

impl BlockingDocumentReference {
    block_on_methods! {
        fn snapshot() -> FirestoreResult<DocumentSnapshot>;
        fn update(data: MapValue) -> FirestoreResult<()>;
        fn set(data: MapValue) -> FirestoreResult<()>;
        fn delete() -> FirestoreResult<()>;
    }

    pub fn id(&self) -> &str {
        self.inner.id()
    }

    pub fn path(&self) -> &ResourcePath {
        self.inner.path()
    }

    pub fn collection(&self, collection_id: &str) -> FirestoreResult<BlockingCollectionReference> {
        self.inner
            .collection(collection_id)
            .map(BlockingCollectionReference::from)
    }
}

impl From<DocumentReference> for BlockingDocumentReference {
    fn from(inner: DocumentReference) -> Self {
        Self { inner }
    }
}
