use async_trait::async_trait;

use crate::api::query::QueryDefinition;
use crate::api::DocumentSnapshot;
use crate::error::FirestoreResult;
use crate::model::{DocumentKey, FieldPath, ResourcePath};
use crate::value::MapValue;

pub mod http;
pub mod in_memory;

/// Storage backend behind the client API.
///
/// The REST implementation talks to Firestore; the in-memory one lets callers
/// and tests run the same code paths without a network.
#[async_trait]
pub trait Datastore: Send + Sync + 'static {
    /// Fetches one document. A missing document is a snapshot with `exists() == false`.
    async fn get_document(&self, key: &DocumentKey) -> FirestoreResult<DocumentSnapshot>;

    /// Creates a document with a server-assigned id and returns its key.
    async fn create_document(
        &self,
        collection_path: &ResourcePath,
        data: MapValue,
    ) -> FirestoreResult<DocumentKey>;

    /// Writes only the fields named in `field_paths`, leaving the rest untouched.
    async fn update_document(
        &self,
        key: &DocumentKey,
        data: MapValue,
        field_paths: Vec<FieldPath>,
    ) -> FirestoreResult<()>;

    /// Replaces the whole document.
    async fn set_document(&self, key: &DocumentKey, data: MapValue) -> FirestoreResult<()>;

    async fn delete_document(&self, key: &DocumentKey) -> FirestoreResult<()>;

    /// Runs a query and buffers every matching document.
    async fn run_query(&self, query: &QueryDefinition) -> FirestoreResult<Vec<DocumentSnapshot>>;
}

pub use http::{HttpDatastore, HttpDatastoreBuilder, RetrySettings};
pub use in_memory::InMemoryDatastore;
