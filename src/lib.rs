#![doc = include_str!("RUSTDOC.md")]

pub mod api;
pub mod auth;
pub mod blocking;
pub mod cache;
mod constants;
pub mod error;
pub mod model;
pub mod remote;
pub mod settings;
pub mod value;

pub use api::{
    CollectionReference, DocumentReference, DocumentSnapshot, Firestore, OrderDirection, Query,
    QuerySnapshot,
};
pub use auth::{NoopTokenProvider, ServiceAccountTokenProvider, StaticTokenProvider, TokenProvider};
pub use cache::JsonFileCache;
pub use error::{FirestoreError, FirestoreErrorCode, FirestoreResult};
pub use model::{FieldPath, Timestamp};
pub use remote::{Datastore, HttpDatastore, InMemoryDatastore, RetrySettings};
pub use settings::FirestoreSettings;
pub use value::{FirestoreValue, MapValue, ValueKind};

#[cfg(test)]
pub mod test_support;
