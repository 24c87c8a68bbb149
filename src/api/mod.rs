mod client;
pub(crate) mod query;
mod reference;
mod snapshot;

pub use client::Firestore;
pub use query::{FieldFilter, FilterOperator, OrderBy, OrderDirection, Query, QueryDefinition};
pub use reference::{CollectionReference, DocumentReference};
pub use snapshot::{DocumentSnapshot, QuerySnapshot};
