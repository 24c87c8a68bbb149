pub mod connection;
pub mod datastore;
pub mod rpc_error;
pub mod serializer;
pub(crate) mod structured_query;

pub use connection::{Connection, ConnectionBuilder, RequestContext, Timeouts};
pub use datastore::{Datastore, HttpDatastore, HttpDatastoreBuilder, InMemoryDatastore, RetrySettings};
pub use rpc_error::map_http_error;
pub use serializer::JsonProtoSerializer;
