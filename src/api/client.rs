use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::auth::{NoopTokenProvider, ServiceAccountKey, ServiceAccountTokenProvider, TokenProviderArc};
use crate::error::{configuration_error, FirestoreResult};
use crate::model::{DatabaseId, ResourcePath};
use crate::remote::{Connection, Datastore, HttpDatastore};
use crate::settings::FirestoreSettings;
use crate::value::MapValue;

use super::reference::{CollectionReference, DocumentReference};

/// Entry point to the document database. Build it once at startup and pass it
/// to whatever needs database access; clones share the same backend.
#[derive(Clone)]
pub struct Firestore {
    inner: Arc<FirestoreInner>,
}

struct FirestoreInner {
    database_id: DatabaseId,
    datastore: Arc<dyn Datastore>,
}

impl Firestore {
    /// Builds a REST-backed client. Fails with a configuration error when the
    /// project id or credentials are missing or unreadable.
    pub fn new(settings: FirestoreSettings) -> FirestoreResult<Self> {
        let client = settings.build_client()?;

        let key = match (settings.token_provider(), settings.key_file_path()) {
            (None, Some(path)) => Some(ServiceAccountKey::from_file(path)?),
            _ => None,
        };
        let project_id = settings
            .project_id()
            .or_else(|| key.as_ref().and_then(|key| key.project_id.as_deref()));
        let database_id = DatabaseId::from_parts(project_id, settings.database())?;

        let auth_provider: TokenProviderArc = match (settings.token_provider(), key) {
            (Some(provider), _) => provider.clone(),
            (None, Some(key)) => ServiceAccountTokenProvider::new(key, client.clone())
                .with_timeouts(settings.timeouts())
                .into_arc(),
            (None, None) if settings.emulator_host().is_some() => Arc::new(NoopTokenProvider),
            (None, None) => {
                return Err(configuration_error(
                    "A service account key file is required unless an emulator host or token provider is configured",
                ))
            }
        };

        let mut connection = Connection::builder(database_id.clone())
            .with_client(client)
            .with_timeouts(settings.timeouts());
        if let Some(host) = settings.emulator_host() {
            connection = connection.with_emulator_host(host);
        }
        let datastore = HttpDatastore::builder(database_id.clone())
            .with_connection_builder(connection)
            .with_auth_provider(auth_provider)
            .with_retry_settings(settings.retry_settings().clone())
            .build()?;

        log::debug!(
            "Firestore client ready for {}",
            database_id.database_name()
        );
        Ok(Self::from_parts(database_id, Arc::new(datastore)))
    }

    /// Wraps any backend, e.g. [`crate::InMemoryDatastore`], for the default database.
    pub fn with_datastore(project_id: impl Into<String>, datastore: Arc<dyn Datastore>) -> Self {
        Self::from_parts(DatabaseId::default(project_id), datastore)
    }

    pub fn from_parts(database_id: DatabaseId, datastore: Arc<dyn Datastore>) -> Self {
        Self {
            inner: Arc::new(FirestoreInner {
                database_id,
                datastore,
            }),
        }
    }

    pub fn database_id(&self) -> &DatabaseId {
        &self.inner.database_id
    }

    pub fn project_id(&self) -> &str {
        self.inner.database_id.project_id()
    }

    pub fn database(&self) -> &str {
        self.inner.database_id.database()
    }

    pub(crate) fn datastore(&self) -> &Arc<dyn Datastore> {
        &self.inner.datastore
    }

    /// A collection by name or slash-separated path (`users/u1/donations`).
    pub fn collection(&self, path: &str) -> FirestoreResult<CollectionReference> {
        CollectionReference::new(self.clone(), ResourcePath::from_string(path)?)
    }

    /// A document by slash-separated path (`users/u1`).
    pub fn document(&self, path: &str) -> FirestoreResult<DocumentReference> {
        DocumentReference::new(self.clone(), ResourcePath::from_string(path)?)
    }

    /// Partial update of `collection/document_id`; see [`DocumentReference::update`].
    pub async fn update_document(
        &self,
        collection: &str,
        document_id: &str,
        data: MapValue,
    ) -> FirestoreResult<()> {
        self.collection(collection)?
            .document(document_id)?
            .update(data)
            .await
    }
}

impl Debug for Firestore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Firestore")
            .field("database_id", &self.inner.database_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenProvider;
    use crate::error::FirestoreErrorCode;
    use crate::test_support::{start_mock_server, write_key_file};
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn missing_project_id_is_configuration_error() {
        let err = Firestore::new(FirestoreSettings::default().with_emulator_host("localhost:8080"))
            .unwrap_err();
        assert_eq!(err.code, FirestoreErrorCode::Configuration);
    }

    #[test]
    fn missing_credentials_is_configuration_error() {
        let err = Firestore::new(FirestoreSettings::new("demo")).unwrap_err();
        assert_eq!(err.code, FirestoreErrorCode::Configuration);
    }

    #[test]
    fn unreadable_key_file_is_configuration_error() {
        let err = Firestore::new(FirestoreSettings::new("demo").with_key_file("/no/such/key.json"))
            .unwrap_err();
        assert_eq!(err.code, FirestoreErrorCode::Configuration);
    }

    #[test]
    fn project_id_can_come_from_key_file() {
        let path = write_key_file("client-project-id", "http://127.0.0.1:9/token");
        let firestore = Firestore::new(FirestoreSettings::default().with_key_file(&path)).unwrap();
        assert_eq!(firestore.project_id(), "demo-project");
        assert_eq!(firestore.database(), "(default)");
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn emulator_client_round_trip() {
        let server = start_mock_server();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/projects/demo/databases/staging/documents/users/u1")
                .header("authorization", "Bearer fixed");
            then.status(200).json_body(json!({
                "name": "projects/demo/databases/staging/documents/users/u1",
                "fields": { "role": { "stringValue": "food_provider" } }
            }));
        });

        let settings = FirestoreSettings::new("demo")
            .with_database("staging")
            .with_emulator_host(server.address().to_string())
            .with_token_provider(Arc::new(StaticTokenProvider::new("fixed")));
        let firestore = Firestore::new(settings).unwrap();
        let snapshot = firestore.document("users/u1").unwrap().snapshot().await.unwrap();

        mock.assert();
        assert_eq!(
            snapshot.get("role").and_then(|value| value.as_str()),
            Some("food_provider")
        );
    }

    #[tokio::test]
    async fn injected_client_token_exchange_honours_timeouts() {
        let server = start_mock_server();
        server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(200)
                .delay(std::time::Duration::from_secs(6))
                .json_body(json!({ "access_token": "late" }));
        });
        let documents = server.mock(|when, then| {
            when.method(GET).path_contains("/documents/");
            then.status(200).json_body(json!({}));
        });

        let path = write_key_file("client-stalled-token", &server.url("/token"));
        let settings = FirestoreSettings::default()
            .with_key_file(&path)
            .with_emulator_host(server.address().to_string())
            .with_http_client(reqwest::Client::new())
            .with_timeout(std::time::Duration::from_secs(1))
            .with_read_timeout(std::time::Duration::from_secs(1));
        let firestore = Firestore::new(settings).unwrap();

        let started = std::time::Instant::now();
        let err = firestore.document("users/u1").unwrap().snapshot().await.unwrap_err();
        let _ = std::fs::remove_file(path);

        assert_eq!(err.code, FirestoreErrorCode::Auth);
        assert!(started.elapsed() < std::time::Duration::from_secs(4));
        assert_eq!(documents.hits(), 0);
    }
}
