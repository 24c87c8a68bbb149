use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value as JsonValue};

use crate::api::query::QueryDefinition;
use crate::api::DocumentSnapshot;
use crate::auth::{NoopTokenProvider, TokenProviderArc};
use crate::constants::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};
use crate::error::{internal_error, FirestoreError, FirestoreErrorCode, FirestoreResult};
use crate::model::{DatabaseId, DocumentKey, FieldPath, ResourcePath};
use crate::remote::connection::{Connection, ConnectionBuilder, RequestContext};
use crate::remote::rpc_error::is_retryable_status;
use crate::remote::serializer::JsonProtoSerializer;
use crate::remote::structured_query::encode_structured_query;
use crate::value::MapValue;

use super::Datastore;

/// Firestore REST backend.
#[derive(Clone)]
pub struct HttpDatastore {
    connection: Connection,
    serializer: JsonProtoSerializer,
    auth_provider: TokenProviderArc,
    retry: RetrySettings,
}

#[derive(Clone)]
pub struct HttpDatastoreBuilder {
    database_id: DatabaseId,
    connection_builder: ConnectionBuilder,
    auth_provider: TokenProviderArc,
    retry: RetrySettings,
}

/// Bounded retry policy. `max_attempts` counts the first try.
#[derive(Clone, Debug, PartialEq)]
pub struct RetrySettings {
    pub max_attempts: usize,
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_RETRY_DELAY,
            multiplier: 1.0,
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetrySettings {
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Transport failures without a response, and throttling or transient
    /// server statuses.
    pub fn is_retryable(&self, error: &FirestoreError) -> bool {
        if error.code != FirestoreErrorCode::Transport {
            return false;
        }
        match error.http_status() {
            None => true,
            Some(status) => is_retryable_status(status),
        }
    }

    fn should_retry(&self, attempt: usize, error: &FirestoreError) -> bool {
        attempt + 1 < self.max_attempts.max(1) && self.is_retryable(error)
    }

    fn backoff_delay(&self, attempt: usize) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt as i32);
        let delay = self.initial_delay.mul_f64(factor);
        delay.min(self.max_delay)
    }
}

impl HttpDatastore {
    pub fn builder(database_id: DatabaseId) -> HttpDatastoreBuilder {
        HttpDatastoreBuilder::new(database_id)
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn retry_settings(&self) -> &RetrySettings {
        &self.retry
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error, or
    /// the attempt budget runs out. A token is fetched before every attempt;
    /// token failures are returned as-is.
    async fn execute_with_retry<F, Fut, T>(&self, mut operation: F) -> FirestoreResult<T>
    where
        F: FnMut(RequestContext) -> Fut,
        Fut: Future<Output = FirestoreResult<T>>,
    {
        let mut attempt = 0usize;
        loop {
            let context = RequestContext {
                auth_token: self.auth_provider.get_token().await?,
            };
            match operation(context).await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    if !self.retry.should_retry(attempt, &err) {
                        if self.retry.is_retryable(&err) {
                            log::warn!(
                                "Firestore request failed after {} attempt(s): {err}",
                                attempt + 1
                            );
                        }
                        return Err(err);
                    }
                    let delay = self.retry.backoff_delay(attempt);
                    log::debug!(
                        "Firestore request attempt {} failed ({err}); retrying in {delay:?}",
                        attempt + 1
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn document_path(key: &DocumentKey) -> String {
        key.path().url_encoded()
    }

    fn run_query_path(definition: &QueryDefinition) -> String {
        let parent = definition.parent_path();
        if parent.is_empty() {
            ":runQuery".to_string()
        } else {
            format!("{}:runQuery", parent.url_encoded())
        }
    }
}

#[async_trait]
impl Datastore for HttpDatastore {
    async fn get_document(&self, key: &DocumentKey) -> FirestoreResult<DocumentSnapshot> {
        let path = Self::document_path(key);
        let document = self
            .execute_with_retry(|context| {
                let path = path.clone();
                async move {
                    self.connection
                        .request_json_optional(Method::GET, &path, &[], None, &context)
                        .await
                }
            })
            .await?;

        match document {
            Some(json) => Ok(self.serializer.decode_document(&json)?.into()),
            None => Ok(DocumentSnapshot::missing(key.clone())),
        }
    }

    async fn create_document(
        &self,
        collection_path: &ResourcePath,
        data: MapValue,
    ) -> FirestoreResult<DocumentKey> {
        let path = collection_path.url_encoded();
        let body = self.serializer.encode_document_fields(&data);
        let response = self
            .execute_with_retry(|context| {
                let path = path.clone();
                let body = body.clone();
                async move {
                    self.connection
                        .request_json(Method::POST, &path, &[], Some(&body), &context)
                        .await
                }
            })
            .await?;

        let name = response
            .get("name")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| internal_error("Create response is missing the document name"))?;
        DocumentKey::from_name(self.serializer.database_id(), name)
    }

    async fn update_document(
        &self,
        key: &DocumentKey,
        data: MapValue,
        field_paths: Vec<FieldPath>,
    ) -> FirestoreResult<()> {
        let path = Self::document_path(key);
        let body = self.serializer.encode_document_fields(&data);
        let mask: Vec<(&str, String)> = field_paths
            .iter()
            .map(|field| ("updateMask.fieldPaths", field.server_format()))
            .collect();
        self.execute_with_retry(|context| {
            let path = path.clone();
            let body = body.clone();
            let mask = mask.clone();
            async move {
                self.connection
                    .request_json(Method::PATCH, &path, &mask, Some(&body), &context)
                    .await
            }
        })
        .await?;
        Ok(())
    }

    async fn set_document(&self, key: &DocumentKey, data: MapValue) -> FirestoreResult<()> {
        let path = Self::document_path(key);
        let body = self.serializer.encode_document_fields(&data);
        self.execute_with_retry(|context| {
            let path = path.clone();
            let body = body.clone();
            async move {
                self.connection
                    .request_json(Method::PATCH, &path, &[], Some(&body), &context)
                    .await
            }
        })
        .await?;
        Ok(())
    }

    async fn delete_document(&self, key: &DocumentKey) -> FirestoreResult<()> {
        let path = Self::document_path(key);
        self.execute_with_retry(|context| {
            let path = path.clone();
            async move {
                self.connection
                    .request_json(Method::DELETE, &path, &[], None, &context)
                    .await
            }
        })
        .await?;
        Ok(())
    }

    async fn run_query(&self, query: &QueryDefinition) -> FirestoreResult<Vec<DocumentSnapshot>> {
        let path = Self::run_query_path(query);
        let body = json!({ "structuredQuery": encode_structured_query(query) });
        let entries = self
            .execute_with_retry(|context| {
                let path = path.clone();
                let body = body.clone();
                async move {
                    self.connection
                        .request_json_lines(Method::POST, &path, &[], Some(&body), &context)
                        .await
                }
            })
            .await?;

        let mut documents = Vec::new();
        for entry in entries {
            // Entries without a document only carry progress metadata (readTime, skippedResults).
            if let Some(document) = entry.get("document") {
                documents.push(self.serializer.decode_document(document)?.into());
            }
        }
        Ok(documents)
    }
}

impl HttpDatastoreBuilder {
    fn new(database_id: DatabaseId) -> Self {
        let connection_builder = Connection::builder(database_id.clone());
        Self {
            database_id,
            connection_builder,
            auth_provider: Arc::new(NoopTokenProvider),
            retry: RetrySettings::default(),
        }
    }

    pub fn with_auth_provider(mut self, provider: TokenProviderArc) -> Self {
        self.auth_provider = provider;
        self
    }

    pub fn with_retry_settings(mut self, settings: RetrySettings) -> Self {
        self.retry = settings;
        self
    }

    pub fn with_connection_builder(mut self, builder: ConnectionBuilder) -> Self {
        self.connection_builder = builder;
        self
    }

    pub fn build(self) -> FirestoreResult<HttpDatastore> {
        let connection = self.connection_builder.build()?;
        Ok(HttpDatastore {
            connection,
            serializer: JsonProtoSerializer::new(self.database_id),
            auth_provider: self.auth_provider,
            retry: self.retry,
        })
    }
}
