use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::Value as JsonValue;

use crate::constants::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT, DEFAULT_TIMEOUT, FIRESTORE_API_HOST,
    FIRESTORE_API_VERSION,
};
use crate::error::{configuration_error, internal_error, transport_error, FirestoreResult};
use crate::model::DatabaseId;

use super::rpc_error::map_http_error;

/// Timeout policy applied to every request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timeouts {
    /// Whole-request deadline, also applied per request so injected clients are bounded.
    pub total: Duration,
    /// TCP/TLS connect deadline; only used when the connection builds its own client.
    pub connect: Duration,
    /// Deadline for reading the response body once headers arrived.
    pub read: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            total: DEFAULT_TIMEOUT,
            connect: DEFAULT_CONNECT_TIMEOUT,
            read: DEFAULT_READ_TIMEOUT,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Connection {
    client: Client,
    base_url: String,
    timeouts: Timeouts,
}

#[derive(Clone, Debug)]
pub struct ConnectionBuilder {
    database_id: DatabaseId,
    client: Option<Client>,
    emulator_host: Option<String>,
    timeouts: Timeouts,
}

#[derive(Default, Clone, Debug)]
pub struct RequestContext {
    pub auth_token: Option<String>,
}

impl ConnectionBuilder {
    pub fn new(database_id: DatabaseId) -> Self {
        Self {
            database_id,
            client: None,
            emulator_host: None,
            timeouts: Timeouts::default(),
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_emulator_host(mut self, host: impl Into<String>) -> Self {
        self.emulator_host = Some(host.into());
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn build(self) -> FirestoreResult<Connection> {
        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .connect_timeout(self.timeouts.connect)
                .timeout(self.timeouts.total)
                .build()
                .map_err(|err| configuration_error(format!("Failed to build HTTP client: {err}")))?,
        };
        let base_url = build_base_url(&self.database_id, self.emulator_host.as_deref());
        Ok(Connection {
            client,
            base_url,
            timeouts: self.timeouts,
        })
    }
}

impl Connection {
    pub fn builder(database_id: DatabaseId) -> ConnectionBuilder {
        ConnectionBuilder::new(database_id)
    }

    /// `.../v1/projects/{project}/databases/{database}/documents`
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// Sends one request and parses the body as a single JSON value.
    /// An empty success body parses as `null`.
    pub async fn request_json(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&JsonValue>,
        context: &RequestContext,
    ) -> FirestoreResult<JsonValue> {
        let (status, text) = self.send(method, path, query, body, context).await?;
        if !status.is_success() {
            return Err(map_http_error(status, &text));
        }
        parse_json(&text)
    }

    /// Like [`Connection::request_json`] but maps HTTP 404 to `None`.
    pub async fn request_json_optional(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&JsonValue>,
        context: &RequestContext,
    ) -> FirestoreResult<Option<JsonValue>> {
        let (status, text) = self.send(method, path, query, body, context).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(map_http_error(status, &text));
        }
        parse_json(&text).map(Some)
    }

    /// Sends one request whose response is a sequence of JSON values: a JSON
    /// array, newline-delimited JSON, or an empty body.
    pub async fn request_json_lines(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&JsonValue>,
        context: &RequestContext,
    ) -> FirestoreResult<Vec<JsonValue>> {
        let (status, text) = self.send(method, path, query, body, context).await?;
        if !status.is_success() {
            return Err(map_http_error(status, &text));
        }
        parse_json_lines(&text)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&JsonValue>,
        context: &RequestContext,
    ) -> FirestoreResult<(StatusCode, String)> {
        let mut request = self.build_request(method, path, context);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request
            .send()
            .await
            .map_err(|err| transport_error(describe_send_error(&err)))?;
        let status = response.status();
        let text = tokio::time::timeout(self.timeouts.read, response.text())
            .await
            .map_err(|_| {
                transport_error(format!(
                    "Timed out after {:?} reading Firestore response body",
                    self.timeouts.read
                ))
            })?
            .map_err(|err| transport_error(format!("Failed to read Firestore response: {err}")))?;
        Ok((status, text))
    }

    fn build_request(&self, method: Method, path: &str, context: &RequestContext) -> RequestBuilder {
        let url = self.url(path);
        let mut builder = self
            .client
            .request(method, url)
            .timeout(self.timeouts.total)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json");
        if let Some(token) = context.auth_token.as_deref() {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            self.base_url.clone()
        } else if path.starts_with(':') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }
}

fn describe_send_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("Firestore request timed out: {err}")
    } else if err.is_connect() {
        format!("Failed to connect to Firestore: {err}")
    } else {
        format!("Firestore request failed: {err}")
    }
}

fn parse_json(text: &str) -> FirestoreResult<JsonValue> {
    if text.trim().is_empty() {
        return Ok(JsonValue::Null);
    }
    serde_json::from_str(text)
        .map_err(|err| internal_error(format!("Invalid JSON in Firestore response: {err}")))
}

pub(crate) fn parse_json_lines(text: &str) -> FirestoreResult<Vec<JsonValue>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return match parse_json(trimmed)? {
            JsonValue::Array(values) => Ok(values),
            other => Ok(vec![other]),
        };
    }
    serde_json::Deserializer::from_str(trimmed)
        .into_iter::<JsonValue>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| internal_error(format!("Invalid JSON line in Firestore response: {err}")))
}

fn build_base_url(database_id: &DatabaseId, emulator_host: Option<&str>) -> String {
    let host = match emulator_host {
        Some(host) if host.starts_with("http://") || host.starts_with("https://") => {
            host.trim_end_matches('/').to_string()
        }
        Some(host) => format!("http://{}", host.trim_end_matches('/')),
        None => FIRESTORE_API_HOST.to_string(),
    };
    format!(
        "{host}/{FIRESTORE_API_VERSION}/{}/documents",
        database_id.database_name()
    )
}
