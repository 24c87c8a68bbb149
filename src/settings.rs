//! Client configuration.

use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;

use crate::auth::TokenProviderArc;
use crate::constants::MIN_TIMEOUT;
use crate::error::{configuration_error, FirestoreResult};
use crate::remote::{RetrySettings, Timeouts};

pub const ENV_PROJECT_ID: &str = "FIRESTORE_PROJECT_ID";
pub const ENV_GOOGLE_CLOUD_PROJECT: &str = "GOOGLE_CLOUD_PROJECT";
pub const ENV_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const ENV_DATABASE: &str = "FIRESTORE_DATABASE";
pub const ENV_EMULATOR_HOST: &str = "FIRESTORE_EMULATOR_HOST";
pub const ENV_TIMEOUT: &str = "FIRESTORE_TIMEOUT";
pub const ENV_CONNECT_TIMEOUT: &str = "FIRESTORE_CONNECT_TIMEOUT";
pub const ENV_READ_TIMEOUT: &str = "FIRESTORE_READ_TIMEOUT";

/// Everything needed to construct a [`crate::Firestore`] client.
///
/// A project id is required. Credentials come from a service-account key file
/// unless an emulator host or an explicit token provider is configured.
#[derive(Clone, Default)]
pub struct FirestoreSettings {
    project_id: Option<String>,
    key_file_path: Option<PathBuf>,
    database: Option<String>,
    timeouts: Timeouts,
    http_client: Option<Client>,
    emulator_host: Option<String>,
    retry: RetrySettings,
    token_provider: Option<TokenProviderArc>,
}

impl FirestoreSettings {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self::default().with_project_id(project_id)
    }

    /// Reads settings from the process environment.
    pub fn from_env() -> FirestoreResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> FirestoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut settings = Self::default();
        settings.project_id = read(ENV_PROJECT_ID).or_else(|| read(ENV_GOOGLE_CLOUD_PROJECT));
        settings.key_file_path = read(ENV_CREDENTIALS).map(PathBuf::from);
        settings.database = read(ENV_DATABASE);
        settings.emulator_host = read(ENV_EMULATOR_HOST);
        if let Some(value) = read(ENV_TIMEOUT) {
            settings = settings.with_timeout(parse_seconds(ENV_TIMEOUT, &value)?);
        }
        if let Some(value) = read(ENV_CONNECT_TIMEOUT) {
            settings = settings.with_connect_timeout(parse_seconds(ENV_CONNECT_TIMEOUT, &value)?);
        }
        if let Some(value) = read(ENV_READ_TIMEOUT) {
            settings = settings.with_read_timeout(parse_seconds(ENV_READ_TIMEOUT, &value)?);
        }
        Ok(settings)
    }

    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_key_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_file_path = Some(path.into());
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Total request deadline, at least one second.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.total = timeout.max(MIN_TIMEOUT);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.connect = timeout.max(MIN_TIMEOUT);
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.read = timeout.max(MIN_TIMEOUT);
        self
    }

    /// Uses the given client for both Firestore and token requests. Its own
    /// connect timeout applies; the total and read timeouts are still enforced
    /// per request.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn with_emulator_host(mut self, host: impl Into<String>) -> Self {
        self.emulator_host = Some(host.into());
        self
    }

    pub fn with_retry_settings(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }

    /// Overrides credential handling entirely; no key file is read.
    pub fn with_token_provider(mut self, provider: TokenProviderArc) -> Self {
        self.token_provider = Some(provider);
        self
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    pub fn key_file_path(&self) -> Option<&Path> {
        self.key_file_path.as_deref()
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    pub fn emulator_host(&self) -> Option<&str> {
        self.emulator_host.as_deref()
    }

    pub fn retry_settings(&self) -> &RetrySettings {
        &self.retry
    }

    pub(crate) fn token_provider(&self) -> Option<&TokenProviderArc> {
        self.token_provider.as_ref()
    }

    /// The injected client, or a new one honouring the configured timeouts.
    pub(crate) fn build_client(&self) -> FirestoreResult<Client> {
        if let Some(client) = &self.http_client {
            return Ok(client.clone());
        }
        Client::builder()
            .connect_timeout(self.timeouts.connect)
            .timeout(self.timeouts.total)
            .build()
            .map_err(|err| configuration_error(format!("Failed to build HTTP client: {err}")))
    }
}

impl Debug for FirestoreSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirestoreSettings")
            .field("project_id", &self.project_id)
            .field("key_file_path", &self.key_file_path)
            .field("database", &self.database)
            .field("timeouts", &self.timeouts)
            .field("http_client", &self.http_client.is_some())
            .field("emulator_host", &self.emulator_host)
            .field("retry", &self.retry)
            .field("token_provider", &self.token_provider.is_some())
            .finish()
    }
}

fn parse_seconds(name: &str, value: &str) -> FirestoreResult<Duration> {
    let seconds: f64 = value
        .parse()
        .map_err(|_| configuration_error(format!("{name} must be a number of seconds, got '{value}'")))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(configuration_error(format!(
            "{name} must be a non-negative number of seconds, got '{value}'"
        )));
    }
    Ok(Duration::from_secs_f64(seconds))
}
