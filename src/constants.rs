use std::time::Duration;

pub(crate) const DEFAULT_DATABASE_ID: &str = "(default)";

pub(crate) const FIRESTORE_API_HOST: &str = "https://firestore.googleapis.com";
pub(crate) const FIRESTORE_API_VERSION: &str = "v1";

pub(crate) const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub(crate) const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
pub(crate) const TOKEN_SCOPES: &str =
    "https://www.googleapis.com/auth/cloud-platform https://www.googleapis.com/auth/datastore";
pub(crate) const ASSERTION_LIFETIME_SECS: i64 = 3_600;
pub(crate) const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3_600;
pub(crate) const TOKEN_REFRESH_SKEW: Duration = Duration::from_secs(60);

pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub(crate) const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
pub(crate) const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(8);
pub(crate) const MIN_TIMEOUT: Duration = Duration::from_secs(1);

pub(crate) const DEFAULT_MAX_ATTEMPTS: usize = 2;
pub(crate) const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(150);
