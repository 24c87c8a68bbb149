use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::constants::DEFAULT_TOKEN_URI;
use crate::error::{configuration_error, FirestoreResult};

/// The subset of a Google service-account key file needed to mint access tokens.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub private_key: String,
    #[serde(default)]
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_file(path: impl AsRef<Path>) -> FirestoreResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|err| {
            configuration_error(format!(
                "Failed to read service account key {}: {err}",
                path.display()
            ))
        })?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(contents: &str) -> FirestoreResult<Self> {
        let key: ServiceAccountKey = serde_json::from_str(contents).map_err(|err| {
            configuration_error(format!("Malformed service account key: {err}"))
        })?;
        if key.client_email.trim().is_empty() {
            return Err(configuration_error(
                "Service account key is missing client_email",
            ));
        }
        if key.private_key.trim().is_empty() {
            return Err(configuration_error(
                "Service account key is missing private_key",
            ));
        }
        Ok(key)
    }
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FirestoreErrorCode;

    #[test]
    fn token_uri_defaults_to_google_oauth() {
        let key = ServiceAccountKey::from_json_str(
            r#"{"client_email":"svc@demo.iam.gserviceaccount.com","private_key":"pem"}"#,
        )
        .unwrap();
        assert_eq!(key.token_uri, "https://oauth2.googleapis.com/token");
        assert!(key.private_key_id.is_none());
    }

    #[test]
    fn missing_fields_are_configuration_errors() {
        let err = ServiceAccountKey::from_json_str(r#"{"private_key":"pem"}"#).unwrap_err();
        assert_eq!(err.code, FirestoreErrorCode::Configuration);
        assert!(err.message().contains("client_email"));

        let err =
            ServiceAccountKey::from_json_str(r#"{"client_email":"svc@demo"}"#).unwrap_err();
        assert!(err.message().contains("private_key"));
    }

    #[test]
    fn malformed_json_is_configuration_error() {
        let err = ServiceAccountKey::from_json_str("{not json").unwrap_err();
        assert_eq!(err.code, FirestoreErrorCode::Configuration);
    }

    #[test]
    fn missing_file_is_configuration_error() {
        let err = ServiceAccountKey::from_file("/definitely/not/here.json").unwrap_err();
        assert_eq!(err.code, FirestoreErrorCode::Configuration);
        assert!(err.message().contains("/definitely/not/here.json"));
    }

    #[test]
    fn debug_hides_private_key() {
        let key = ServiceAccountKey::from_json_str(
            r#"{"client_email":"svc@demo","private_key":"super-secret"}"#,
        )
        .unwrap();
        assert!(!format!("{key:?}").contains("super-secret"));
    }
}
