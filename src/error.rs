use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FirestoreErrorCode {
    InvalidArgument,
    Configuration,
    Auth,
    Transport,
    UnsupportedOperator,
    Internal,
}

impl FirestoreErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FirestoreErrorCode::InvalidArgument => "firestore/invalid-argument",
            FirestoreErrorCode::Configuration => "firestore/configuration",
            FirestoreErrorCode::Auth => "firestore/auth",
            FirestoreErrorCode::Transport => "firestore/transport",
            FirestoreErrorCode::UnsupportedOperator => "firestore/unsupported-operator",
            FirestoreErrorCode::Internal => "firestore/internal",
        }
    }
}

#[derive(Clone, Debug)]
pub struct FirestoreError {
    pub code: FirestoreErrorCode,
    message: String,
    http_status: Option<u16>,
    body: Option<String>,
}

impl FirestoreError {
    pub fn new(code: FirestoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            http_status: None,
            body: None,
        }
    }

    /// Attaches the upstream HTTP status and raw response body.
    pub fn with_response(mut self, status: u16, body: impl Into<String>) -> Self {
        self.http_status = Some(status);
        let body = body.into();
        if !body.is_empty() {
            self.body = Some(body);
        }
        self
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status of the failed upstream call, when the failure came from a response.
    pub fn http_status(&self) -> Option<u16> {
        self.http_status
    }

    /// Raw upstream response body, kept for diagnostics.
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

impl Display for FirestoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.http_status {
            Some(status) => write!(f, "{} (HTTP {status}, {})", self.message, self.code_str()),
            None => write!(f, "{} ({})", self.message, self.code_str()),
        }
    }
}

impl Error for FirestoreError {}

pub type FirestoreResult<T> = Result<T, FirestoreError>;

pub fn invalid_argument(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::InvalidArgument, message)
}

pub fn configuration_error(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::Configuration, message)
}

pub fn missing_project_id() -> FirestoreError {
    configuration_error("Firestore settings must include a project_id")
}

pub fn auth_error(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::Auth, message)
}

pub fn transport_error(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::Transport, message)
}

pub fn unsupported_operator(operator: &str) -> FirestoreError {
    FirestoreError::new(
        FirestoreErrorCode::UnsupportedOperator,
        format!("Query operator '{operator}' is not supported; only equality ('=') filters are available"),
    )
}

pub fn internal_error(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::Internal, message)
}
