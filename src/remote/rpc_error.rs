use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::{transport_error, FirestoreError};

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: Option<GoogleError>,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

/// Builds a transport error for a non-success response, keeping the raw body.
pub fn map_http_error(status: StatusCode, body: &str) -> FirestoreError {
    let reason = status.canonical_reason().unwrap_or("HTTP error");
    let message = match extract_error_payload(body) {
        Some(GoogleError {
            message: Some(message),
            status: Some(code),
        }) if !message.is_empty() => format!("{code}: {message}"),
        Some(GoogleError {
            message: Some(message),
            ..
        }) if !message.is_empty() => message,
        _ => format!("Firestore request failed: {reason}"),
    };
    transport_error(message).with_response(status.as_u16(), body)
}

/// Statuses worth another attempt: throttling and transient server failures.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn extract_error_payload(body: &str) -> Option<GoogleError> {
    serde_json::from_str::<GoogleErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FirestoreErrorCode;

    #[test]
    fn uses_google_error_message() {
        let body = r#"{"error":{"code":400,"message":"Invalid field path","status":"INVALID_ARGUMENT"}}"#;
        let err = map_http_error(StatusCode::BAD_REQUEST, body);
        assert_eq!(err.code, FirestoreErrorCode::Transport);
        assert_eq!(err.message(), "INVALID_ARGUMENT: Invalid field path");
        assert_eq!(err.http_status(), Some(400));
        assert_eq!(err.body(), Some(body));
    }

    #[test]
    fn falls_back_to_reason_phrase() {
        let err = map_http_error(StatusCode::BAD_GATEWAY, "<html>upstream</html>");
        assert_eq!(err.message(), "Firestore request failed: Bad Gateway");
        assert_eq!(err.body(), Some("<html>upstream</html>"));
    }

    #[test]
    fn retryable_statuses() {
        for status in [429, 500, 502, 503, 504] {
            assert!(is_retryable_status(status), "{status}");
        }
        for status in [400, 401, 403, 404, 409] {
            assert!(!is_retryable_status(status), "{status}");
        }
    }
}
