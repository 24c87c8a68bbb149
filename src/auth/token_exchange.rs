use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::constants::{
    ASSERTION_LIFETIME_SECS, DEFAULT_TOKEN_LIFETIME_SECS, JWT_BEARER_GRANT_TYPE, TOKEN_SCOPES,
};
use crate::error::{auth_error, FirestoreResult};
use crate::remote::Timeouts;

use super::credentials::ServiceAccountKey;
use super::token_manager::AccessToken;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    assertion: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Signs the RS256 JWT assertion presented to the token endpoint.
pub(crate) fn sign_assertion(key: &ServiceAccountKey, now: SystemTime) -> FirestoreResult<String> {
    let iat = now
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default();
    let claims = AssertionClaims {
        iss: key.client_email.clone(),
        scope: TOKEN_SCOPES.to_string(),
        aud: key.token_uri.clone(),
        iat,
        exp: iat + ASSERTION_LIFETIME_SECS,
    };
    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|err| auth_error(format!("Invalid service account private key: {err}")))?;
    encode(&header, &claims, &encoding_key)
        .map_err(|err| auth_error(format!("Failed to sign token assertion: {err}")))
}

/// Exchanges a signed assertion for an OAuth access token. The request is
/// bounded by `timeouts.total` and the body read by `timeouts.read`, whatever
/// the client's own configuration.
pub(crate) async fn exchange_assertion(
    client: &Client,
    key: &ServiceAccountKey,
    timeouts: Timeouts,
) -> FirestoreResult<AccessToken> {
    let issued_at = SystemTime::now();
    let assertion = sign_assertion(key, issued_at)?;
    let request = TokenRequest {
        grant_type: JWT_BEARER_GRANT_TYPE,
        assertion: &assertion,
    };

    log::debug!("requesting access token from {}", key.token_uri);
    let response = client
        .post(&key.token_uri)
        .timeout(timeouts.total)
        .form(&request)
        .send()
        .await
        .map_err(|err| auth_error(format!("Token request failed: {err}")))?;

    let status = response.status();
    let body = tokio::time::timeout(timeouts.read, response.text())
        .await
        .map_err(|_| {
            auth_error(format!(
                "Timed out after {:?} reading token response",
                timeouts.read
            ))
        })?
        .map_err(|err| auth_error(format!("Failed to read token response: {err}")))?;
    if !status.is_success() {
        return Err(auth_error(format!("Token endpoint returned {status}"))
            .with_response(status.as_u16(), body));
    }

    let parsed: TokenResponse = serde_json::from_str(&body).map_err(|err| {
        auth_error(format!("Token response is not valid JSON: {err}"))
            .with_response(status.as_u16(), body.clone())
    })?;
    let token = match parsed.access_token {
        Some(token) if !token.is_empty() => token,
        _ => {
            return Err(auth_error("Token response is missing access_token")
                .with_response(status.as_u16(), body))
        }
    };
    let lifetime = parsed
        .expires_in
        .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS)
        .max(0) as u64;
    Ok(AccessToken::expiring_in(
        token,
        issued_at,
        Duration::from_secs(lifetime),
    ))
}
