//! Bearer-token supply for outbound Firestore requests.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::FirestoreResult;

mod credentials;
mod token_exchange;
mod token_manager;
mod token_provider;

pub use credentials::ServiceAccountKey;
pub use token_manager::{AccessToken, TokenManager};
pub use token_provider::ServiceAccountTokenProvider;

/// Supplies the bearer token attached to each request. `None` sends no
/// `Authorization` header (emulator).
#[async_trait]
pub trait TokenProvider: Send + Sync + 'static {
    async fn get_token(&self) -> FirestoreResult<Option<String>>;
}

pub type TokenProviderArc = Arc<dyn TokenProvider>;

#[derive(Default, Clone, Debug)]
pub struct NoopTokenProvider;

#[async_trait]
impl TokenProvider for NoopTokenProvider {
    async fn get_token(&self) -> FirestoreResult<Option<String>> {
        Ok(None)
    }
}

/// Always returns the same token; handy for tests and externally managed credentials.
#[derive(Clone, Debug)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn get_token(&self) -> FirestoreResult<Option<String>> {
        Ok(Some(self.token.clone()))
    }
}
