use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;

use crate::constants::TOKEN_REFRESH_SKEW;
use crate::error::FirestoreResult;
use crate::remote::Timeouts;

use super::credentials::ServiceAccountKey;
use super::token_exchange::exchange_assertion;
use super::token_manager::TokenManager;
use super::{TokenProvider, TokenProviderArc};

/// Mints OAuth access tokens from a service-account key and caches them until
/// shortly before expiry.
pub struct ServiceAccountTokenProvider {
    key: ServiceAccountKey,
    client: Client,
    timeouts: Timeouts,
    tokens: TokenManager,
}

impl ServiceAccountTokenProvider {
    pub fn new(key: ServiceAccountKey, client: Client) -> Self {
        Self {
            key,
            client,
            timeouts: Timeouts::default(),
            tokens: TokenManager::new(TOKEN_REFRESH_SKEW),
        }
    }

    /// Deadlines for token requests, applied on top of the client's own settings.
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn from_key_file(path: impl AsRef<Path>, client: Client) -> FirestoreResult<Self> {
        Ok(Self::new(ServiceAccountKey::from_file(path)?, client))
    }

    pub fn key(&self) -> &ServiceAccountKey {
        &self.key
    }

    pub fn into_arc(self) -> TokenProviderArc {
        Arc::new(self)
    }

    /// Drops the cached token so the next call performs a fresh exchange.
    pub async fn invalidate(&self) {
        self.tokens.clear().await;
    }
}

#[async_trait]
impl TokenProvider for ServiceAccountTokenProvider {
    async fn get_token(&self) -> FirestoreResult<Option<String>> {
        let token = self
            .tokens
            .get_or_refresh(|| exchange_assertion(&self.client, &self.key, self.timeouts))
            .await?;
        Ok(Some(token))
    }
}

impl std::fmt::Debug for ServiceAccountTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountTokenProvider")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
