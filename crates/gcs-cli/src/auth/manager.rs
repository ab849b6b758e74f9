//! Credential lifecycle: reuse, refresh or obtain a token
//!
//! The TokenManager turns whatever is on disk into an authenticated client,
//! running the loopback authorization only when nothing usable is stored.

use super::authorizer::LoopbackAuthorizer;
use super::oauth_flow::OAuthFlow;
use super::token_store::TokenStore;
use super::types::{AuthError, AuthResult, Credential};
use crate::output::print_warning;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use std::time::Duration;
use tracing::{debug, info, warn};

/// HTTP client that attaches the bearer credential to every request
#[derive(Debug, Clone)]
pub struct AuthenticatedClient {
    http: reqwest::Client,
    credential: Credential,
}

impl AuthenticatedClient {
    pub fn new(http: reqwest::Client, credential: Credential) -> Self {
        Self { http, credential }
    }

    /// Start a request with the Authorization header set
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.credential.access_token)
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }
}

/// Hands out authenticated clients and recovers from rejected credentials
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Client for the current credential, authorizing if there is none
    async fn client(&self) -> AuthResult<AuthenticatedClient>;

    /// Client for a replacement credential after the API rejected the last one
    async fn reauthenticate(&self) -> AuthResult<AuthenticatedClient>;
}

/// Manages the credential for a single CLI run
pub struct TokenManager {
    store: TokenStore,
    flow: OAuthFlow,
    authorizer: LoopbackAuthorizer,
    http: reqwest::Client,
    refresh_margin: Duration,
}

impl TokenManager {
    pub fn new(
        store: TokenStore,
        flow: OAuthFlow,
        authorizer: LoopbackAuthorizer,
        http: reqwest::Client,
    ) -> Self {
        Self {
            store,
            flow,
            authorizer,
            http,
            refresh_margin: Duration::from_secs(60),
        }
    }

    /// Treat tokens expiring within `margin` as expired
    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Produce an authenticated client, authorizing interactively if needed
    pub async fn get_client(&self) -> AuthResult<AuthenticatedClient> {
        match self.load_usable().await {
            Ok(credential) => Ok(self.client_for(credential)),
            Err(e) => {
                debug!("No usable stored credential ({}), starting authorization", e);
                self.authorize().await
            }
        }
    }

    /// Recover from a rejected access token
    ///
    /// The stored refresh token is tried first; the interactive flow only
    /// runs when there is none or the token endpoint rejects it.
    pub async fn reauthenticate(&self) -> AuthResult<AuthenticatedClient> {
        if let Ok(stored) = self.store.load().await {
            if stored.can_refresh() {
                match self.flow.refresh(&stored).await {
                    Ok(refreshed) => {
                        info!("Access token renewed with the stored refresh token");
                        self.persist(&refreshed).await;
                        return Ok(self.client_for(refreshed));
                    }
                    Err(e) => warn!("Token refresh failed, authorizing again: {}", e),
                }
            }
        }
        self.login().await
    }

    /// Discard the stored credential and authorize again
    pub async fn login(&self) -> AuthResult<AuthenticatedClient> {
        if let Err(e) = self.store.delete().await {
            warn!("Failed to remove stored credential: {}", e);
        }
        self.authorize().await
    }

    /// Forget the stored credential
    pub async fn logout(&self) -> AuthResult<()> {
        self.store.delete().await
    }

    /// Load the stored credential, refreshing it when it is (nearly) expired
    async fn load_usable(&self) -> AuthResult<Credential> {
        let credential = self.store.load().await?;

        if !credential.expires_within(self.refresh_margin) {
            debug!("Using stored credential");
            return Ok(credential);
        }

        if !credential.can_refresh() {
            return Err(AuthError::AuthorizationDenied(
                "stored token expired and cannot be refreshed".to_string(),
            ));
        }

        info!("Stored token expired, refreshing");
        let refreshed = self.flow.refresh(&credential).await?;
        self.persist(&refreshed).await;
        Ok(refreshed)
    }

    async fn authorize(&self) -> AuthResult<AuthenticatedClient> {
        let grant = self.authorizer.authorize(&self.flow).await?;
        let credential = self.flow.exchange_code(grant.code, grant.request).await?;
        self.persist(&credential).await;
        Ok(self.client_for(credential))
    }

    /// Save failures only cost a re-authorization next run
    async fn persist(&self, credential: &Credential) {
        if let Err(e) = self.store.save(credential).await {
            warn!(
                "Failed to save token to {}: {}",
                self.store.path().display(),
                e
            );
            print_warning(&format!("Failed to save token to file: {}", e));
        }
    }

    fn client_for(&self, credential: Credential) -> AuthenticatedClient {
        AuthenticatedClient::new(self.http.clone(), credential)
    }
}

#[async_trait]
impl CredentialProvider for TokenManager {
    async fn client(&self) -> AuthResult<AuthenticatedClient> {
        self.get_client().await
    }

    async fn reauthenticate(&self) -> AuthResult<AuthenticatedClient> {
        TokenManager::reauthenticate(self).await
    }
}
