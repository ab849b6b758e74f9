//! Command handlers for the gcs CLI

pub mod auth;
pub mod environment;
pub mod ssh;

use crate::api::{ApiError, EnvironmentClient};
use crate::auth::{
    AuthenticatedClient, ClientSecrets, LoopbackAuthorizer, NoBrowser, OAuthFlow, TokenManager,
    TokenStore,
};
use crate::config::CliConfig;
use crate::error::Result;
use tracing::debug;

/// Build the credential manager described by the configuration
pub async fn build_token_manager(config: &CliConfig) -> Result<TokenManager> {
    let secrets = ClientSecrets::load(&config.auth.client_secrets_path()).await?;
    let flow = OAuthFlow::new(secrets, config.auth.scopes.clone());

    let mut authorizer = LoopbackAuthorizer::new(config.auth.callback_address)
        .with_shutdown_grace(config.auth.shutdown_grace())
        .with_callback_timeout(config.auth.callback_timeout());
    if !config.auth.open_browser {
        debug!("Browser launch disabled by configuration");
        authorizer = authorizer.with_browser(Box::new(NoBrowser));
    }

    let http = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()
        .map_err(ApiError::from)?;

    Ok(TokenManager::new(
        TokenStore::new(config.auth.token_path()),
        flow,
        authorizer,
        http,
    )
    .with_refresh_margin(config.auth.refresh_margin()))
}

/// Environment client bound to the configured API endpoint
pub fn environment_client(client: AuthenticatedClient, config: &CliConfig) -> EnvironmentClient {
    EnvironmentClient::new(client, &config.api.base_url, &config.api.environment)
}
