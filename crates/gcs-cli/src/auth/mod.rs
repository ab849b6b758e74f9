//! Authentication module
//!
//! This module provides the OAuth 2.0 credential lifecycle:
//! - Loopback authorization code flow with PKCE
//! - Manual code entry when no browser is available
//! - Atomic on-disk token storage
//! - Refresh of expired tokens

pub mod authorizer;
pub mod callback_server;
pub mod manager;
pub mod oauth_flow;
pub mod token_store;
pub mod types;

pub use authorizer::{
    BrowserLauncher, CodePrompt, LoopbackAuthorizer, NoBrowser, SystemBrowser, TerminalPrompt,
};
pub use manager::{AuthenticatedClient, CredentialProvider, TokenManager};
pub use oauth_flow::OAuthFlow;
pub use token_store::TokenStore;
pub use types::{AuthError, AuthResult, AuthorizationCode, ClientSecrets, Credential};
