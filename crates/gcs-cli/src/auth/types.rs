//! Authentication-related types and data structures
//!
//! This module defines the credential shape persisted between runs, the
//! OAuth client configuration read from disk, and the auth error type.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;

/// OAuth2 credential: access token plus the metadata needed to reuse it.
///
/// The JSON layout matches the token files written by Go's `oauth2.Token`,
/// so tokens cached by earlier tooling load without conversion.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Access token for API requests
    pub access_token: String,
    /// Token type (usually "Bearer")
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Optional refresh token for token renewal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Expiration instant; absent means the token does not expire
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl Credential {
    /// Create a credential that expires `expires_in` from now
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in: Option<std::time::Duration>,
    ) -> Self {
        let expiry = expires_in
            .and_then(|d| ChronoDuration::from_std(d).ok())
            .map(|d| Utc::now() + d);

        Self {
            access_token: access_token.into(),
            token_type: default_token_type(),
            refresh_token,
            expiry,
        }
    }

    /// Effective expiry. Go writes the zero time (`0001-01-01T00:00:00Z`)
    /// for tokens without expiry; anything at or before the epoch counts as none.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expiry.filter(|at| at.timestamp() > 0)
    }

    /// Check if the access token is expired
    pub fn is_expired(&self) -> bool {
        self.expires_within(std::time::Duration::ZERO)
    }

    /// Check if the token expires within the specified duration
    pub fn expires_within(&self, margin: std::time::Duration) -> bool {
        match self.expires_at() {
            Some(at) => {
                let margin = ChronoDuration::from_std(margin).unwrap_or(ChronoDuration::zero());
                at <= Utc::now() + margin
            }
            None => false,
        }
    }

    /// Whether this credential can be renewed without user interaction
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expiry", &self.expiry)
            .finish()
    }
}

/// One-time authorization code handed over by the browser redirect or typed
/// in by the user. Deliberately not `Clone`: it is consumed by the exchange.
pub struct AuthorizationCode(String);

impl AuthorizationCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Consume the code, yielding the raw value for the token exchange
    pub fn into_secret(self) -> String {
        self.0
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthorizationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthorizationCode(<redacted>)")
    }
}

/// OAuth client configuration as downloaded from the Google Cloud console
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecretsFile {
    #[serde(default)]
    installed: Option<ClientSecrets>,
    #[serde(default)]
    web: Option<ClientSecrets>,
}

impl ClientSecretsFile {
    /// Pick the `installed` section, falling back to `web`
    pub fn into_secrets(self) -> Option<ClientSecrets> {
        self.installed.or(self.web)
    }
}

/// Client identity and endpoints for the authorization-code grant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    "https://accounts.google.com/o/oauth2/auth".to_string()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl ClientSecrets {
    /// Parse a client secrets JSON document
    pub fn from_json(content: &str) -> AuthResult<Self> {
        let file: ClientSecretsFile = serde_json::from_str(content)?;
        file.into_secrets().ok_or_else(|| {
            AuthError::ConfigError(
                "client secrets file has neither an 'installed' nor a 'web' section".to_string(),
            )
        })
    }

    /// Load client secrets from disk
    pub async fn load(path: &std::path::Path) -> AuthResult<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AuthError::ClientSecretsNotFound(path.to_path_buf())
            } else {
                AuthError::IoError(e)
            }
        })?;
        Self::from_json(&content)
    }
}

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// OAuth authorization was denied by user
    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    /// Network error during OAuth flow
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Client secrets file is missing
    #[error("OAuth client credentials not found at {}. Download an OAuth client (Desktop app) JSON from the Google Cloud console and save it there", .0.display())]
    ClientSecretsNotFound(PathBuf),

    /// No stored credential
    #[error("No stored credential found")]
    NotFound,

    /// Browser could not be launched
    #[error("Unable to open a browser: {0}")]
    BrowserUnavailable(String),

    /// The user supplied no authorization code
    #[error("No authorization code was entered")]
    EmptyCode,

    /// Callback server error
    #[error("Callback server error: {0}")]
    CallbackServerError(String),

    /// Timeout during authorization flow
    #[error("Authorization timeout")]
    Timeout,

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_go_token_layout_parses() {
        let json = r#"{
            "access_token": "ya29.a0",
            "token_type": "Bearer",
            "refresh_token": "1//0g",
            "expiry": "2031-05-04T10:11:12.123456789+02:00"
        }"#;

        let credential: Credential = serde_json::from_str(json).unwrap();
        assert_eq!(credential.access_token, "ya29.a0");
        assert_eq!(credential.refresh_token.as_deref(), Some("1//0g"));
        assert!(credential.expires_at().is_some());
        assert!(!credential.is_expired());
    }

    #[test]
    fn test_zero_expiry_never_expires() {
        let json = r#"{"access_token":"a","token_type":"Bearer","expiry":"0001-01-01T00:00:00Z"}"#;
        let credential: Credential = serde_json::from_str(json).unwrap();

        assert!(credential.expires_at().is_none());
        assert!(!credential.is_expired());
        assert!(!credential.can_refresh());
    }

    #[test]
    fn test_expiry_margin() {
        let credential = Credential::new("a", None, Some(Duration::from_secs(30)));

        assert!(!credential.is_expired());
        assert!(credential.expires_within(Duration::from_secs(60)));
        assert!(!credential.expires_within(Duration::from_secs(5)));
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let credential = Credential::new("secret-access", Some("secret-refresh".into()), None);
        let rendered = format!("{:?}", credential);

        assert!(!rendered.contains("secret-access"));
        assert!(!rendered.contains("secret-refresh"));
    }

    #[test]
    fn test_client_secrets_installed_section() {
        let json = r#"{"installed":{"client_id":"id.apps.googleusercontent.com","client_secret":"s","auth_uri":"https://accounts.google.com/o/oauth2/auth","token_uri":"https://oauth2.googleapis.com/token","redirect_uris":["http://localhost"]}}"#;
        let secrets = ClientSecrets::from_json(json).unwrap();

        assert_eq!(secrets.client_id, "id.apps.googleusercontent.com");
        assert_eq!(secrets.client_secret.as_deref(), Some("s"));
    }

    #[test]
    fn test_client_secrets_without_section_is_rejected() {
        let err = ClientSecrets::from_json(r#"{"other":{}}"#).unwrap_err();
        assert!(matches!(err, AuthError::ConfigError(_)));
    }
}
