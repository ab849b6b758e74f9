//! OAuth 2.0 authorization code flow with PKCE
//!
//! Builds the authorization URL, exchanges the returned code for a
//! credential and renews expired credentials with their refresh token.

use super::types::{AuthError, AuthResult, AuthorizationCode, ClientSecrets, Credential};
use oauth2::{
    basic::{BasicClient, BasicErrorResponse, BasicTokenResponse},
    reqwest::async_http_client,
    AuthType, AuthUrl, AuthorizationCode as OAuthCode, ClientId, ClientSecret, CsrfToken,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RefreshToken, RequestTokenError, Scope,
    TokenResponse, TokenUrl,
};
use tracing::{debug, info};

/// Everything produced while building the authorization URL that the
/// exchange step needs again
#[derive(Debug)]
pub struct AuthorizationRequest {
    url: String,
    state: CsrfToken,
    pkce_verifier: PkceCodeVerifier,
    redirect_uri: String,
}

impl AuthorizationRequest {
    /// URL to open in the browser
    pub fn url(&self) -> &str {
        &self.url
    }

    /// CSRF nonce carried in the `state` parameter
    pub fn state(&self) -> &str {
        self.state.secret()
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }
}

/// OAuth flow implementation with PKCE support
#[derive(Debug, Clone)]
pub struct OAuthFlow {
    secrets: ClientSecrets,
    scopes: Vec<String>,
}

impl OAuthFlow {
    /// Create a new OAuth flow instance
    pub fn new(secrets: ClientSecrets, scopes: Vec<String>) -> Self {
        debug!(
            "Initializing OAuth flow with client_id: {}",
            secrets.client_id
        );
        Self { secrets, scopes }
    }

    fn client(&self, redirect_uri: Option<&str>) -> AuthResult<BasicClient> {
        let mut client = BasicClient::new(
            ClientId::new(self.secrets.client_id.clone()),
            self.secrets.client_secret.clone().map(ClientSecret::new),
            AuthUrl::new(self.secrets.auth_uri.clone())
                .map_err(|e| AuthError::ConfigError(format!("Invalid auth endpoint: {}", e)))?,
            Some(
                TokenUrl::new(self.secrets.token_uri.clone()).map_err(|e| {
                    AuthError::ConfigError(format!("Invalid token endpoint: {}", e))
                })?,
            ),
        )
        // Google expects client credentials in the form body
        .set_auth_type(AuthType::RequestBody);

        if let Some(uri) = redirect_uri {
            client = client.set_redirect_uri(
                RedirectUrl::new(uri.to_string())
                    .map_err(|e| AuthError::ConfigError(format!("Invalid redirect URI: {}", e)))?,
            );
        }

        Ok(client)
    }

    /// Build the authorization URL for the given redirect URI
    pub fn authorization_request(&self, redirect_uri: &str) -> AuthResult<AuthorizationRequest> {
        debug!("Building authorization URL");

        let client = self.client(Some(redirect_uri))?;
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut request = client
            .authorize_url(CsrfToken::new_random)
            .set_pkce_challenge(pkce_challenge)
            // Offline access yields a refresh token on the first consent
            .add_extra_param("access_type", "offline");

        for scope in &self.scopes {
            request = request.add_scope(Scope::new(scope.clone()));
        }

        let (url, state) = request.url();

        Ok(AuthorizationRequest {
            url: url.to_string(),
            state,
            pkce_verifier,
            redirect_uri: redirect_uri.to_string(),
        })
    }

    /// Exchange authorization code for a credential
    pub async fn exchange_code(
        &self,
        code: AuthorizationCode,
        request: AuthorizationRequest,
    ) -> AuthResult<Credential> {
        debug!("Exchanging authorization code for tokens");

        let client = self.client(Some(&request.redirect_uri))?;
        let response = client
            .exchange_code(OAuthCode::new(code.into_secret()))
            .set_pkce_verifier(request.pkce_verifier)
            .request_async(async_http_client)
            .await
            .map_err(|e| token_error("Token exchange failed", e))?;

        info!("Token exchange completed successfully");
        Ok(credential_from_response(&response, None))
    }

    /// Renew a credential with its refresh token
    ///
    /// Google usually omits the refresh token on renewal; the existing one is
    /// carried over in that case.
    pub async fn refresh(&self, credential: &Credential) -> AuthResult<Credential> {
        let refresh_token = credential
            .refresh_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::AuthorizationDenied("No refresh token available".into()))?;

        debug!("Refreshing access token");

        let response = self
            .client(None)?
            .exchange_refresh_token(&RefreshToken::new(refresh_token.clone()))
            .request_async(async_http_client)
            .await
            .map_err(|e| token_error("Token refresh failed", e))?;

        info!("Token refresh completed successfully");
        Ok(credential_from_response(&response, Some(refresh_token)))
    }
}

fn credential_from_response(
    response: &BasicTokenResponse,
    previous_refresh_token: Option<String>,
) -> Credential {
    let refresh_token = response
        .refresh_token()
        .map(|rt| rt.secret().to_string())
        .or(previous_refresh_token);

    Credential::new(
        response.access_token().secret().to_string(),
        refresh_token,
        response.expires_in(),
    )
}

fn token_error<RE>(context: &str, error: RequestTokenError<RE, BasicErrorResponse>) -> AuthError
where
    RE: std::error::Error + 'static,
{
    match error {
        RequestTokenError::ServerResponse(response) => {
            AuthError::AuthorizationDenied(format!("{}: {}", context, response))
        }
        RequestTokenError::Request(e) => AuthError::NetworkError(format!("{}: {}", context, e)),
        RequestTokenError::Parse(e, _body) => {
            AuthError::NetworkError(format!("{}: invalid token response: {}", context, e))
        }
        RequestTokenError::Other(message) => {
            AuthError::NetworkError(format!("{}: {}", context, message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow() -> OAuthFlow {
        OAuthFlow::new(
            ClientSecrets {
                client_id: "client-id".into(),
                client_secret: Some("client-secret".into()),
                auth_uri: "https://accounts.google.com/o/oauth2/auth".into(),
                token_uri: "https://oauth2.googleapis.com/token".into(),
            },
            vec!["https://www.googleapis.com/auth/cloud-platform".into()],
        )
    }

    #[test]
    fn test_authorization_url_contents() {
        let request = flow()
            .authorization_request("http://127.0.0.1:8086/callback")
            .unwrap();
        let url = url::Url::parse(request.url()).unwrap();
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(params["client_id"], "client-id");
        assert_eq!(params["redirect_uri"], "http://127.0.0.1:8086/callback");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["access_type"], "offline");
        assert_eq!(params["code_challenge_method"], "S256");
        assert_eq!(params["state"], request.state());
        assert!(params["scope"].contains("cloud-platform"));
    }

    #[test]
    fn test_each_request_has_fresh_state() {
        let flow = flow();
        let a = flow.authorization_request("http://127.0.0.1:8086/callback").unwrap();
        let b = flow.authorization_request("http://127.0.0.1:8086/callback").unwrap();

        assert_ne!(a.state(), b.state());
    }

    #[test]
    fn test_invalid_redirect_is_config_error() {
        let err = flow().authorization_request("not a url").unwrap_err();
        assert!(matches!(err, AuthError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token_fails() {
        let credential = Credential::new("a", None, None);
        let err = flow().refresh(&credential).await.unwrap_err();
        assert!(matches!(err, AuthError::AuthorizationDenied(_)));
    }
}
