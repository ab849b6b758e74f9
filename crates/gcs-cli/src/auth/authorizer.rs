//! Obtaining an authorization code from the user
//!
//! The browser path opens the authorization URL and waits for the loopback
//! redirect. When the browser cannot be opened the URL is printed and the
//! user pastes the code instead; the listener is not used on that path.

use super::callback_server::CallbackServer;
use super::oauth_flow::{AuthorizationRequest, OAuthFlow};
use super::types::{AuthError, AuthResult, AuthorizationCode};
use crate::output::{print_info, print_warning};
use async_trait::async_trait;
use console::style;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{debug, warn};

/// Opens URLs in the user's browser
pub trait BrowserLauncher: Send + Sync {
    fn open(&self, url: &str) -> AuthResult<()>;
}

/// Launches the platform default browser
#[derive(Debug, Default)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> AuthResult<()> {
        webbrowser::open(url).map_err(|e| AuthError::BrowserUnavailable(e.to_string()))
    }
}

/// Never opens a browser; forces manual code entry
#[derive(Debug, Default)]
pub struct NoBrowser;

impl BrowserLauncher for NoBrowser {
    fn open(&self, _url: &str) -> AuthResult<()> {
        Err(AuthError::BrowserUnavailable(
            "browser launch disabled".to_string(),
        ))
    }
}

/// Asks the user for an authorization code
#[async_trait]
pub trait CodePrompt: Send + Sync {
    async fn prompt(&self, auth_url: &str) -> AuthResult<AuthorizationCode>;
}

/// Reads the code from the terminal
#[derive(Debug, Default)]
pub struct TerminalPrompt;

#[async_trait]
impl CodePrompt for TerminalPrompt {
    async fn prompt(&self, auth_url: &str) -> AuthResult<AuthorizationCode> {
        println!("Please manually open the following URL in your browser to authorize the access:");
        println!("{}", style(auth_url).dim());

        let input = tokio::task::spawn_blocking(|| {
            dialoguer::Input::<String>::new()
                .with_prompt("Enter the authorization code")
                .allow_empty(true)
                .interact_text()
        })
        .await
        .map_err(|e| AuthError::IoError(std::io::Error::other(e)))?
        .map_err(|e| AuthError::IoError(std::io::Error::other(e)))?;

        parse_manual_code(&input)
    }
}

/// Accept either the bare code or the full redirect URL copied from the
/// browser's address bar
pub fn parse_manual_code(input: &str) -> AuthResult<AuthorizationCode> {
    let input = input.trim();

    let code = match url::Url::parse(input) {
        Ok(url) => url
            .query_pairs()
            .find(|(key, _)| key == "code")
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default(),
        Err(_) => input.to_string(),
    };

    if code.is_empty() {
        return Err(AuthError::EmptyCode);
    }
    Ok(AuthorizationCode::new(code))
}

/// A code together with the request it answers
#[derive(Debug)]
pub struct AuthorizationGrant {
    pub code: AuthorizationCode,
    pub request: AuthorizationRequest,
}

/// Runs the loopback authorization flow
pub struct LoopbackAuthorizer {
    callback_address: SocketAddr,
    shutdown_grace: Duration,
    callback_timeout: Option<Duration>,
    browser: Box<dyn BrowserLauncher>,
    prompt: Box<dyn CodePrompt>,
}

impl LoopbackAuthorizer {
    pub fn new(callback_address: SocketAddr) -> Self {
        Self {
            callback_address,
            shutdown_grace: Duration::from_secs(3),
            callback_timeout: Some(Duration::from_secs(300)),
            browser: Box::new(SystemBrowser),
            prompt: Box::new(TerminalPrompt),
        }
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn with_callback_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.callback_timeout = timeout;
        self
    }

    pub fn with_browser(mut self, browser: Box<dyn BrowserLauncher>) -> Self {
        self.browser = browser;
        self
    }

    pub fn with_prompt(mut self, prompt: Box<dyn CodePrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    /// Obtain a one-time authorization code from the user
    pub async fn authorize(&self, flow: &OAuthFlow) -> AuthResult<AuthorizationGrant> {
        let server = match CallbackServer::bind(self.callback_address, self.shutdown_grace).await
        {
            Ok(server) => Some(server),
            Err(e) => {
                warn!("Callback listener unavailable, using manual entry: {}", e);
                None
            }
        };

        let redirect_uri = match &server {
            Some(server) => server.redirect_uri()?,
            None => format!("http://{}/callback", self.callback_address),
        };
        let request = flow.authorization_request(&redirect_uri)?;

        let server = match server {
            Some(server) => match self.browser.open(request.url()) {
                Ok(()) => Some(server),
                Err(e) => {
                    debug!("Browser launch failed: {}", e);
                    None
                }
            },
            None => None,
        };

        let code = match server {
            Some(server) => {
                print_info("Continue the sign in in your browser.");
                print_info("Browser didn't show up? Use the URL below to sign in:");
                println!("{}", style(request.url()).dim());
                print_info("Waiting for authorization code...");
                server
                    .spawn(request.state())
                    .wait(self.callback_timeout)
                    .await?
            }
            None => {
                print_warning("Could not open a browser for sign in.");
                self.prompt.prompt(request.url()).await?
            }
        };

        Ok(AuthorizationGrant { code, request })
    }
}
