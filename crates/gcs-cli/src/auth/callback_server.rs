//! Local HTTP callback server for OAuth authorization code flow
//!
//! This module implements a temporary loopback HTTP server that receives the
//! authorization redirect from the browser. It hands exactly one code to the
//! waiting caller through a oneshot channel and then shuts itself down.

use super::types::{AuthError, AuthResult, AuthorizationCode};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex, Notify};
use tracing::{debug, info, warn};

/// Query parameters from OAuth callback
#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Shared state for callback handling
struct CallbackState {
    /// Taken on first delivery; `None` afterwards
    sender: Mutex<Option<oneshot::Sender<AuthorizationCode>>>,
    expected_state: String,
    shutdown: Arc<Notify>,
    grace: Duration,
}

/// A bound, not yet serving, callback listener
pub struct CallbackServer {
    listener: TcpListener,
    grace: Duration,
}

/// Handle to a running callback server; resolves to the delivered code
#[derive(Debug)]
pub struct PendingCode {
    receiver: oneshot::Receiver<AuthorizationCode>,
}

impl CallbackServer {
    /// Bind the loopback listener
    ///
    /// Binding happens before the browser is opened so the redirect can
    /// never arrive ahead of the socket.
    pub async fn bind(addr: SocketAddr, grace: Duration) -> AuthResult<Self> {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            AuthError::CallbackServerError(format!("Failed to bind to {}: {}", addr, e))
        })?;
        Ok(Self { listener, grace })
    }

    /// Address actually bound (differs from the request when port 0 was used)
    pub fn local_addr(&self) -> AuthResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Redirect URI that routes back to this listener
    pub fn redirect_uri(&self) -> AuthResult<String> {
        Ok(format!("http://{}/callback", self.local_addr()?))
    }

    /// Start serving in a background task
    pub fn spawn(self, expected_state: impl Into<String>) -> PendingCode {
        let (tx, rx) = oneshot::channel();
        let shutdown = Arc::new(Notify::new());

        let state = Arc::new(CallbackState {
            sender: Mutex::new(Some(tx)),
            expected_state: expected_state.into(),
            shutdown: shutdown.clone(),
            grace: self.grace,
        });

        let app = router(state);
        let listener = self.listener;

        if let Ok(addr) = listener.local_addr() {
            info!("OAuth callback server listening on http://{}", addr);
        }

        tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.notified().await })
                .await;
            match result {
                Ok(()) => debug!("OAuth callback server stopped"),
                Err(e) => warn!("OAuth callback server error: {}", e),
            }
        });

        PendingCode { receiver: rx }
    }
}

impl PendingCode {
    /// Wait for the browser redirect to deliver a code
    pub async fn wait(self, timeout: Option<Duration>) -> AuthResult<AuthorizationCode> {
        let received = match timeout {
            Some(limit) => tokio::time::timeout(limit, self.receiver)
                .await
                .map_err(|_| AuthError::Timeout)?,
            None => self.receiver.await,
        };

        received.map_err(|_| {
            AuthError::CallbackServerError("Callback server stopped before a code arrived".into())
        })
    }
}

fn router(state: Arc<CallbackState>) -> Router {
    Router::new()
        .route("/callback", get(handle_callback))
        .with_state(state)
}

/// Axum handler for OAuth callback
async fn handle_callback(
    Query(params): Query<CallbackQuery>,
    State(state): State<Arc<CallbackState>>,
) -> impl IntoResponse {
    let (status, page) = match check_callback(&params, &state.expected_state) {
        Err(message) => {
            debug!("Rejected OAuth callback: {}", message);
            (StatusCode::BAD_REQUEST, error_page(&message))
        }
        Ok(code) => {
            let sender = state.sender.lock().await.take();
            match sender {
                Some(sender) => {
                    if sender.send(AuthorizationCode::new(code)).is_err() {
                        warn!("Authorization code arrived but nobody is waiting for it");
                    }
                    schedule_shutdown(state.shutdown.clone(), state.grace);
                    (StatusCode::OK, success_page())
                }
                None => (StatusCode::OK, already_received_page()),
            }
        }
    };

    (
        status,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        Html(page),
    )
}

/// Validate the callback, returning the code to deliver or a message for the user
fn check_callback(params: &CallbackQuery, expected_state: &str) -> Result<String, String> {
    if let Some(error) = &params.error {
        return Err(params
            .error_description
            .clone()
            .unwrap_or_else(|| error.clone()));
    }

    let code = params
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| "Invalid authorization code.".to_string())?;

    match params.state.as_deref() {
        Some(received) if received == expected_state => Ok(code.to_string()),
        Some(_) => Err("State mismatch. Please restart the sign-in from the terminal.".into()),
        None => Err("Missing state parameter".into()),
    }
}

/// Stop the server once the response had time to flush
fn schedule_shutdown(shutdown: Arc<Notify>, grace: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        shutdown.notify_one();
    });
}

fn success_page() -> String {
    page(
        "Authorization Successful",
        "Authorization code received. You can now close this page.",
    )
}

fn already_received_page() -> String {
    page(
        "Already Authorized",
        "An authorization code was already received. You can close this page.",
    )
}

fn error_page(message: &str) -> String {
    page("Authorization Failed", &escape_html(message))
}

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 4rem auto; max-width: 32rem; text-align: center; }}
    </style>
</head>
<body>
    <h1>{title}</h1>
    <p>{body}</p>
</body>
</html>
"#
    )
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
