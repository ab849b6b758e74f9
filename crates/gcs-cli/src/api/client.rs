//! API client for the Cloud Shell environments endpoint

use super::error::{ApiError, ApiResult};
use super::types::{AddPublicKeyRequest, EnvironmentStatus, ErrorDescriptor};
use crate::auth::AuthenticatedClient;
use async_trait::async_trait;
use reqwest::{header, Method, StatusCode};
use tracing::{debug, error, warn};

/// Default API URL when not specified
pub const DEFAULT_API_URL: &str = "https://cloudshell.googleapis.com/v1";

/// Resource name of the user's only environment
pub const DEFAULT_ENVIRONMENT: &str = "users/me/environments/default";

/// Operations on the remote environment
#[async_trait]
pub trait EnvironmentApi: Send + Sync {
    /// Fetch the current status
    async fn get_status(&self) -> ApiResult<EnvironmentStatus>;

    /// Ask the server to start the environment; `true` means accepted
    async fn start(&self) -> ApiResult<bool>;

    /// Authorize an SSH public key on the environment
    async fn add_public_key(&self, key: &str) -> ApiResult<()>;
}

/// Authenticated client for one environment
#[derive(Debug, Clone)]
pub struct EnvironmentClient {
    client: AuthenticatedClient,
    base_url: String,
    environment: String,
}

impl EnvironmentClient {
    pub fn new(
        client: AuthenticatedClient,
        base_url: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            environment: environment.into(),
        }
    }

    fn url(&self, verb: Option<&str>) -> String {
        let mut url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.environment.trim_matches('/')
        );
        if let Some(verb) = verb {
            url.push(':');
            url.push_str(verb);
        }
        url
    }
}

#[async_trait]
impl EnvironmentApi for EnvironmentClient {
    async fn get_status(&self) -> ApiResult<EnvironmentStatus> {
        let url = self.url(None);
        debug!("GET {}", url);

        let response = self.client.request(Method::GET, &url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<EnvironmentStatus>(&body) {
            Ok(mut decoded) => {
                if !status.is_success() && decoded.error().is_none() {
                    decoded.error = Some(ErrorDescriptor {
                        code: status.as_u16(),
                        state: status.canonical_reason().unwrap_or_default().to_string(),
                        message: String::new(),
                    });
                }
                Ok(decoded)
            }
            Err(_) if status == StatusCode::UNAUTHORIZED => Ok(EnvironmentStatus::unauthorized()),
            Err(source) => {
                error!("Failed to decode status response (HTTP {}): {}", status, body);
                Err(ApiError::Decode {
                    status: status.as_u16(),
                    body,
                    source,
                })
            }
        }
    }

    async fn start(&self) -> ApiResult<bool> {
        let url = self.url(Some("start"));
        debug!("POST {}", url);

        let response = self
            .client
            .request(Method::POST, &url)
            .header(header::CONTENT_LENGTH, 0)
            .send()
            .await?;
        let status = response.status();

        if status.is_success() {
            return Ok(true);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }

        let body = response.text().await.unwrap_or_default();
        warn!("Start request refused with status {}: {}", status, body);
        Ok(false)
    }

    async fn add_public_key(&self, key: &str) -> ApiResult<()> {
        let url = self.url(Some("addPublicKey"));
        debug!("POST {}", url);

        let response = self
            .client
            .request(Method::POST, &url)
            .json(&AddPublicKeyRequest { key })
            .send()
            .await?;
        let status = response.status();

        if status.is_success() {
            return Ok(());
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }

        let body = response.text().await.unwrap_or_default();
        error!("addPublicKey failed with status {}: {}", status, body);
        Err(ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }
}
