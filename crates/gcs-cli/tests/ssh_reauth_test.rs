//! The ssh command re-runs the credential layer once on a rejected token

use async_trait::async_trait;
use gcs_cli::auth::{AuthResult, AuthenticatedClient, Credential, CredentialProvider};
use gcs_cli::cli::handlers::ssh::resolve_connection;
use gcs_cli::config::CliConfig;
use gcs_cli::ssh::SshConfig;
use gcs_cli::CliError;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENVIRONMENT_PATH: &str = "/v1/users/me/environments/default";

/// Hands out "old-token" first and "new-token" after reauthentication
#[derive(Default)]
struct ScriptedCredentials {
    reauthentications: AtomicUsize,
}

impl ScriptedCredentials {
    fn client_with(token: &str) -> AuthenticatedClient {
        AuthenticatedClient::new(reqwest::Client::new(), Credential::new(token, None, None))
    }

    fn reauthentications(&self) -> usize {
        self.reauthentications.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialProvider for ScriptedCredentials {
    async fn client(&self) -> AuthResult<AuthenticatedClient> {
        Ok(Self::client_with("old-token"))
    }

    async fn reauthenticate(&self) -> AuthResult<AuthenticatedClient> {
        self.reauthentications.fetch_add(1, Ordering::SeqCst);
        Ok(Self::client_with("new-token"))
    }
}

fn config_for(server: &MockServer) -> CliConfig {
    let mut config = CliConfig::default();
    config.api.base_url = format!("{}/v1", server.uri());
    config
}

async fn mount_status(server: &MockServer, token: &str, response: ResponseTemplate, calls: u64) {
    Mock::given(method("GET"))
        .and(path(ENVIRONMENT_PATH))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(response)
        .expect(calls)
        .mount(server)
        .await;
}

fn unauthorized() -> ResponseTemplate {
    ResponseTemplate::new(401).set_body_json(json!({
        "error": { "code": 401, "status": "UNAUTHENTICATED" }
    }))
}

#[tokio::test]
async fn test_rejected_token_is_replaced_once() {
    let server = MockServer::start().await;
    mount_status(&server, "old-token", unauthorized(), 1).await;
    mount_status(
        &server,
        "new-token",
        ResponseTemplate::new(200).set_body_json(json!({
            "state": "RUNNING",
            "sshUsername": "alice",
            "sshHost": "34.1.2.3",
            "sshPort": 6000,
        })),
        1,
    )
    .await;

    let credentials = ScriptedCredentials::default();
    let ssh_config = resolve_connection(&credentials, &config_for(&server))
        .await
        .unwrap();

    assert_eq!(
        ssh_config,
        SshConfig {
            host: "34.1.2.3".into(),
            port: 6000,
            username: "alice".into(),
        }
    );
    assert_eq!(credentials.reauthentications(), 1);
}

#[tokio::test]
async fn test_second_rejection_is_returned() {
    let server = MockServer::start().await;
    mount_status(&server, "old-token", unauthorized(), 1).await;
    mount_status(&server, "new-token", unauthorized(), 1).await;

    let credentials = ScriptedCredentials::default();
    let err = resolve_connection(&credentials, &config_for(&server))
        .await
        .unwrap_err();

    assert!(matches!(err, CliError::Readiness(ref e) if e.is_unauthorized()));
    assert_eq!(credentials.reauthentications(), 1);
}

#[tokio::test]
async fn test_accepted_token_needs_no_reauthentication() {
    let server = MockServer::start().await;
    mount_status(
        &server,
        "old-token",
        ResponseTemplate::new(200).set_body_json(json!({
            "state": "RUNNING",
            "sshHost": "34.1.2.3",
            "sshPort": 22,
            "sshUsername": "bob",
        })),
        1,
    )
    .await;

    let credentials = ScriptedCredentials::default();
    let ssh_config = resolve_connection(&credentials, &config_for(&server))
        .await
        .unwrap();

    assert_eq!(ssh_config.username, "bob");
    assert_eq!(credentials.reauthentications(), 0);
}
