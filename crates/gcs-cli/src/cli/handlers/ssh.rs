//! SSH command handler

use super::{build_token_manager, environment_client};
use crate::api::{EnvironmentStatus, LifecycleState};
use crate::auth::{AuthenticatedClient, CredentialProvider};
use crate::config::CliConfig;
use crate::error::{CliError, Result};
use crate::output::{print_info, print_warning};
use crate::readiness::{ReadinessError, ReadinessPoller};
use crate::ssh::SshConfig;
use std::sync::Mutex;
use tracing::info;

/// Handle ssh command
pub async fn handle_ssh(args: Vec<String>, config: &CliConfig) -> Result<()> {
    let manager = build_token_manager(config).await?;
    let ssh_config = resolve_connection(&manager, config).await?;

    info!(
        "Connecting to {}:{}",
        ssh_config.destination(),
        ssh_config.port
    );
    let settings = config.ssh.clone();
    tokio::task::spawn_blocking(move || ssh_config.launch(&settings, &args))
        .await
        .map_err(CliError::internal)??;
    Ok(())
}

/// Poll the environment until it can be connected to
///
/// A rejected credential triggers one reauthorization and one more poll; a
/// second rejection is returned to the caller.
pub async fn resolve_connection<P: CredentialProvider + ?Sized>(
    credentials: &P,
    config: &CliConfig,
) -> Result<SshConfig> {
    let client = credentials.client().await?;

    match wait_for_ssh(client, config).await {
        Err(e) if e.is_unauthorized() => {
            print_warning("Unauthorized or token has expired, reauthorizing");
            let client = credentials.reauthenticate().await?;
            Ok(wait_for_ssh(client, config).await?)
        }
        other => Ok(other?),
    }
}

async fn wait_for_ssh(
    client: AuthenticatedClient,
    config: &CliConfig,
) -> std::result::Result<SshConfig, ReadinessError> {
    let api = environment_client(client, config);
    let last_state: Mutex<Option<LifecycleState>> = Mutex::new(None);

    let poller = ReadinessPoller::new(&api, config.poll.policy())
        .with_observer(|status: &EnvironmentStatus| report_state(&last_state, status));
    let result = poller.wait_until_ready().await;
    result
}

/// Print the state whenever it changes
fn report_state(last_state: &Mutex<Option<LifecycleState>>, status: &EnvironmentStatus) {
    let Ok(mut last) = last_state.lock() else {
        return;
    };
    if last.as_ref() == Some(&status.state) {
        return;
    }
    if status.error().is_none() {
        print_info(&format!("Environment is {}", status.state));
    }
    *last = Some(status.state.clone());
}
