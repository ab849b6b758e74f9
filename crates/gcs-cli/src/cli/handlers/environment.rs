//! Environment command handlers

use super::{build_token_manager, environment_client};
use crate::api::EnvironmentApi;
use crate::config::CliConfig;
use crate::error::{CliError, Result};
use crate::output::{json_output, print_info, print_status, print_success, print_warning};
use crate::readiness::{start_if_suspended, ReadinessPoller, StartOutcome};
use std::path::Path;
use tracing::debug;

/// Key types accepted by the environment
const KEY_TYPE_PREFIXES: &[&str] = &["ssh-dss", "ssh-rsa", "ssh-ed25519", "ecdsa-sha2-", "sk-"];

/// Handle status command
pub async fn handle_status(config: &CliConfig, json: bool) -> Result<()> {
    let manager = build_token_manager(config).await?;
    let api = environment_client(manager.get_client().await?, config);

    let status = api.get_status().await?;
    if json {
        json_output(&status)?;
    } else {
        print_status(&status);
    }

    if status.is_unauthorized() {
        print_info("Run `gcs login` to authorize again");
    }
    Ok(())
}

/// Handle start command
///
/// Only a suspended environment is started; any other state is reported.
pub async fn handle_start(wait: bool, config: &CliConfig, json: bool) -> Result<()> {
    let manager = build_token_manager(config).await?;
    let api = environment_client(manager.get_client().await?, config);

    match start_if_suspended(&api).await? {
        StartOutcome::Requested { accepted: true } => print_success("Start requested"),
        StartOutcome::Requested { accepted: false } => {
            print_warning("Start request was not accepted")
        }
        StartOutcome::AlreadyRunning(status) => {
            if json {
                json_output(&status)?;
            } else {
                print_success("Environment is running");
            }
            return Ok(());
        }
        StartOutcome::InProgress(state) => print_info(&format!("Environment is {}", state)),
        StartOutcome::Unrecognized(state) => {
            print_warning(&format!("Unknown environment state: {}", state));
            return Ok(());
        }
    }

    if !wait {
        return Ok(());
    }

    print_info("Waiting for the environment to be running...");
    let status = ReadinessPoller::new(&api, config.poll.policy())
        .wait_until_running()
        .await?;

    if json {
        json_output(&status)?;
    } else {
        print_success("Environment is running");
        print_status(&status);
    }
    Ok(())
}

/// Handle add-public-key command
///
/// `key` is either the key text or a path to a file holding it.
pub async fn handle_add_public_key(key: &str, config: &CliConfig) -> Result<()> {
    let key = read_public_key(key).await?;
    validate_public_key(&key)?;

    let manager = build_token_manager(config).await?;
    let api = environment_client(manager.get_client().await?, config);

    api.add_public_key(&key).await?;
    print_success("Public key added");
    Ok(())
}

async fn read_public_key(input: &str) -> Result<String> {
    let expanded = shellexpand::tilde(input);
    let path = Path::new(expanded.as_ref());

    if path.is_file() {
        debug!("Reading public key from {}", path.display());
        let content = tokio::fs::read_to_string(path).await?;
        return Ok(content.trim().to_string());
    }
    Ok(input.trim().to_string())
}

/// Check the key type before sending it to the API
pub fn validate_public_key(key: &str) -> Result<()> {
    let mut fields = key.split_whitespace();
    let key_type = fields.next().unwrap_or_default();

    if !KEY_TYPE_PREFIXES
        .iter()
        .any(|prefix| key_type.starts_with(prefix))
    {
        return Err(CliError::invalid_input(format!(
            "Unsupported public key type '{}'. Expected one of ssh-dss, ssh-rsa, ecdsa-sha2-*, ssh-ed25519, sk-*",
            key_type
        )));
    }
    if fields.next().is_none() {
        return Err(CliError::invalid_input("Public key is missing its key data"));
    }
    Ok(())
}
