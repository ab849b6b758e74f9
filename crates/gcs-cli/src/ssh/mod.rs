//! SSH operations module
//!
//! Resolves a running environment into connection parameters and hands them
//! to the system `ssh` binary.

use crate::api::{EnvironmentStatus, LifecycleState};
use crate::config::SshSettings;
use serde::Serialize;
use std::process::{Command, ExitStatus};
use tracing::{debug, info};

/// Connection parameters for a running environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SshConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
}

/// SSH errors
#[derive(Debug, thiserror::Error)]
pub enum SshError {
    /// Connection details only exist for a running environment
    #[error("Environment is not running (state: {0})")]
    NotRunning(LifecycleState),

    /// The API reported RUNNING but sent no host
    #[error("Environment is running but the API returned no SSH host")]
    MissingConnectionInfo,

    #[error("Failed to start SSH session: {0}")]
    Launch(#[from] std::io::Error),

    #[error("SSH session terminated with {0}")]
    Exited(ExitStatus),
}

/// Map a RUNNING status onto connection parameters, copied verbatim
pub fn resolve(status: &EnvironmentStatus) -> Result<SshConfig, SshError> {
    if status.state != LifecycleState::Running {
        return Err(SshError::NotRunning(status.state.clone()));
    }
    if status.ssh_host.is_empty() {
        return Err(SshError::MissingConnectionInfo);
    }

    Ok(SshConfig {
        host: status.ssh_host.clone(),
        port: status.ssh_port,
        username: status.ssh_username.clone(),
    })
}

impl SshConfig {
    /// `user@host` destination argument
    pub fn destination(&self) -> String {
        format!("{}@{}", self.username, self.host)
    }

    /// Build the `ssh` invocation for this connection
    pub fn command(&self, settings: &SshSettings, extra_args: &[String]) -> Command {
        let mut cmd = Command::new(&settings.binary);
        cmd.arg("-p")
            .arg(self.port.to_string())
            .args(&settings.options)
            .arg(self.destination())
            .args(extra_args);
        cmd
    }

    /// Run an interactive session with inherited stdio
    pub fn launch(self, settings: &SshSettings, extra_args: &[String]) -> Result<(), SshError> {
        info!("Opening SSH session to {}:{}", self.destination(), self.port);

        let mut cmd = self.command(settings, extra_args);
        debug!("Running {:?}", cmd);

        let status = cmd.status()?;
        if !status.success() {
            return Err(SshError::Exited(status));
        }
        Ok(())
    }
}
