//! Environment readiness polling
//!
//! Drives the remote environment from whatever lifecycle state it is in to
//! RUNNING. Each iteration fetches the status, maps it to an [`Action`] with
//! [`transition`], performs that action and sleeps before the next poll.
//!
//! Terminal outcomes are RUNNING (success), an unauthorized credential, a
//! remote error object, a transport or decode failure, or the overall
//! timeout. None of them is retried here; the caller decides what to do.

use crate::api::{ApiError, EnvironmentApi, EnvironmentStatus, LifecycleState};
use crate::ssh::{self, SshConfig, SshError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// What to do after observing a status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Environment is running; stop polling
    Connect,
    /// Credential rejected; the credential layer has to run again
    Reauthenticate,
    /// Some other error object came back
    Fail { code: u16, message: String },
    /// Environment is suspended; request a start and keep polling
    Start,
    /// Pending or starting; keep polling
    Wait,
    /// Empty or unknown state; keep polling with backoff
    Unrecognized,
}

/// Map an observed status to the next action
///
/// An error object is inspected before the lifecycle state.
pub fn transition(status: &EnvironmentStatus) -> Action {
    if let Some(error) = status.error() {
        if error.is_unauthorized() {
            return Action::Reauthenticate;
        }
        let message = if error.message.is_empty() {
            error.state.clone()
        } else {
            error.message.clone()
        };
        return Action::Fail {
            code: error.code,
            message,
        };
    }

    match status.state {
        LifecycleState::Running => Action::Connect,
        LifecycleState::Suspended => Action::Start,
        LifecycleState::Starting | LifecycleState::Pending => Action::Wait,
        LifecycleState::Unknown(_) => Action::Unrecognized,
    }
}

/// Delays and limits for the polling loop
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Delay between polls while the state is recognized
    pub interval: Duration,
    /// Upper bound for the backoff on unrecognized states
    pub max_interval: Duration,
    /// Give up after this long; `None` polls forever
    pub timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_interval: Duration::from_secs(30),
            timeout: Some(Duration::from_secs(600)),
        }
    }
}

/// Readiness errors
#[derive(Debug, thiserror::Error)]
pub enum ReadinessError {
    #[error("Unauthorized or token has expired, please reauthorize")]
    Unauthorized,

    #[error("Environment API returned error {code}: {message}")]
    Remote { code: u16, message: String },

    #[error(transparent)]
    Api(ApiError),

    #[error(transparent)]
    Connection(#[from] SshError),

    #[error("Environment did not become ready within {0:?}")]
    Timeout(Duration),
}

impl From<ApiError> for ReadinessError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Unauthorized => Self::Unauthorized,
            other => Self::Api(other),
        }
    }
}

impl ReadinessError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

/// Result of a single start-if-suspended attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// Environment was suspended; `accepted` is the server's answer to the start request
    Requested { accepted: bool },
    /// Nothing to do, the environment is running
    AlreadyRunning(EnvironmentStatus),
    /// A start is already underway
    InProgress(LifecycleState),
    /// The API reported a state this client does not know
    Unrecognized(LifecycleState),
}

/// Check the status once and request a start only if the environment is suspended
pub async fn start_if_suspended<A: EnvironmentApi + ?Sized>(
    api: &A,
) -> Result<StartOutcome, ReadinessError> {
    let status = api.get_status().await?;

    match transition(&status) {
        Action::Start => {
            info!("Environment suspended, requesting start");
            let accepted = api.start().await?;
            Ok(StartOutcome::Requested { accepted })
        }
        Action::Connect => Ok(StartOutcome::AlreadyRunning(status)),
        Action::Wait => Ok(StartOutcome::InProgress(status.state)),
        Action::Unrecognized => Ok(StartOutcome::Unrecognized(status.state)),
        Action::Reauthenticate => Err(ReadinessError::Unauthorized),
        Action::Fail { code, message } => Err(ReadinessError::Remote { code, message }),
    }
}

type Observer<'a> = Box<dyn Fn(&EnvironmentStatus) + Send + Sync + 'a>;

/// Polls an environment until it can be connected to
pub struct ReadinessPoller<'a, A: EnvironmentApi + ?Sized> {
    api: &'a A,
    policy: PollPolicy,
    observer: Option<Observer<'a>>,
}

impl<'a, A: EnvironmentApi + ?Sized> ReadinessPoller<'a, A> {
    pub fn new(api: &'a A, policy: PollPolicy) -> Self {
        Self {
            api,
            policy,
            observer: None,
        }
    }

    /// Call `observer` with every status fetched
    pub fn with_observer(
        mut self,
        observer: impl Fn(&EnvironmentStatus) + Send + Sync + 'a,
    ) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Poll until RUNNING and resolve the connection parameters
    pub async fn wait_until_ready(&self) -> Result<SshConfig, ReadinessError> {
        let status = self.wait_until_running().await?;
        Ok(ssh::resolve(&status)?)
    }

    /// Poll until the environment reports RUNNING
    pub async fn wait_until_running(&self) -> Result<EnvironmentStatus, ReadinessError> {
        let started = Instant::now();
        let mut delay = self.policy.interval;

        loop {
            let status = self.api.get_status().await?;
            if let Some(observer) = &self.observer {
                observer(&status);
            }

            let action = transition(&status);
            debug!("Observed state {} -> {:?}", status.state, action);

            match &action {
                Action::Connect => {
                    info!("Got host information, environment is running");
                    return Ok(status);
                }
                Action::Reauthenticate => {
                    warn!("Unauthorized or token has expired, please reauthorize");
                    return Err(ReadinessError::Unauthorized);
                }
                Action::Fail { code, message } => {
                    return Err(ReadinessError::Remote {
                        code: *code,
                        message: message.clone(),
                    });
                }
                Action::Start => {
                    info!("Environment suspended, requesting start");
                    if !self.api.start().await? {
                        warn!("Start request was not accepted, retrying on the next poll");
                    }
                    delay = self.policy.interval;
                }
                Action::Wait => {
                    info!("Waiting for environment ({})", status.state);
                    delay = self.policy.interval;
                }
                Action::Unrecognized => {
                    warn!("Unrecognized environment state: {}", status.state);
                }
            }

            if let Some(limit) = self.policy.timeout {
                if started.elapsed() >= limit {
                    return Err(ReadinessError::Timeout(limit));
                }
            }

            tokio::time::sleep(delay).await;

            if action == Action::Unrecognized {
                delay = (delay * 2).min(self.policy.max_interval);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ErrorDescriptor;

    fn with_state(state: &str) -> EnvironmentStatus {
        EnvironmentStatus {
            state: LifecycleState::from(state),
            ..Default::default()
        }
    }

    fn with_error(code: u16) -> EnvironmentStatus {
        EnvironmentStatus {
            error: Some(ErrorDescriptor {
                code,
                state: "FAILED".into(),
                message: String::new(),
            }),
            state: LifecycleState::Running,
            ..Default::default()
        }
    }

    #[test]
    fn test_transition_table() {
        assert_eq!(transition(&with_state("RUNNING")), Action::Connect);
        assert_eq!(transition(&with_state("SUSPENDED")), Action::Start);
        assert_eq!(transition(&with_state("STARTING")), Action::Wait);
        assert_eq!(transition(&with_state("PENDING")), Action::Wait);
        assert_eq!(transition(&with_state("")), Action::Unrecognized);
        assert_eq!(transition(&with_state("DELETING")), Action::Unrecognized);
    }

    #[test]
    fn test_unauthorized_overrides_state() {
        assert_eq!(transition(&with_error(401)), Action::Reauthenticate);
    }

    #[test]
    fn test_other_error_fails() {
        assert_eq!(
            transition(&with_error(403)),
            Action::Fail {
                code: 403,
                message: "FAILED".into()
            }
        );
    }

    #[test]
    fn test_unauthorized_api_error_maps_to_unauthorized() {
        let error = ReadinessError::from(ApiError::Unauthorized);
        assert!(error.is_unauthorized());
    }
}
