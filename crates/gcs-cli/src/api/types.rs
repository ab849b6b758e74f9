//! Wire types for the Cloud Shell environments API

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Coarse lifecycle state of the remote environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    Pending,
    Starting,
    Suspended,
    Running,
    /// Anything else the API reports, kept verbatim (empty when absent)
    Unknown(String),
}

impl LifecycleState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Starting => "STARTING",
            Self::Suspended => "SUSPENDED",
            Self::Running => "RUNNING",
            Self::Unknown(raw) => raw,
        }
    }
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self::Unknown(String::new())
    }
}

impl From<String> for LifecycleState {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "PENDING" => Self::Pending,
            "STARTING" => Self::Starting,
            "SUSPENDED" => Self::Suspended,
            "RUNNING" => Self::Running,
            _ => Self::Unknown(raw),
        }
    }
}

impl From<&str> for LifecycleState {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(raw) if raw.is_empty() => f.write_str("UNKNOWN"),
            other => f.write_str(other.as_str()),
        }
    }
}

impl Serialize for LifecycleState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LifecycleState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.unwrap_or_default().into())
    }
}

/// Error object embedded in API responses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    #[serde(default)]
    pub code: u16,
    /// Google names this `status`; older proxies used `state`
    #[serde(default, alias = "status")]
    pub state: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl ErrorDescriptor {
    pub const UNAUTHORIZED: u16 = 401;

    pub fn is_unauthorized(&self) -> bool {
        self.code == Self::UNAUTHORIZED
    }
}

/// Status of the user's environment as returned by the GET endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDescriptor>,
    #[serde(default)]
    pub state: LifecycleState,
    #[serde(default)]
    pub ssh_username: String,
    #[serde(default)]
    pub ssh_host: String,
    #[serde(default)]
    pub ssh_port: u16,
    #[serde(default)]
    pub public_keys: Vec<String>,
}

impl EnvironmentStatus {
    /// Status used when the API rejects the credential without a JSON body
    pub fn unauthorized() -> Self {
        Self {
            error: Some(ErrorDescriptor {
                code: ErrorDescriptor::UNAUTHORIZED,
                state: "UNAUTHENTICATED".to_string(),
                message: String::new(),
            }),
            ..Self::default()
        }
    }

    /// The embedded error, when it carries a non-zero code
    pub fn error(&self) -> Option<&ErrorDescriptor> {
        self.error.as_ref().filter(|e| e.code != 0)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.error().is_some_and(ErrorDescriptor::is_unauthorized)
    }
}

/// Body of the addPublicKey request
#[derive(Debug, Serialize)]
pub struct AddPublicKeyRequest<'a> {
    pub key: &'a str,
}
