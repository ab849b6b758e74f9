//! Logging initialization
//!
//! Priority order for the filter:
//! 1. CLI flags (`-v/-q`), scoped to the binary and this library
//! 2. RUST_LOG environment variable
//! 3. The default filter passed in

use anyhow::Result;
use clap_verbosity_flag::{LogLevel, Verbosity};
use std::fmt::Display;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directives enabling `level` for the binary and the `gcs_cli` library
///
/// Dependencies (hyper, reqwest, axum) are left at the default level.
pub fn crate_directives(binary_name: &str, level: impl Display) -> String {
    let binary_name = binary_name.replace('-', "_");
    if binary_name == env!("CARGO_CRATE_NAME") {
        return format!("{binary_name}={level}");
    }
    format!("{binary_name}={level},{}={level}", env!("CARGO_CRATE_NAME"))
}

/// Initialize logging for `binary_name` with the given verbosity and default filter
pub fn init_logging<L: LogLevel>(
    verbosity: &Verbosity<L>,
    binary_name: &str,
    default_filter: &str,
) -> Result<()> {
    let filter = if let Some(log_level) = verbosity.log_level() {
        EnvFilter::try_new(crate_directives(binary_name, log_level))?
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact(),
        )
        .try_init()?;

    Ok(())
}

/// Initialize logging only when requested via flags or RUST_LOG
///
/// Returns `true` if a subscriber was installed.
pub fn init_cli_logging<L: LogLevel>(
    verbosity: &Verbosity<L>,
    binary_name: &str,
    default_filter: &str,
) -> Result<bool> {
    if verbosity.log_level().is_some() || std::env::var("RUST_LOG").is_ok() {
        init_logging(verbosity, binary_name, default_filter)?;
        Ok(true)
    } else {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn test_directives_cover_binary_and_library() {
        assert_eq!(
            crate_directives("gcs", Level::DEBUG),
            "gcs=DEBUG,gcs_cli=DEBUG"
        );
        assert!(EnvFilter::try_new(crate_directives("gcs", Level::DEBUG)).is_ok());
    }

    #[test]
    fn test_directives_normalize_binary_name() {
        assert_eq!(crate_directives("gcs-cli", "info"), "gcs_cli=info");
    }
}
