use crate::cli::{commands::Commands, handlers};
use crate::config::CliConfig;
use crate::error::Result;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use clap_verbosity_flag::{OffLevel, Verbosity};
use std::path::{Path, PathBuf};

/// gcs - Google Cloud Shell from your own terminal
#[derive(Parser, Debug)]
#[command(
    name = "gcs",
    version,
    about = "Connect to Google Cloud Shell over SSH from your own terminal",
    long_about = "Connect to Google Cloud Shell over SSH from your own terminal.

QUICK START:
  gcs login                         # Authorize with Google
  gcs ssh                           # Start the environment if needed and connect
  gcs ssh -- -L 8080:localhost:8080 # Pass extra arguments to ssh

ENVIRONMENT:
  gcs status                        # Show state and SSH details
  gcs start --wait                  # Start and wait until running
  gcs add-public-key ~/.ssh/id_ed25519.pub

CREDENTIALS:
  OAuth client secrets are read from ~/.ssh/gcs_credentials.json and the
  token is cached in ~/.ssh/gcs_token.json (see `auth` in the config file)."
)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Never open a browser; paste the authorization code instead
    #[arg(long, global = true)]
    pub no_browser: bool,

    #[command(flatten)]
    pub verbosity: Verbosity<OffLevel>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Args {
    /// Execute the CLI command
    pub async fn run(self) -> Result<()> {
        let Some(command) = self.command else {
            Self::command().print_help()?;
            println!();
            return Ok(());
        };

        let mut config = match &self.config {
            Some(path) => CliConfig::load_from_path(&expand_tilde(path))?,
            None => CliConfig::load_default()?,
        };
        if self.no_browser {
            config.auth.open_browser = false;
        }

        match command {
            Commands::Ssh { args } => handlers::ssh::handle_ssh(args, &config).await,
            Commands::Status => handlers::environment::handle_status(&config, self.json).await,
            Commands::Start { wait } => {
                handlers::environment::handle_start(wait, &config, self.json).await
            }
            Commands::AddPublicKey { key } => {
                handlers::environment::handle_add_public_key(&key, &config).await
            }
            Commands::Login => handlers::auth::handle_login(&config).await,
            Commands::Logout => handlers::auth::handle_logout(&config).await,
        }
    }
}

/// Parse errors that print usage and exit successfully instead of failing
pub fn is_usage_error(error: &clap::Error) -> bool {
    matches!(
        error.kind(),
        ErrorKind::InvalidSubcommand | ErrorKind::MissingRequiredArgument
    )
}

fn expand_tilde(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(path_str) => PathBuf::from(shellexpand::tilde(path_str).as_ref()),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_are_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_ssh_collects_trailing_args() {
        let args = Args::try_parse_from(["gcs", "ssh", "--", "-L", "8080:localhost:8080"]).unwrap();
        match args.command {
            Some(Commands::Ssh { args }) => assert_eq!(args, vec!["-L", "8080:localhost:8080"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_aliases() {
        let args = Args::try_parse_from(["gcs", "state"]).unwrap();
        assert!(matches!(args.command, Some(Commands::Status)));

        let args = Args::try_parse_from(["gcs", "addPublicKey", "ssh-ed25519 AAAA"]).unwrap();
        assert!(matches!(args.command, Some(Commands::AddPublicKey { .. })));
    }

    #[test]
    fn test_usage_errors() {
        let unknown = Args::try_parse_from(["gcs", "bogus"]).unwrap_err();
        assert!(is_usage_error(&unknown));

        let missing_key = Args::try_parse_from(["gcs", "addPublicKey"]).unwrap_err();
        assert!(is_usage_error(&missing_key));

        let help = Args::try_parse_from(["gcs", "--help"]).unwrap_err();
        assert!(!is_usage_error(&help));

        let bad_flag = Args::try_parse_from(["gcs", "status", "--bogus"]).unwrap_err();
        assert!(!is_usage_error(&bad_flag));
    }

    #[test]
    fn test_no_subcommand_parses() {
        let args = Args::try_parse_from(["gcs"]).unwrap();
        assert!(args.command.is_none());
    }

    #[test]
    fn test_no_browser_is_global() {
        let args = Args::try_parse_from(["gcs", "login", "--no-browser"]).unwrap();
        assert!(args.no_browser);
    }

    #[test]
    fn test_start_wait_flag() {
        let args = Args::try_parse_from(["gcs", "start", "--wait", "--json"]).unwrap();
        assert!(args.json);
        assert!(matches!(args.command, Some(Commands::Start { wait: true })));
    }
}
