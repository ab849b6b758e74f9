//! Main entry point for the gcs CLI

use clap::{CommandFactory, Parser};
use clap_complete::env::CompleteEnv;
use color_eyre::eyre::{eyre, Result};
use gcs_cli::cli::{args::is_usage_error, Args};
use gcs_cli::logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Handle shell completions first (must be before argument parsing)
    CompleteEnv::with_factory(Args::command).complete();

    let args = match Args::try_parse() {
        Ok(args) => args,
        // Unknown subcommands and missing arguments print usage and are not an error
        Err(e) if is_usage_error(&e) => {
            e.print()?;
            return Ok(());
        }
        Err(e) => e.exit(),
    };

    color_eyre::config::HookBuilder::default()
        .display_location_section(false)
        .display_env_section(false)
        .install()?;

    // Initialize logging here in the binary context where CARGO_BIN_NAME is available
    let binary_name = env!("CARGO_BIN_NAME").replace('-', "_");
    let default_filter = logging::crate_directives(&binary_name, "error");
    logging::init_cli_logging(&args.verbosity, &binary_name, &default_filter)
        .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

    Ok(args.run().await?)
}
