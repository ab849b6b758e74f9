//! Authentication command handlers

use super::build_token_manager;
use crate::auth::TokenStore;
use crate::config::CliConfig;
use crate::error::Result;
use crate::output::{compress_path, print_info, print_success};
use tracing::debug;

/// Handle login command
///
/// Always runs a fresh authorization, replacing any stored token.
pub async fn handle_login(config: &CliConfig) -> Result<()> {
    debug!("Starting login process");

    let manager = build_token_manager(config).await?;
    manager.login().await?;

    print_success(&format!(
        "Authorized. Token saved to {}",
        compress_path(manager.store().path())
    ));
    Ok(())
}

/// Handle logout command
pub async fn handle_logout(config: &CliConfig) -> Result<()> {
    let store = TokenStore::new(config.auth.token_path());

    if !store.path().exists() {
        print_info("Not logged in");
        return Ok(());
    }

    store.delete().await?;
    print_success(&format!(
        "Removed stored token {}",
        compress_path(store.path())
    ));
    Ok(())
}
