//! Output formatting utilities

use crate::api::EnvironmentStatus;
use crate::error::Result;
use console::style;
use serde::Serialize;

/// Output data as JSON
pub fn json_output<T: Serialize>(data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    println!("{json}");
    Ok(())
}

/// Print a success message with green checkmark
pub fn print_success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}

/// Print an error message with red X
pub fn print_error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), style(message).red());
}

/// Print an informational message with blue info icon
pub fn print_info(message: &str) {
    println!("{} {}", style("ℹ").blue(), message);
}

/// Print a warning to stderr
pub fn print_warning(message: &str) {
    eprintln!("{} {}", style("⚠").yellow().bold(), style(message).yellow());
}

/// Compress a path to use tilde notation for home directory
pub fn compress_path(path: &std::path::Path) -> String {
    if let Ok(home_dir) = etcetera::home_dir() {
        if let Ok(relative) = path.strip_prefix(&home_dir) {
            return format!("~/{}", relative.display());
        }
    }
    path.display().to_string()
}

/// Human readable environment status
pub fn print_status(status: &EnvironmentStatus) {
    println!("{}: {}", style("State").bold(), status.state);
    if !status.ssh_host.is_empty() {
        println!(
            "{}: {}@{}:{}",
            style("SSH").bold(),
            status.ssh_username,
            status.ssh_host,
            status.ssh_port
        );
    }
    if !status.public_keys.is_empty() {
        println!("{}:", style("Public keys").bold());
        for key in &status.public_keys {
            println!("  {}", style(key).dim());
        }
    }
    if let Some(error) = status.error() {
        print_error(&format!("{} {}: {}", error.code, error.state, error.message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_compress_path_outside_home() {
        assert_eq!(compress_path(Path::new("/tmp/gcs/token.json")), "/tmp/gcs/token.json");
    }

    #[test]
    fn test_compress_path_inside_home() {
        let home = etcetera::home_dir().unwrap();
        let path = home.join(".ssh").join("gcs_token.json");
        assert_eq!(compress_path(&path), "~/.ssh/gcs_token.json");
    }
}
