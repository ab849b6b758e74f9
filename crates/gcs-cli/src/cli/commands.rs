use clap::Subcommand;

/// Main CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open an SSH session, starting the environment if needed
    Ssh {
        /// Extra arguments passed to ssh after the destination
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Show the environment state and connection details
    #[command(alias = "state")]
    Status,

    /// Request the environment to start
    Start {
        /// Keep polling until the environment is running
        #[arg(long)]
        wait: bool,
    },

    /// Authorize an SSH public key on the environment
    #[command(alias = "addPublicKey")]
    AddPublicKey {
        /// Public key text, or a path to a .pub file
        key: String,
    },

    /// Authorize with Google and store the token
    Login,

    /// Remove the stored token
    Logout,
}
