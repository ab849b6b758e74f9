//! # gcs
//!
//! Connect to Google Cloud Shell over SSH from your own terminal.
//!
//! The crate is organized around three layers:
//! - `auth`: OAuth 2.0 credential lifecycle (loopback authorization, token cache, refresh)
//! - `api` and `readiness`: the environment API and the polling state machine that
//!   brings the environment to RUNNING
//! - `ssh`: turning a running environment into an `ssh` invocation

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod readiness;
pub mod ssh;

pub use cli::*;
pub use error::*;
