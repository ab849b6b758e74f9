//! Client for the Cloud Shell environments API

pub mod client;
pub mod error;
pub mod types;

pub use client::*;
pub use error::*;
pub use types::*;
