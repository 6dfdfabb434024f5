//! Shared plumbing for the Rentwise crates.
//!
//! Holds the pieces every binary needs regardless of domain: tracing
//! initialisation and the layered configuration loader.

pub mod config;
pub mod logging;

pub use config::{ConfigLoader, ConfigurationError};
