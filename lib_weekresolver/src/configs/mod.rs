//! # Configuration Modules
//!
//! Connector settings read from the process environment, with `.env` support.

/// Environment-driven connector configuration.
pub mod config_env;
