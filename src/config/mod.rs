//! Configuration module for Junction.
//!
//! Handles the TOML settings file and environment variable expansion.

mod settings;

pub use settings::{expand_env_vars, ResolverSettings, Settings, SettingsError, SqlSettings};
