//! TOML-based configuration for Junction.
//!
//! Supports a config file (junction.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [sql]
//! canonical_dialect = "spark"
//! transpilation_plugin = "${JUNCTION_TRANSPILER}"
//!
//! [resolver]
//! max_visited_nodes = 100000
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::sql::Dialect;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// SQL generation settings.
    pub sql: SqlSettings,

    /// Dimension resolver settings.
    pub resolver: ResolverSettings,
}

/// SQL generation settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SqlSettings {
    /// Dialect generated SQL is assembled in.
    pub canonical_dialect: Dialect,

    /// Name of the transpilation plugin (supports ${ENV_VAR} expansion).
    ///
    /// When unset, generated SQL is always returned in the canonical dialect.
    pub transpilation_plugin: Option<String>,
}

/// Dimension resolver settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolverSettings {
    /// Upper bound on nodes dequeued by a single resolution.
    pub max_visited_nodes: usize,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            max_visited_nodes: 100_000,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `JUNCTION_CONFIG`
    /// 2. `./junction.toml`
    /// 3. `~/.config/junction/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        // Check environment variable first
        if let Ok(path) = env::var("JUNCTION_CONFIG") {
            return Self::from_file(&path);
        }

        // Check local directory
        let local_config = PathBuf::from("junction.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        // Check user config directory
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("junction").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        // Return defaults if no config file found
        Ok(Settings::default())
    }

    /// Builder-style override of the transpilation plugin.
    pub fn with_transpilation_plugin(mut self, name: &str) -> Self {
        self.sql.transpilation_plugin = Some(name.to_string());
        self
    }

    /// Get the transpilation plugin name with environment variables expanded.
    ///
    /// An empty name after expansion means no plugin.
    pub fn resolved_transpilation_plugin(&self) -> Result<Option<String>, SettingsError> {
        match &self.sql.transpilation_plugin {
            Some(name) => {
                let expanded = expand_env_vars(name)?;
                let trimmed = expanded.trim();
                Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
            }
            None => Ok(None),
        }
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.resolver.max_visited_nodes == 0 {
            return Err(SettingsError::InvalidConfig(
                "resolver.max_visited_nodes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let var_name: String = if chars.next_if_eq(&'{').is_some() {
            // ${VAR}: consumes up to and including the closing brace
            chars.by_ref().take_while(|&ch| ch != '}').collect()
        } else {
            // $VAR (ends at non-alphanumeric/underscore)
            let mut name = String::new();
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                name.push(ch);
            }
            if name.is_empty() {
                // Just a lone $, keep it
                result.push('$');
                continue;
            }
            name
        };

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
