//! Layered configuration loading.
//!
//! Every binary resolves its configuration the same way: compiled-in defaults,
//! then a TOML file, then prefixed environment variables. Nested keys in the
//! environment are separated with a double underscore, so
//! `RENTWISE_DATABASE__URL` overrides `database.url`.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Failed to parse configuration: {details}")]
    ParseError { details: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Loader implemented by each binary's top-level configuration struct.
///
/// Only the default file name and the environment prefix are required; the
/// merge order is shared.
pub trait ConfigLoader: Serialize + DeserializeOwned + Default + Clone {
    /// File consulted when no explicit path is given, if it exists.
    const DEFAULT_FILE: &'static str;

    /// Environment variable prefix, including the trailing underscore.
    const ENV_PREFIX: &'static str;

    fn load(path: Option<PathBuf>) -> Result<Self, ConfigurationError> {
        match path {
            Some(p) => Self::load_from_file(&p),
            None => {
                let mut figment = Figment::from(Serialized::defaults(Self::default()));
                let default_path = Path::new(Self::DEFAULT_FILE);
                if default_path.exists() {
                    figment = figment.merge(Toml::file(default_path));
                }
                extract(figment.merge(Env::prefixed(Self::ENV_PREFIX).split("__")))
            }
        }
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigurationError> {
        if !path.exists() {
            return Err(ConfigurationError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(Self::ENV_PREFIX).split("__"));

        extract(figment)
    }

    /// Render the defaults as a TOML document.
    fn generate_example() -> Result<String, ConfigurationError> {
        toml::to_string_pretty(&Self::default()).map_err(|e| ConfigurationError::ParseError {
            details: format!("Failed to serialize config: {e}"),
        })
    }
}

fn extract<T: DeserializeOwned>(figment: Figment) -> Result<T, ConfigurationError> {
    figment.extract().map_err(|e| ConfigurationError::ParseError {
        details: e.to_string(),
    })
}
