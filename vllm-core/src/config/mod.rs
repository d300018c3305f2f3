//! Configuration module
//!
//! Loads [`ProviderConfig`] from YAML or JSON files, with `${VAR}`
//! environment variable interpolation before parsing.

mod env;
mod error;
mod schema;

pub use env::interpolate_env_vars;
pub use error::ConfigError;
pub use schema::ProviderConfig;

use std::fs;
use std::path::Path;

/// Load a configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> Result<ProviderConfig, ConfigError> {
    let path = path.as_ref();
    let content = read(path)?;

    let config: ProviderConfig =
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_string_lossy().to_string(),
            line: e.location().map(|l| l.line()),
            column: e.location().map(|l| l.column()),
            message: e.to_string(),
        })?;

    config.validate()?;
    Ok(config)
}

/// Load a configuration from a JSON file
pub fn load_from_json<P: AsRef<Path>>(path: P) -> Result<ProviderConfig, ConfigError> {
    let path = path.as_ref();
    let content = read(path)?;

    let config: ProviderConfig =
        serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_string_lossy().to_string(),
            line: Some(e.line()),
            column: Some(e.column()),
            message: e.to_string(),
        })?;

    config.validate()?;
    Ok(config)
}

/// Read a config file and interpolate environment variables
fn read(path: &Path) -> Result<String, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;

    env::interpolate_env_vars(&content)
}
