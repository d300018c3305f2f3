//! Provider configuration schema

use super::error::ConfigError;
use crate::client::DEFAULT_BASE_URL;
use serde::{Deserialize, Serialize};
use url::Url;

/// Connection settings for one vLLM or Ollama-compatible backend
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Base URL of the OpenAI-compatible API, e.g. `http://localhost:8000/v1`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Overrides the port in `base_url`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Timeout for a whole request, body included
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// Model selected as soon as the provider is created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            port: None,
            timeout_secs: None,
            connect_timeout_secs: None,
            user_agent: None,
            default_model: None,
        }
    }
}

impl ProviderConfig {
    /// Create a configuration for the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    /// Normalized base URL: port applied, trailing slashes removed
    pub fn endpoint(&self) -> Result<Url, ConfigError> {
        let mut url = Url::parse(self.base_url.trim()).map_err(|e| ConfigError::InvalidUrl {
            url: self.base_url.clone(),
            message: e.to_string(),
        })?;

        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(ConfigError::InvalidUrl {
                    url: self.base_url.clone(),
                    message: format!("unsupported scheme '{}', expected http or https", other),
                })
            }
        }

        if let Some(port) = self.port {
            url.set_port(Some(port)).map_err(|_| ConfigError::InvalidUrl {
                url: self.base_url.clone(),
                message: format!("cannot set port {}", port),
            })?;
        }

        let path = url.path().trim_end_matches('/').to_string();
        url.set_path(&path);

        Ok(url)
    }

    /// Check the configuration for values the client cannot use
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.endpoint()?;

        if self.port == Some(0) {
            return Err(ConfigError::invalid_field("port", "must be non-zero"));
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::invalid_field("timeout_secs", "must be non-zero"));
        }
        if self.connect_timeout_secs == Some(0) {
            return Err(ConfigError::invalid_field(
                "connect_timeout_secs",
                "must be non-zero",
            ));
        }
        if let Some(model) = &self.default_model {
            if model.trim().is_empty() {
                return Err(ConfigError::invalid_field("default_model", "must not be empty"));
            }
        }

        Ok(())
    }
}
