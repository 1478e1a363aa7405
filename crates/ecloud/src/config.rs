//! Client configuration.
//!
//! A configuration is built once and handed to every client by reference;
//! nothing in this crate keeps process-wide client state.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;

/// Default route of the local compute daemon.
pub const DEFAULT_COMPUTE_URL: &str = "http://localhost:17777/api/v1.0/client/vm/";

/// Default timeout for daemon requests.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Environment variable overriding [`EcloudConfig::compute_url`].
pub const COMPUTE_URL_ENV: &str = "ECLOUD_COMPUTE_URL";

/// Control-plane client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcloudConfig {
    /// Base URL of the compute daemon (trailing slash optional).
    #[serde(default = "default_compute_url")]
    pub compute_url: String,
    /// Name of the application using the SDK.
    pub application_name: String,
    /// Version of the application using the SDK.
    pub application_version: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_compute_url() -> String {
    DEFAULT_COMPUTE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl EcloudConfig {
    /// Create a configuration with the default daemon routes.
    ///
    /// # Errors
    /// Returns [`ApiError::Config`] if the application name or version is empty.
    pub fn new(
        application_name: impl Into<String>,
        application_version: impl Into<String>,
    ) -> Result<Self, ApiError> {
        let config = Self {
            compute_url: default_compute_url(),
            application_name: application_name.into(),
            application_version: application_version.into(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file, then apply environment overrides.
    ///
    /// # Errors
    /// Returns [`ApiError::Config`] if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ApiError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ApiError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let mut config: Self = toml::from_str(&content).map_err(|e| {
            ApiError::Config(format!("failed to parse {}: {e}", path.display()))
        })?;

        config.apply_compute_url_override(std::env::var(COMPUTE_URL_ENV).ok());
        config.validate()?;

        debug!(path = %path.display(), compute_url = %config.compute_url, "Loaded ecloud config");
        Ok(config)
    }

    /// Point the client at a different compute daemon.
    #[must_use]
    pub fn with_compute_url(mut self, url: impl Into<String>) -> Self {
        self.compute_url = url.into();
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_secs = timeout.as_secs();
        self
    }

    /// Per-request timeout as a [`Duration`].
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// User agent sent with every request (`name/version`).
    #[must_use]
    pub fn user_agent(&self) -> String {
        format!("{}/{}", self.application_name, self.application_version)
    }

    fn apply_compute_url_override(&mut self, value: Option<String>) {
        if let Some(url) = value.filter(|v| !v.trim().is_empty()) {
            self.compute_url = url;
        }
    }

    fn validate(&self) -> Result<(), ApiError> {
        if self.application_name.trim().is_empty() {
            return Err(ApiError::Config("application name cannot be empty".into()));
        }
        if self.application_version.trim().is_empty() {
            return Err(ApiError::Config("application version cannot be empty".into()));
        }
        if self.compute_url.trim().is_empty() {
            return Err(ApiError::Config("compute URL cannot be empty".into()));
        }
        Ok(())
    }
}
