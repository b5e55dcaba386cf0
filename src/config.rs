//! Build configuration.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

pub const DEFAULT_CDN_BASE_URL: &str = "https://esm.sh";
pub const DEFAULT_RUNTIME_VERSION: &str = "19";
pub const DEFAULT_TAILWIND_URL: &str = "https://cdn.tailwindcss.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for one preview build. Every field has a default, so an empty
/// JSON object is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuildConfig {
    /// Base URL of the ES module CDN used for the runtime and third-party packages.
    pub cdn_base_url: String,

    /// Pinned major version of the framework runtime.
    pub runtime_version: String,

    /// Ask the CDN to leave runtime imports bare inside third-party packages so
    /// they share the import-mapped runtime instance.
    pub shared_runtime: bool,

    /// Load the Tailwind CDN script in the preview document.
    pub tailwind: bool,

    pub tailwind_url: String,

    /// Document title
    pub title: String,

    /// Id of the element the entry component is mounted into.
    pub root_element_id: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            cdn_base_url: DEFAULT_CDN_BASE_URL.to_string(),
            runtime_version: DEFAULT_RUNTIME_VERSION.to_string(),
            shared_runtime: true,
            tailwind: true,
            tailwind_url: DEFAULT_TAILWIND_URL.to_string(),
            title: "Preview".to_string(),
            root_element_id: "root".to_string(),
        }
    }
}

impl BuildConfig {
    /// Parses and validates a JSON configuration object.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: BuildConfig = serde_json::from_str(json)?;
        config.validated()
    }

    /// Checks field values and returns the config with its CDN base trimmed.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        let base = self.cdn_base_url.trim().trim_end_matches('/').to_string();
        if !(base.starts_with("https://") || base.starts_with("http://")) {
            return Err(ConfigError::Invalid(format!(
                "cdnBaseUrl must be an http(s) URL, got '{}'",
                self.cdn_base_url
            )));
        }
        self.cdn_base_url = base;

        if self.runtime_version.trim().is_empty()
            || self.runtime_version.contains(['/', '?', '#'])
        {
            return Err(ConfigError::Invalid(format!(
                "runtimeVersion '{}' is not a version",
                self.runtime_version
            )));
        }
        if self.root_element_id.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "rootElementId must not be empty".to_string(),
            ));
        }
        if self.tailwind && self.tailwind_url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "tailwindUrl must be set when tailwind is enabled".to_string(),
            ));
        }
        Ok(self)
    }

    /// Stable hash of every setting, used in cache keys.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(serde_json::to_string(self).unwrap_or_default().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
