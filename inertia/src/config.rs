use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

pub const DEFAULT_CONTAINER_ID: &str = "app";
pub const DEFAULT_SSR_URL: &str = "http://127.0.0.1:13714";

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Container id cannot be empty")]
    EmptyContainerId,

    #[error("Only one of version and version_file can be set")]
    ConflictingVersion,

    #[error("SSR url must use http or https, got {0:?}")]
    InvalidSsrScheme(String),

    #[error("SSR timeout cannot be 0")]
    InvalidSsrTimeout,
}

/// Engine configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Asset version string; hashed before it is sent to clients
    #[serde(default)]
    pub version: Option<String>,
    /// Asset manifest whose content hash becomes the version
    #[serde(default)]
    pub version_file: Option<PathBuf>,
    /// Id of the element the client mounts into
    #[serde(default = "default_container_id")]
    pub container_id: String,
    /// Default for history encryption; requests may override it
    #[serde(default)]
    pub encrypt_history: bool,
    /// Server-side rendering; disabled when absent
    #[serde(default)]
    pub ssr: Option<SsrConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            version: None,
            version_file: None,
            container_id: default_container_id(),
            encrypt_history: false,
            ssr: None,
        }
    }
}

impl Config {
    /// Validates the engine configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.container_id.is_empty() {
            return Err(ValidationError::EmptyContainerId);
        }

        if self.version.is_some() && self.version_file.is_some() {
            return Err(ValidationError::ConflictingVersion);
        }

        if let Some(ssr) = &self.ssr {
            ssr.validate()?;
        }

        Ok(())
    }
}

/// Server-side rendering endpoint configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SsrConfig {
    /// Base URL of the renderer; `/render` is appended
    #[serde(default = "default_ssr_url")]
    pub url: Url,
    /// Request timeout. The renderer call is unbounded when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for SsrConfig {
    fn default() -> Self {
        SsrConfig {
            url: default_ssr_url(),
            timeout_secs: None,
        }
    }
}

impl SsrConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !matches!(self.url.scheme(), "http" | "https") {
            return Err(ValidationError::InvalidSsrScheme(
                self.url.scheme().to_string(),
            ));
        }

        if self.timeout_secs == Some(0) {
            return Err(ValidationError::InvalidSsrTimeout);
        }

        Ok(())
    }
}

fn default_container_id() -> String {
    DEFAULT_CONTAINER_ID.to_string()
}

fn default_ssr_url() -> Url {
    Url::parse(DEFAULT_SSR_URL).expect("default SSR url is valid")
}
