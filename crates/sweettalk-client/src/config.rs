//! Client configuration.
//!
//! Resolution order: built-in defaults, then an optional TOML file
//! (`~/.config/sweettalk/client.toml` unless overridden), then `SWEETTALK_*`
//! environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

/// Environment variable prefix for overrides, e.g. `SWEETTALK_BASE_URL`.
const ENV_PREFIX: &str = "SWEETTALK";

/// Configuration for [`crate::ApiClient`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend base URL, without a trailing slash.
    pub base_url: String,

    /// Timeout applied to phrase requests. The chat stream deliberately has
    /// no client-side timeout; a hung connection blocks that conversation's
    /// single-flight gate until the server closes it.
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl ClientConfig {
    /// Load configuration from the default file location and environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(default_config_file().as_deref())
    }

    /// Load configuration, reading `file` if given and it exists.
    pub fn load_from(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        let mut builder = Config::builder()
            .set_default("base_url", defaults.base_url)?
            .set_default("request_timeout_secs", defaults.request_timeout_secs as i64)?;

        if let Some(path) = file {
            builder = builder.add_source(
                File::from(path)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        builder
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()
    }

    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Base URL with any trailing slash removed.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sweettalk").join("client.toml"))
}
