//! Client configuration
//!
//! Settings are layered: built-in defaults, then an optional configuration
//! file (TOML, YAML or JSON, picked by extension), then `HAVEN_` prefixed
//! environment variables using `__` as the section separator, for example
//! `HAVEN_API__BASE_URL=https://api.example.com`.

use crate::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "HAVEN";

/// Environment variable that relocates the state directory
pub const STATE_DIR_ENV: &str = "HAVEN_STATE_DIR";

/// Top-level client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HavenConfig {
    /// Backend API settings
    pub api: ApiConfig,

    /// Session and local state settings
    pub session: SessionConfig,
}

/// Backend API settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every relative request path is appended to
    pub base_url: String,

    /// Request timeout in seconds (0 disables the timeout)
    pub timeout_secs: u64,

    /// User agent sent with every request
    pub user_agent: String,
}

/// Session and local state settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Path the user is sent to when the session cannot be recovered
    pub login_path: String,

    /// Directory holding the credential file and logs
    pub state_dir: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_secs: 30,
            user_agent: format!("haven-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            state_dir: default_state_dir(),
        }
    }
}

impl Default for HavenConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

/// Resolve the state directory: `HAVEN_STATE_DIR`, else the platform data dir
pub fn default_state_dir() -> PathBuf {
    std::env::var(STATE_DIR_ENV).map_or_else(
        |_| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("haven")
        },
        PathBuf::from,
    )
}

impl ApiConfig {
    /// Request timeout, `None` when disabled
    pub const fn timeout(&self) -> Option<Duration> {
        if self.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout_secs))
        }
    }
}

impl HavenConfig {
    /// Load configuration from defaults, an optional file and the environment
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting configuration is invalid
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`HavenConfig::load`], reading overrides from `env` instead of the
    /// process environment when given
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting configuration is invalid
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> CoreResult<Self> {
        let defaults = Self::default();

        let mut builder = config::Config::builder()
            .set_default("api.base_url", defaults.api.base_url)?
            .set_default("api.timeout_secs", defaults.api.timeout_secs)?
            .set_default("api.user_agent", defaults.api.user_agent)?
            .set_default("session.login_path", defaults.session.login_path)?
            .set_default(
                "session.state_dir",
                defaults.session.state_dir.to_string_lossy().to_string(),
            )?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check values the backend contract depends on
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid field
    pub fn validate(&self) -> CoreResult<()> {
        let url = url::Url::parse(&self.api.base_url).map_err(|e| {
            CoreError::invalid_config(format!("api.base_url '{}': {e}", self.api.base_url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CoreError::invalid_config(format!(
                "api.base_url must be http or https, got '{}'",
                url.scheme()
            )));
        }
        if !self.session.login_path.starts_with('/') {
            return Err(CoreError::invalid_config(
                "session.login_path must start with '/'",
            ));
        }
        Ok(())
    }

    /// Save configuration to a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save<P: AsRef<Path>>(&self, path: P) -> CoreResult<()> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
