//! Layered configuration for the relay.
//!
//! Precedence, later layers winning:
//! 1. Built-in defaults
//! 2. `config.toml` under the relay home (`$YTQF_HOME`, default `~/.ytqf`)
//! 3. `YTQF_*` environment overrides

use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::cascade::DEFAULT_EDIT_ENDPOINT;
use crate::executor::DEFAULT_ORIGIN;

const CONFIG_FILE: &str = "config.toml";
const SESSION_FILE: &str = "session.json";
const FAVORITES_FILE: &str = "favorites.json";
const DEFAULT_HOME_DIR: &str = ".ytqf";
const DEFAULT_ENV_PREFIX: &str = "YTQF";

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_HTTP_TIMEOUT_MS: u64 = 15_000;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("I/O error loading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Config validation error: {0}")]
    Validation(String),

    #[error("Invalid value for ${var}: '{value}' (expected: {expected})")]
    InvalidEnvValue {
        var: String,
        value: String,
        expected: String,
    },
}

/// Fully resolved relay configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Origin used for request signing and the `x-origin` header.
    pub origin: String,
    /// Where edit calls are sent. Falls back to `origin`.
    pub api_base_url: Option<String>,
    /// Edit endpoint paths, tried in order.
    pub endpoints: Vec<String>,
    pub request_timeout_ms: u64,
    pub http_timeout_ms: u64,
    pub session_file: PathBuf,
    pub favorites_file: PathBuf,
}

impl RelayConfig {
    /// Defaults with state files under `home`.
    pub fn with_home(home: &Path) -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            api_base_url: None,
            endpoints: vec![DEFAULT_EDIT_ENDPOINT.to_string()],
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            http_timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
            session_file: home.join(SESSION_FILE),
            favorites_file: home.join(FAVORITES_FILE),
        }
    }

    pub fn api_base_url(&self) -> &str {
        self.api_base_url.as_deref().unwrap_or(&self.origin)
    }

    /// Deadline for a correlated bus request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Deadline for one HTTP edit call.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        Url::parse(&self.origin)
            .map_err(|e| ConfigLoadError::Validation(format!("origin '{}': {e}", self.origin)))?;
        if let Some(base) = &self.api_base_url {
            Url::parse(base)
                .map_err(|e| ConfigLoadError::Validation(format!("api_base_url '{base}': {e}")))?;
        }
        if self.endpoints.is_empty() {
            return Err(ConfigLoadError::Validation(
                "endpoints must list at least one path".to_string(),
            ));
        }
        if let Some(endpoint) = self.endpoints.iter().find(|e| !e.starts_with('/')) {
            return Err(ConfigLoadError::Validation(format!(
                "endpoint '{endpoint}' must start with '/'"
            )));
        }
        if self.request_timeout_ms == 0 || self.http_timeout_ms == 0 {
            return Err(ConfigLoadError::Validation(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// `config.toml` contents. Every field is optional; absent fields keep the
/// value from the layer below.
#[derive(Debug, Clone, Default, Deserialize)]
struct FileConfig {
    origin: Option<String>,
    api_base_url: Option<String>,
    endpoints: Option<Vec<String>>,
    request_timeout_ms: Option<u64>,
    http_timeout_ms: Option<u64>,
    session_file: Option<PathBuf>,
    favorites_file: Option<PathBuf>,
}

/// Builder for layered configuration loading.
pub struct ConfigLoader {
    home: Option<PathBuf>,
    config_file: Option<PathBuf>,
    env_prefix: String,
    env: Option<HashMap<String, String>>,
    skip_file: bool,
    skip_env: bool,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            home: None,
            config_file: None,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            env: None,
            skip_file: false,
            skip_env: false,
        }
    }

    /// Set the relay home explicitly instead of reading `$YTQF_HOME`.
    pub fn with_home(mut self, path: PathBuf) -> Self {
        self.home = Some(path);
        self
    }

    /// Read this file instead of `<home>/config.toml`. Unlike the default
    /// file, it must exist.
    pub fn with_config_file(mut self, path: PathBuf) -> Self {
        self.config_file = Some(path);
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Read variables from `vars` instead of the process environment.
    pub fn with_env(mut self, vars: HashMap<String, String>) -> Self {
        self.env = Some(vars);
        self
    }

    pub fn skip_file_layer(mut self) -> Self {
        self.skip_file = true;
        self
    }

    pub fn skip_env_layer(mut self) -> Self {
        self.skip_env = true;
        self
    }

    pub fn load(self) -> Result<RelayConfig, ConfigLoadError> {
        let home = self.resolve_home()?;
        let mut config = RelayConfig::with_home(&home);

        if !self.skip_file {
            let file_config = match &self.config_file {
                Some(path) => Self::read_file(path)?,
                None => Self::load_from_file(&home)?,
            };
            Self::merge_file(&mut config, file_config, &home);
        }

        if !self.skip_env {
            self.apply_env_overrides(&mut config)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Priority: explicit home, then `$<PREFIX>_HOME`, then `~/.ytqf`.
    fn resolve_home(&self) -> Result<PathBuf, ConfigLoadError> {
        if let Some(path) = &self.home {
            return Ok(path.clone());
        }
        if let Some(path) = self.var("HOME").filter(|p| !p.trim().is_empty()) {
            return Ok(PathBuf::from(path));
        }
        dirs::home_dir()
            .map(|home| home.join(DEFAULT_HOME_DIR))
            .ok_or_else(|| ConfigLoadError::Validation("Cannot determine home directory".to_string()))
    }

    /// Reads `<home>/config.toml`; a missing file yields an empty layer.
    fn load_from_file(home: &Path) -> Result<FileConfig, ConfigLoadError> {
        let path = home.join(CONFIG_FILE);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(toml::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("config.toml not found at {}, using defaults", path.display());
                Ok(FileConfig::default())
            }
            Err(e) => Err(ConfigLoadError::Io(e)),
        }
    }

    fn read_file(path: &Path) -> Result<FileConfig, ConfigLoadError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Relative state file paths in the file layer resolve against `home`.
    fn merge_file(base: &mut RelayConfig, overlay: FileConfig, home: &Path) {
        if let Some(origin) = overlay.origin {
            base.origin = origin;
        }
        if overlay.api_base_url.is_some() {
            base.api_base_url = overlay.api_base_url;
        }
        if let Some(endpoints) = overlay.endpoints {
            base.endpoints = endpoints;
        }
        if let Some(ms) = overlay.request_timeout_ms {
            base.request_timeout_ms = ms;
        }
        if let Some(ms) = overlay.http_timeout_ms {
            base.http_timeout_ms = ms;
        }
        if let Some(path) = overlay.session_file {
            base.session_file = home.join(path);
        }
        if let Some(path) = overlay.favorites_file {
            base.favorites_file = home.join(path);
        }
    }

    /// Supported variables (with the default prefix):
    /// - `YTQF_ORIGIN`
    /// - `YTQF_API_BASE_URL`
    /// - `YTQF_ENDPOINTS`, comma separated
    /// - `YTQF_REQUEST_TIMEOUT_MS`
    /// - `YTQF_HTTP_TIMEOUT_MS`
    fn apply_env_overrides(&self, config: &mut RelayConfig) -> Result<(), ConfigLoadError> {
        if let Some(origin) = self.non_empty_var("ORIGIN") {
            tracing::debug!("Applying env override: {}_ORIGIN={origin}", self.env_prefix);
            config.origin = origin;
        }
        if let Some(base) = self.non_empty_var("API_BASE_URL") {
            tracing::debug!("Applying env override: {}_API_BASE_URL={base}", self.env_prefix);
            config.api_base_url = Some(base);
        }
        if let Some(raw) = self.non_empty_var("ENDPOINTS") {
            let endpoints: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string)
                .collect();
            if endpoints.is_empty() {
                return Err(ConfigLoadError::InvalidEnvValue {
                    var: format!("{}_ENDPOINTS", self.env_prefix),
                    value: raw,
                    expected: "comma-separated endpoint paths".to_string(),
                });
            }
            config.endpoints = endpoints;
        }
        if let Some(ms) = self.millis_var("REQUEST_TIMEOUT_MS")? {
            config.request_timeout_ms = ms;
        }
        if let Some(ms) = self.millis_var("HTTP_TIMEOUT_MS")? {
            config.http_timeout_ms = ms;
        }
        Ok(())
    }

    fn millis_var(&self, suffix: &str) -> Result<Option<u64>, ConfigLoadError> {
        let Some(value) = self.non_empty_var(suffix) else {
            return Ok(None);
        };
        match value.trim().parse::<u64>() {
            Ok(ms) if ms > 0 => Ok(Some(ms)),
            _ => Err(ConfigLoadError::InvalidEnvValue {
                var: format!("{}_{suffix}", self.env_prefix),
                value,
                expected: "a positive number of milliseconds".to_string(),
            }),
        }
    }

    fn non_empty_var(&self, suffix: &str) -> Option<String> {
        self.var(suffix).filter(|value| !value.trim().is_empty())
    }

    fn var(&self, suffix: &str) -> Option<String> {
        let name = format!("{}_{suffix}", self.env_prefix);
        match &self.env {
            Some(vars) => vars.get(&name).cloned(),
            None => env::var(&name).ok(),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
