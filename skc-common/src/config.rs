//! Configuration loading and resolution
//!
//! Every field resolves with the same priority order:
//! 1. Environment variable (highest priority)
//! 2. TOML config file
//! 3. Compiled default (fallback)
//!
//! The resolved [`ColorizerConfig`] is built once at startup and injected into
//! the colorization client; nothing else reads the environment.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit TOML config file
pub const ENV_CONFIG_PATH: &str = "SKC_CONFIG";
pub const ENV_BACKEND: &str = "SKC_BACKEND";
pub const ENV_BASE_URL: &str = "SKC_BASE_URL";
pub const ENV_API_TOKEN: &str = "SKC_API_TOKEN";
pub const ENV_MODEL: &str = "SKC_MODEL";
pub const ENV_PROMPT: &str = "SKC_PROMPT";
pub const ENV_TIMEOUT_SECS: &str = "SKC_TIMEOUT_SECS";
pub const ENV_BIND: &str = "SKC_BIND";
pub const ENV_MAX_UPLOAD_BYTES: &str = "SKC_MAX_UPLOAD_BYTES";

/// Image model requested from the chat-completion gateway
pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash-image-preview";

/// Instruction sent alongside every sketch
pub const DEFAULT_PROMPT: &str = "Colorize this black and white sketch. Add vibrant, \
    natural colors while keeping the original line work, composition and details intact. \
    Return only the colorized image.";

/// Bounded wait for one colorization round trip
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Broadcast buffer for workflow events
pub const DEFAULT_EVENT_CAPACITY: usize = 100;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Largest accepted sketch upload body (20 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Which colorization backend shape is deployed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// `POST <base>/colorize-sketch` with `{ imageBase64 }`
    #[default]
    DataApi,
    /// `POST <gateway>/v1/chat/completions` with an image-capable model
    ChatCompletion,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::DataApi => "data-api",
            BackendKind::ChatCompletion => "chat-completion",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "data-api" | "data" | "a" => Ok(BackendKind::DataApi),
            "chat-completion" | "chat-completions" | "chat" | "b" => {
                Ok(BackendKind::ChatCompletion)
            }
            other => Err(Error::Config(format!(
                "Unknown backend '{}' (expected 'data-api' or 'chat-completion')",
                other
            ))),
        }
    }
}

/// Logging section of the TOML file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. "info" or "skc_colorizer=debug"
    #[serde(default)]
    pub level: Option<String>,
}

/// On-disk configuration; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub backend: Option<BackendKind>,
    pub base_url: Option<String>,
    pub api_token: Option<String>,
    pub model: Option<String>,
    pub prompt: Option<String>,
    pub timeout_secs: Option<u64>,
    pub bind: Option<String>,
    pub event_capacity: Option<usize>,
    pub max_upload_bytes: Option<usize>,
    pub logging: LoggingConfig,
}

/// Fully resolved service configuration
#[derive(Clone)]
pub struct ColorizerConfig {
    pub backend: BackendKind,
    /// Base URL without trailing slash
    pub base_url: String,
    /// Bearer token passed through to the backend
    pub api_token: String,
    pub model: String,
    pub prompt: String,
    pub request_timeout: Duration,
    pub bind: SocketAddr,
    pub event_capacity: usize,
    /// Request body cap for sketch uploads
    pub max_upload_bytes: usize,
}

impl fmt::Debug for ColorizerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColorizerConfig")
            .field("backend", &self.backend)
            .field("base_url", &self.base_url)
            .field("api_token", &"<redacted>")
            .field("model", &self.model)
            .field("request_timeout", &self.request_timeout)
            .field("bind", &self.bind)
            .field("event_capacity", &self.event_capacity)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

impl ColorizerConfig {
    /// Minimal configuration with compiled defaults for everything else
    pub fn new(
        backend: BackendKind,
        base_url: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            base_url: normalize_base_url(&base_url.into()),
            api_token: api_token.into(),
            model: DEFAULT_MODEL.to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            bind: default_bind(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Load the TOML file (if any) and resolve against the process environment
    pub fn load() -> Result<Self> {
        let toml_config = match config_file_path() {
            Some(path) => load_toml_config(&path)?,
            None => {
                warn!("Could not determine config directory, using environment and defaults");
                TomlConfig::default()
            }
        };
        Self::resolve(&toml_config)
    }

    /// Resolve against the process environment
    pub fn resolve(toml_config: &TomlConfig) -> Result<Self> {
        Self::resolve_with(toml_config, |name| std::env::var(name).ok())
    }

    /// Resolve using `lookup` in place of the process environment
    pub fn resolve_with<F>(toml_config: &TomlConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |name: &str| lookup(name).filter(|v| is_present(v));

        let backend = match env(ENV_BACKEND) {
            Some(value) => value.parse()?,
            None => toml_config.backend.unwrap_or_default(),
        };

        let base_url = env(ENV_BASE_URL)
            .or_else(|| toml_config.base_url.clone().filter(|v| is_present(v)))
            .ok_or_else(|| {
                Error::Config(format!(
                    "Colorization backend URL not configured. Please configure using one of:\n\
                     1. Environment: {}=https://your-backend.example\n\
                     2. TOML config: base_url = \"https://your-backend.example\"",
                    ENV_BASE_URL
                ))
            })?;

        let api_token = resolve_api_token(toml_config, env(ENV_API_TOKEN))?;

        let model = env(ENV_MODEL)
            .or_else(|| toml_config.model.clone().filter(|v| is_present(v)))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let prompt = env(ENV_PROMPT)
            .or_else(|| toml_config.prompt.clone().filter(|v| is_present(v)))
            .unwrap_or_else(|| DEFAULT_PROMPT.to_string());

        let timeout_secs = match env(ENV_TIMEOUT_SECS) {
            Some(value) => value.trim().parse::<u64>().map_err(|e| {
                Error::Config(format!("{} must be a number of seconds: {}", ENV_TIMEOUT_SECS, e))
            })?,
            None => toml_config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };
        if timeout_secs == 0 {
            return Err(Error::Config("Request timeout must be at least 1 second".to_string()));
        }

        let bind = match env(ENV_BIND).or_else(|| toml_config.bind.clone()) {
            Some(value) => value.trim().parse::<SocketAddr>().map_err(|e| {
                Error::Config(format!("Invalid bind address '{}': {}", value, e))
            })?,
            None => default_bind(),
        };

        let max_upload_bytes = match env(ENV_MAX_UPLOAD_BYTES) {
            Some(value) => value.trim().parse::<usize>().map_err(|e| {
                Error::Config(format!("{} must be a number of bytes: {}", ENV_MAX_UPLOAD_BYTES, e))
            })?,
            None => toml_config
                .max_upload_bytes
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        };
        if max_upload_bytes == 0 {
            return Err(Error::Config("Upload limit must be at least 1 byte".to_string()));
        }

        Ok(Self {
            backend,
            base_url: normalize_base_url(&base_url),
            api_token,
            model,
            prompt,
            request_timeout: Duration::from_secs(timeout_secs),
            bind,
            event_capacity: toml_config
                .event_capacity
                .unwrap_or(DEFAULT_EVENT_CAPACITY)
                .max(1),
            max_upload_bytes,
        })
    }
}

/// Resolve the bearer token (ENV → TOML), warning when both are set
fn resolve_api_token(toml_config: &TomlConfig, env_token: Option<String>) -> Result<String> {
    let toml_token = toml_config.api_token.clone().filter(|v| is_present(v));

    if env_token.is_some() && toml_token.is_some() {
        warn!("API token found in multiple sources: environment, TOML. Using environment (highest priority).");
    }

    if let Some(token) = env_token {
        info!("API token loaded from environment variable");
        return Ok(token);
    }

    if let Some(token) = toml_token {
        info!("API token loaded from TOML config");
        return Ok(token);
    }

    Err(Error::Config(format!(
        "API token not configured. Please configure using one of:\n\
         1. Environment: {}=your-token\n\
         2. TOML config: api_token = \"your-token\"",
        ENV_API_TOKEN
    )))
}

/// Non-empty, non-whitespace
pub fn is_present(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Trim whitespace and trailing slashes so endpoint paths can be appended
pub fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// 127.0.0.1:5780
fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5780))
}

/// Location of the TOML config file
///
/// `SKC_CONFIG` wins; otherwise `<config dir>/sketchcolor/config.toml`.
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
        if is_present(&path) {
            return Some(PathBuf::from(path));
        }
    }
    dirs::config_dir().map(|d| d.join("sketchcolor").join("config.toml"))
}

/// Read a TOML config file
///
/// A missing file is not an error: a warning is logged and defaults are used.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file not found at {}, using environment and defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;

    info!("Loaded config file: {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("data-api".parse::<BackendKind>().unwrap(), BackendKind::DataApi);
        assert_eq!(
            "CHAT_COMPLETION".parse::<BackendKind>().unwrap(),
            BackendKind::ChatCompletion
        );
        assert!("grpc".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_env_overrides_toml() {
        let toml_config = TomlConfig {
            base_url: Some("https://toml.example".to_string()),
            api_token: Some("toml-token".to_string()),
            ..Default::default()
        };

        let config = ColorizerConfig::resolve_with(
            &toml_config,
            lookup(&[
                (ENV_BASE_URL, "https://env.example/"),
                (ENV_API_TOKEN, "env-token"),
            ]),
        )
        .unwrap();

        assert_eq!(config.base_url, "https://env.example");
        assert_eq!(config.api_token, "env-token");
    }

    #[test]
    fn test_toml_fallback_and_defaults() {
        let toml_config = TomlConfig {
            backend: Some(BackendKind::ChatCompletion),
            base_url: Some("https://gateway.example".to_string()),
            api_token: Some("toml-token".to_string()),
            ..Default::default()
        };

        let config = ColorizerConfig::resolve_with(&toml_config, lookup(&[])).unwrap();

        assert_eq!(config.backend, BackendKind::ChatCompletion);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.prompt, DEFAULT_PROMPT);
        assert_eq!(config.request_timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.bind, default_bind());
        assert_eq!(config.event_capacity, DEFAULT_EVENT_CAPACITY);
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    }

    #[test]
    fn test_upload_limit_resolution() {
        let toml_config = TomlConfig {
            base_url: Some("https://x".to_string()),
            api_token: Some("t".to_string()),
            max_upload_bytes: Some(4096),
            ..Default::default()
        };

        let config = ColorizerConfig::resolve_with(&toml_config, lookup(&[])).unwrap();
        assert_eq!(config.max_upload_bytes, 4096);

        let config = ColorizerConfig::resolve_with(
            &toml_config,
            lookup(&[(ENV_MAX_UPLOAD_BYTES, "8192")]),
        )
        .unwrap();
        assert_eq!(config.max_upload_bytes, 8192);

        for bad in ["0", "lots"] {
            assert!(ColorizerConfig::resolve_with(
                &toml_config,
                lookup(&[(ENV_MAX_UPLOAD_BYTES, bad)]),
            )
            .is_err());
        }
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let toml_config = TomlConfig {
            base_url: Some("https://toml.example".to_string()),
            api_token: Some("toml-token".to_string()),
            ..Default::default()
        };

        let config = ColorizerConfig::resolve_with(
            &toml_config,
            lookup(&[(ENV_API_TOKEN, "   "), (ENV_BASE_URL, "")]),
        )
        .unwrap();

        assert_eq!(config.base_url, "https://toml.example");
        assert_eq!(config.api_token, "toml-token");
    }

    #[test]
    fn test_missing_token_is_config_error() {
        let toml_config = TomlConfig {
            base_url: Some("https://toml.example".to_string()),
            ..Default::default()
        };

        let err = ColorizerConfig::resolve_with(&toml_config, lookup(&[])).unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains(ENV_API_TOKEN)));
    }

    #[test]
    fn test_missing_base_url_is_config_error() {
        let err = ColorizerConfig::resolve_with(
            &TomlConfig::default(),
            lookup(&[(ENV_API_TOKEN, "t")]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains(ENV_BASE_URL)));
    }

    #[test]
    fn test_invalid_timeout_rejected() {
        let vars = [
            (ENV_BASE_URL, "https://x"),
            (ENV_API_TOKEN, "t"),
            (ENV_TIMEOUT_SECS, "soon"),
        ];
        assert!(ColorizerConfig::resolve_with(&TomlConfig::default(), lookup(&vars)).is_err());

        let vars = [
            (ENV_BASE_URL, "https://x"),
            (ENV_API_TOKEN, "t"),
            (ENV_TIMEOUT_SECS, "0"),
        ];
        assert!(ColorizerConfig::resolve_with(&TomlConfig::default(), lookup(&vars)).is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = ColorizerConfig::new(BackendKind::DataApi, "https://x", "secret-token");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url(" https://a.example/// "), "https://a.example");
        assert_eq!(normalize_base_url("https://a.example/fn/v1"), "https://a.example/fn/v1");
    }
}
