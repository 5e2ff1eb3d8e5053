//! Configuration loading tests
//!
//! Exercise `ColorizerConfig::load` against the real process environment and
//! TOML files on disk.
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Every test that touches SKC_* variables is marked with #[serial].

use serial_test::serial;
use skc_common::config::{
    load_toml_config, BackendKind, ColorizerConfig, TomlConfig, DEFAULT_MODEL, ENV_API_TOKEN,
    ENV_BACKEND, ENV_BASE_URL, ENV_BIND, ENV_CONFIG_PATH, ENV_MODEL, ENV_PROMPT,
    ENV_MAX_UPLOAD_BYTES, ENV_TIMEOUT_SECS,
};
use skc_common::Error;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

const ALL_VARS: &[&str] = &[
    ENV_CONFIG_PATH,
    ENV_BACKEND,
    ENV_BASE_URL,
    ENV_API_TOKEN,
    ENV_MODEL,
    ENV_PROMPT,
    ENV_TIMEOUT_SECS,
    ENV_BIND,
    ENV_MAX_UPLOAD_BYTES,
];

fn clear_env() {
    for var in ALL_VARS {
        std::env::remove_var(var);
    }
}

fn write_toml(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_load_from_toml_file() {
    clear_env();
    let file = write_toml(
        r#"
backend = "chat-completion"
base_url = "https://gateway.example/"
api_token = "toml-token"
model = "custom/image-model"
timeout_secs = 30
bind = "0.0.0.0:9000"
event_capacity = 16
max_upload_bytes = 5242880

[logging]
level = "debug"
"#,
    );
    std::env::set_var(ENV_CONFIG_PATH, file.path());

    let config = ColorizerConfig::load().unwrap();

    assert_eq!(config.backend, BackendKind::ChatCompletion);
    assert_eq!(config.base_url, "https://gateway.example");
    assert_eq!(config.api_token, "toml-token");
    assert_eq!(config.model, "custom/image-model");
    assert_eq!(config.request_timeout, Duration::from_secs(30));
    assert_eq!(config.bind.to_string(), "0.0.0.0:9000");
    assert_eq!(config.event_capacity, 16);
    assert_eq!(config.max_upload_bytes, 5 * 1024 * 1024);

    let toml_config = load_toml_config(file.path()).unwrap();
    assert_eq!(toml_config.logging.level.as_deref(), Some("debug"));

    clear_env();
}

#[test]
#[serial]
fn test_env_overrides_toml_file() {
    clear_env();
    let file = write_toml(
        r#"
backend = "chat-completion"
base_url = "https://toml.example"
api_token = "toml-token"
"#,
    );
    std::env::set_var(ENV_CONFIG_PATH, file.path());
    std::env::set_var(ENV_BACKEND, "data-api");
    std::env::set_var(ENV_BASE_URL, "https://env.example");
    std::env::set_var(ENV_API_TOKEN, "env-token");
    std::env::set_var(ENV_TIMEOUT_SECS, "5");

    let config = ColorizerConfig::load().unwrap();

    assert_eq!(config.backend, BackendKind::DataApi);
    assert_eq!(config.base_url, "https://env.example");
    assert_eq!(config.api_token, "env-token");
    assert_eq!(config.request_timeout, Duration::from_secs(5));
    assert_eq!(config.model, DEFAULT_MODEL);

    clear_env();
}

#[test]
#[serial]
fn test_missing_file_falls_back_to_env() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var(ENV_CONFIG_PATH, dir.path().join("absent.toml"));
    std::env::set_var(ENV_BASE_URL, "https://env.example");
    std::env::set_var(ENV_API_TOKEN, "env-token");

    let config = ColorizerConfig::load().unwrap();

    assert_eq!(config.backend, BackendKind::DataApi);
    assert_eq!(config.base_url, "https://env.example");

    clear_env();
}

#[test]
#[serial]
fn test_error_when_nothing_configured() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var(ENV_CONFIG_PATH, dir.path().join("absent.toml"));

    let err = ColorizerConfig::load().unwrap_err();
    assert!(matches!(err, Error::Config(_)));

    clear_env();
}

#[test]
#[serial]
fn test_invalid_backend_in_env() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var(ENV_CONFIG_PATH, dir.path().join("absent.toml"));
    std::env::set_var(ENV_BACKEND, "carrier-pigeon");
    std::env::set_var(ENV_BASE_URL, "https://env.example");
    std::env::set_var(ENV_API_TOKEN, "t");

    let err = ColorizerConfig::load().unwrap_err();
    assert!(err.to_string().contains("carrier-pigeon"));

    clear_env();
}

#[test]
fn test_load_toml_parse_error() {
    let file = write_toml("base_url = [not valid");

    let err = load_toml_config(file.path()).unwrap_err();
    assert!(matches!(err, Error::Config(ref msg) if msg.contains("Parse TOML failed")));
}

#[test]
fn test_load_toml_missing_file_is_default() {
    let dir = tempfile::tempdir().unwrap();

    let config = load_toml_config(&dir.path().join("nope.toml")).unwrap();

    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_unknown_backend_in_toml_is_parse_error() {
    let file = write_toml(r#"backend = "grpc""#);

    assert!(load_toml_config(file.path()).is_err());
}
