//! skc-colorizer - Sketch Colorization Service
//!
//! **Module Identity:**
//! - Name: skc-colorizer
//! - Default bind: 127.0.0.1:5780 (`SKC_BIND`)
//!
//! Upload a sketch, trigger colorization, follow progress over SSE.

use anyhow::{Context, Result};
use skc_common::config::{self, ColorizerConfig, TomlConfig, DEFAULT_LOG_LEVEL};
use skc_common::events::EventBus;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use skc_colorizer::services::ColorizationClient;
use skc_colorizer::workflow::Workflow;
use skc_colorizer::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // TOML is read before tracing starts so its logging.level can seed the filter
    let config_path = config::config_file_path();
    let toml_config = match &config_path {
        Some(path) if path.exists() => config::load_toml_config(path)
            .context("Failed to load configuration file")?,
        _ => TomlConfig::default(),
    };

    let default_level = toml_config
        .logging
        .level
        .clone()
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_level)),
        )
        .init();

    info!("Starting skc-colorizer (Sketch Colorization) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) if path.exists() => info!("Config file: {}", path.display()),
        Some(path) => warn!(
            "Config file not found at {}, using environment and defaults",
            path.display()
        ),
        None => warn!("Could not determine config directory, using environment and defaults"),
    }

    let config = ColorizerConfig::resolve(&toml_config).context("Invalid configuration")?;
    info!(
        backend = config.backend.as_str(),
        base_url = %config.base_url,
        model = %config.model,
        timeout_secs = config.request_timeout.as_secs(),
        max_upload_bytes = config.max_upload_bytes,
        "Configuration resolved"
    );

    let event_bus = EventBus::new(config.event_capacity);
    info!("Event bus initialized (capacity {})", event_bus.capacity());

    let client = ColorizationClient::from_config(&config)
        .context("Failed to initialize colorization client")?;
    let workflow = Workflow::new(client, event_bus);

    let state = AppState::new(workflow).with_max_upload_bytes(config.max_upload_bytes);
    let app = skc_colorizer::build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;
    info!("Listening on http://{}", config.bind);
    info!("Health check: http://{}/health", config.bind);

    axum::serve(listener, app).await?;

    Ok(())
}
