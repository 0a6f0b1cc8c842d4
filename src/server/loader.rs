//! Configuration loading
//!
//! Handles loading configuration from embedded defaults, files, and environment.

use super::config::AppConfig;
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};

/// Embedded default configuration (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../../config/default.toml");

/// Deployment environment name (`WAHOOK_ENV`, default `development`)
pub fn environment() -> String {
    std::env::var("WAHOOK_ENV").unwrap_or_else(|_| "development".to_string())
}

/// Load configuration from files and environment
pub fn load_config() -> Result<AppConfig> {
    let config = Config::builder()
        // 1. Embedded defaults (always available)
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        // 2. External overrides (optional)
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{}", environment())).required(false))
        .add_source(File::with_name("config/local").required(false))
        // 3. Environment variables (highest priority)
        // prefix_separator("_") keeps WAHOOK_REDIS__URL working; config-rs
        // otherwise expects WAHOOK__REDIS__URL.
        .add_source(
            Environment::with_prefix("WAHOOK")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let app: AppConfig = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    app.tracker
        .validate()
        .context("Invalid [tracker] configuration")?;

    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::config::StoreBackend;

    #[test]
    fn test_embedded_defaults_parse() {
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.store.backend, StoreBackend::Redis);
        assert_eq!(config.tracker.threshold, 5);
        assert_eq!(config.tracker.ttl_secs, 600);
        assert_eq!(config.tracker.key_prefix, "qr-scan-count:");
    }

    #[test]
    fn test_override_layer() {
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from_str(
                "[store]\nbackend = \"memory\"\n[tracker]\nthreshold = 3",
                FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.tracker.threshold, 3);
        assert_eq!(config.tracker.ttl_secs, 600);
    }
}
