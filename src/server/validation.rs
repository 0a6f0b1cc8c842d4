//! Production configuration validation
//!
//! Security and durability checks for production deployments.

use super::config::{AppConfig, StoreBackend};
use super::loader::environment;
use tracing::warn;

/// Log warnings for settings that are unsafe in production
///
/// Returns the number of warnings emitted.
pub fn validate_production_config(config: &AppConfig) -> usize {
    if environment().to_lowercase() != "production" {
        return 0;
    }

    let mut warnings = 0;

    if config.server.host == "0.0.0.0" {
        warn!(
            "SECURITY WARNING: Server is binding to all interfaces (0.0.0.0) in production. \
             Consider binding to 127.0.0.1 and using a reverse proxy."
        );
        warnings += 1;
    }

    if config.store.backend == StoreBackend::Memory {
        warn!(
            "Memory store selected in production. QR scan counters and deletion jobs \
             are lost on restart and not shared between replicas."
        );
        warnings += 1;
    }

    if config.store.backend == StoreBackend::Redis
        && config.redis.url.starts_with("redis://")
        && !config.redis.url.contains('@')
    {
        warn!(
            "SECURITY WARNING: Redis connection appears to have no authentication in production. \
             Consider enabling Redis AUTH."
        );
        warnings += 1;
    }

    warnings
}
