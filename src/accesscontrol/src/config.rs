//! Access control configuration

use serde::Deserialize;
use std::time::Duration;

/// Access control engine configuration
///
/// Every field is optional when deserializing; missing fields take their
/// [`Default`] values (enabled, 30s resolver cache, no store timeout,
/// metrics on).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccessControlConfig {
    /// Whether access control decisions are enforced
    pub enabled: bool,

    /// TTL of resolved scopes in milliseconds, 0 disables the resolver cache
    pub resolver_cache_ttl_ms: u64,

    /// Upper bound on a permission store fetch in milliseconds
    pub store_timeout_ms: Option<u64>,

    /// Collect evaluation metrics
    pub enable_metrics: bool,
}

impl Default for AccessControlConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            resolver_cache_ttl_ms: 30_000,
            store_timeout_ms: None,
            enable_metrics: true,
        }
    }
}

impl AccessControlConfig {
    /// Resolved scope cache TTL
    pub fn resolver_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.resolver_cache_ttl_ms)
    }

    /// Permission fetch bound, `None` waits for the store indefinitely
    pub fn store_timeout(&self) -> Option<Duration> {
        self.store_timeout_ms.map(Duration::from_millis)
    }
}
