//! Gateway configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`), each with a default.

use std::net::SocketAddr;
use std::time::Duration;

use crate::domain::Namespace;
use crate::service::RegistryOptions;

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`GatewayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:8000`).
    pub listen_addr: SocketAddr,

    /// The shared domain visible to every tenant.
    pub default_namespace: Namespace,

    /// Request header carrying the caller namespace.
    pub namespace_header: String,

    /// Identifier stamped on every published event.
    pub service_id: String,

    /// Seconds to wait for a single event publish before giving up.
    pub publish_timeout_secs: u64,

    /// Capacity of the EventBus broadcast channel.
    pub event_bus_capacity: usize,

    /// Capacity of the per-call watch merge channel.
    pub watch_channel_capacity: usize,

    /// Seconds between expired-registration sweeps (0 = never).
    pub sweep_interval_secs: u64,
}

impl GatewayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`], or if `DEFAULT_NAMESPACE` is not a valid
    /// namespace.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8000".to_string())
            .parse()?;

        let default_namespace = Namespace::parse(
            &std::env::var("DEFAULT_NAMESPACE").unwrap_or_else(|_| "go.micro".to_string()),
        )?;

        let namespace_header =
            std::env::var("NAMESPACE_HEADER").unwrap_or_else(|_| "Micro-Namespace".to_string());

        let service_id =
            std::env::var("SERVICE_ID").unwrap_or_else(|_| "go.micro.registry".to_string());

        let publish_timeout_secs = parse_env("EVENT_PUBLISH_TIMEOUT_SECS", 5);
        let event_bus_capacity = parse_env("EVENT_BUS_CAPACITY", 10_000);
        let watch_channel_capacity = parse_env::<usize>("WATCH_CHANNEL_CAPACITY", 1).max(1);
        let sweep_interval_secs = parse_env("REGISTRY_SWEEP_INTERVAL_SECS", 30);

        Ok(Self {
            listen_addr,
            default_namespace,
            namespace_header,
            service_id,
            publish_timeout_secs,
            event_bus_capacity,
            watch_channel_capacity,
            sweep_interval_secs,
        })
    }

    /// Service-layer options derived from this configuration.
    #[must_use]
    pub fn registry_options(&self) -> RegistryOptions {
        RegistryOptions {
            service_id: self.service_id.clone(),
            publish_timeout: Duration::from_secs(self.publish_timeout_secs),
            watch_capacity: self.watch_channel_capacity,
        }
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
