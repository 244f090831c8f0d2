//! registry-gateway server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::HeaderName;
use tracing_subscriber::EnvFilter;

use registry_gateway::api;
use registry_gateway::app_state::AppState;
use registry_gateway::config::GatewayConfig;
use registry_gateway::domain::{EventBus, MemoryRegistry, NamespaceResolver};
use registry_gateway::service::RegistryService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = GatewayConfig::from_env()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    tracing::info!(
        addr = %config.listen_addr,
        default_namespace = %config.default_namespace,
        "starting registry-gateway"
    );

    // Build domain layer
    let registry = Arc::new(MemoryRegistry::new());
    let event_bus = EventBus::new(config.event_bus_capacity);
    let resolver = NamespaceResolver::new(config.default_namespace.clone());

    if config.sweep_interval_secs > 0 {
        let registry = Arc::clone(&registry);
        let period = Duration::from_secs(config.sweep_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let removed = registry.sweep_expired().await;
                if removed > 0 {
                    tracing::info!(removed, "swept expired registrations");
                }
            }
        });
    }

    // Build service layer
    let registry_service = Arc::new(RegistryService::new(
        registry,
        Arc::new(event_bus.clone()),
        resolver,
        config.registry_options(),
    ));

    // Build application state
    let app_state = AppState {
        registry_service,
        event_bus,
        namespace_header: HeaderName::from_bytes(config.namespace_header.as_bytes())
            .with_context(|| format!("invalid NAMESPACE_HEADER {:?}", config.namespace_header))?,
    };

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, api::build_app(app_state)).await?;

    Ok(())
}
