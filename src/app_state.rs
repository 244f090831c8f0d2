//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use axum::http::HeaderName;

use crate::domain::EventBus;
use crate::service::RegistryService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Registry service for all business logic.
    pub registry_service: Arc<RegistryService>,
    /// Event bus for `/ws/events` subscriptions.
    pub event_bus: EventBus,
    /// Header the caller namespace is read from.
    pub namespace_header: HeaderName,
}
