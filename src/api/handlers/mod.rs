//! REST endpoint handlers organized by resource.

pub mod registry;
pub mod system;

use axum::Router;
use axum::routing::get;

use crate::app_state::AppState;
use crate::ws::watch::watch_handler;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(registry::routes())
        .route("/watch", get(watch_handler))
}
