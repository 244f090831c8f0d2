//! Caller context extraction.
//!
//! The caller namespace travels in a request header (configurable, default
//! `Micro-Namespace`). [`CallerContext`] turns it into a
//! [`RequestContext`]; a missing or blank header leaves the namespace
//! unset so the resolver falls back to the default domain.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::app_state::AppState;
use crate::domain::{Namespace, RequestContext};
use crate::error::GatewayError;

/// Extractor yielding the [`RequestContext`] of the inbound call.
#[derive(Debug, Clone)]
pub struct CallerContext(pub RequestContext);

impl FromRequestParts<AppState> for CallerContext {
    type Rejection = GatewayError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let namespace = match parts.headers.get(&state.namespace_header) {
            Some(value) => {
                let raw = value.to_str().map_err(|_| {
                    GatewayError::InvalidRequest("namespace header is not valid UTF-8".to_string())
                })?;
                parse_domain(Some(raw))?
            }
            None => None,
        };
        Ok(Self(RequestContext::new(namespace)))
    }
}

/// Parses an optional, possibly blank namespace value.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] if a non-blank value is not a
/// valid namespace.
pub fn parse_domain(value: Option<&str>) -> Result<Option<Namespace>, GatewayError> {
    match value {
        Some(raw) if !raw.trim().is_empty() => Namespace::parse(raw).map(Some),
        _ => Ok(None),
    }
}
