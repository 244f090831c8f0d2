//! Tenant namespaces, call context and domain-set resolution.
//!
//! A [`Namespace`] partitions the registry. One namespace is privileged as
//! the shared default domain; it is configured once and handed to a
//! [`NamespaceResolver`], which turns a [`RequestContext`] into the caller's
//! namespace. [`domain_set`] computes the ordered set of domains a read or
//! watch call has to touch.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::GatewayError;

/// Tenant-scoping identifier.
///
/// Non-empty, free of whitespace and `/`. Construct through
/// [`Namespace::parse`] for untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace(String);

impl Namespace {
    /// Validates and wraps a namespace string. Surrounding whitespace is
    /// trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if the value is empty or
    /// contains whitespace or `/`.
    pub fn parse(value: &str) -> Result<Self, GatewayError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(GatewayError::InvalidRequest(
                "namespace must not be empty".to_string(),
            ));
        }
        if trimmed.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(GatewayError::InvalidRequest(format!(
                "invalid namespace: {trimmed}"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the namespace as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-call context carried from the transport into the service layer.
///
/// Holds the caller's namespace (if the transport supplied one) and the
/// cancellation signal for the call.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Namespace extracted from the inbound request, if any.
    pub namespace: Option<Namespace>,
    /// Fires when the caller goes away.
    pub cancel: CancellationToken,
}

impl RequestContext {
    /// Creates a context for the given namespace with a fresh cancellation
    /// token.
    #[must_use]
    pub fn new(namespace: Option<Namespace>) -> Self {
        Self {
            namespace,
            cancel: CancellationToken::new(),
        }
    }

    /// Replaces the cancellation token.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Resolves the caller namespace from a [`RequestContext`].
#[derive(Debug, Clone)]
pub struct NamespaceResolver {
    default: Namespace,
}

impl NamespaceResolver {
    /// Creates a resolver around the configured default namespace.
    #[must_use]
    pub fn new(default: Namespace) -> Self {
        Self { default }
    }

    /// The shared default domain.
    #[must_use]
    pub fn default_namespace(&self) -> &Namespace {
        &self.default
    }

    /// Returns the caller's namespace, falling back to the default domain
    /// when the context carries none.
    #[must_use]
    pub fn resolve(&self, ctx: &RequestContext) -> Namespace {
        ctx.namespace
            .clone()
            .unwrap_or_else(|| self.default.clone())
    }
}

/// Builds the ordered, deduplicated set of domains to query.
///
/// Order is fixed: default, then caller (if different), then explicit (if
/// present and different from both).
#[must_use]
pub fn domain_set(
    default: &Namespace,
    caller: &Namespace,
    explicit: Option<&Namespace>,
) -> Vec<Namespace> {
    let mut domains = vec![default.clone()];
    if caller != default {
        domains.push(caller.clone());
    }
    if let Some(explicit) = explicit
        && explicit != default
        && explicit != caller
    {
        domains.push(explicit.clone());
    }
    domains
}
