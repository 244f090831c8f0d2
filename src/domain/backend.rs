//! Contracts for the pluggable registry backend.
//!
//! The facade never stores service state itself. Every read, write and
//! watch goes through a [`RegistryBackend`], addressed per domain.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use super::{Namespace, Service, WatchResult};
use crate::error::BackendError;

/// Per-domain CRUD and watch primitive composed by the facade.
///
/// Implementations must be safe for concurrent use by many calls.
#[async_trait]
pub trait RegistryBackend: Send + Sync + fmt::Debug {
    /// Registers `service` in `domain`. A `ttl` sets a lease; `None` means
    /// the record lives until deregistered.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] if the backend rejects the write.
    async fn register(
        &self,
        service: &Service,
        domain: &Namespace,
        ttl: Option<Duration>,
    ) -> Result<(), BackendError>;

    /// Removes `service` (or the listed nodes of it) from `domain`.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] if the backend rejects the write.
    async fn deregister(&self, service: &Service, domain: &Namespace) -> Result<(), BackendError>;

    /// Returns every version of `name` registered in `domain`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] if nothing matches, or another
    /// variant on transport or internal failure.
    async fn get_service(&self, name: &str, domain: &Namespace)
    -> Result<Vec<Service>, BackendError>;

    /// Returns every service registered in `domain`.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] on transport or internal failure.
    async fn list_services(&self, domain: &Namespace) -> Result<Vec<Service>, BackendError>;

    /// Opens a watch subscription on `domain`, optionally restricted to one
    /// service name.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] if the subscription cannot be opened.
    async fn watch(
        &self,
        service: Option<&str>,
        domain: &Namespace,
    ) -> Result<Box<dyn Watcher>, BackendError>;
}

/// A live backend subscription.
///
/// Callers must call [`Watcher::stop`] exactly once when done.
#[async_trait]
pub trait Watcher: Send + fmt::Debug {
    /// Waits for the next change. `None` means the subscription ended.
    ///
    /// Must be cancel-safe: dropping the future loses no result.
    async fn next(&mut self) -> Option<WatchResult>;

    /// Releases the backend resources held by this subscription.
    fn stop(&mut self);
}
