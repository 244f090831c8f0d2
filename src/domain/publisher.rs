//! Event publisher contract.

use std::fmt;

use async_trait::async_trait;

use super::RegistryEvent;
use crate::error::PublishError;

/// Asynchronous, best-effort sink for [`RegistryEvent`]s.
///
/// Callers bound each attempt with their own timeout and drop the future
/// when it expires, so implementations must tolerate cancellation at any
/// await point.
#[async_trait]
pub trait EventPublisher: Send + Sync + fmt::Debug {
    /// Publishes one event.
    ///
    /// # Errors
    ///
    /// Returns a [`PublishError`] if the event could not be handed off.
    async fn publish(&self, event: RegistryEvent) -> Result<(), PublishError>;
}
