//! Broadcast channel for registry events.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel and is the
//! in-process [`EventPublisher`]. Every successful mutation publishes a
//! [`RegistryEvent`] through it, and `/ws/events` connections subscribe to
//! receive filtered events.

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::{EventPublisher, RegistryEvent};
use crate::error::PublishError;

/// Broadcast bus for [`RegistryEvent`]s.
///
/// Backed by a `tokio::broadcast` channel with a configurable capacity
/// (default 10 000). When the ring buffer is full, the oldest events are
/// dropped for lagging receivers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<RegistryEvent>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Sends an event to all current subscribers.
    ///
    /// Returns the number of receivers that received the event.
    /// If there are no active receivers, the event is silently dropped.
    pub fn send(&self, event: RegistryEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Creates a new receiver that will receive all future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl EventPublisher for EventBus {
    async fn publish(&self, event: RegistryEvent) -> Result<(), PublishError> {
        let delivered = self.send(event);
        tracing::trace!(delivered, "registry event broadcast");
        Ok(())
    }
}
