//! Per-connection subscription manager.
//!
//! Tracks which service names an event-feed client is subscribed to and
//! provides server-side event filtering.

use std::collections::HashSet;

/// Manages the set of service subscriptions for a single WebSocket
/// connection.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    /// Subscribed service names. Ignored while `subscribe_all` is set.
    services: HashSet<String>,
    /// Whether the client subscribes to every service (wildcard `"*"`).
    subscribe_all: bool,
}

impl SubscriptionManager {
    /// Creates a new empty subscription manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds names to the subscription set. `"*"` enables the wildcard.
    pub fn subscribe<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        for name in names {
            if name == "*" {
                self.subscribe_all = true;
            } else if !name.is_empty() {
                self.services.insert(name.to_string());
            }
        }
    }

    /// Removes names from the subscription set. `"*"` clears the wildcard.
    pub fn unsubscribe<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        for name in names {
            if name == "*" {
                self.subscribe_all = false;
            } else {
                self.services.remove(name);
            }
        }
    }

    /// Returns `true` if events for `service` should be forwarded.
    #[must_use]
    pub fn matches(&self, service: &str) -> bool {
        self.subscribe_all || self.services.contains(service)
    }

    /// Returns the number of explicitly subscribed names.
    #[must_use]
    pub fn count(&self) -> usize {
        self.services.len()
    }

    /// Returns `true` if the wildcard subscription is active.
    #[must_use]
    pub fn is_subscribed_all(&self) -> bool {
        self.subscribe_all
    }
}
