//! Registry mutation events and watch results.
//!
//! A [`RegistryEvent`] is emitted once per successful mutating call and
//! handed to the [`super::EventPublisher`]. A [`WatchResult`] is what a
//! backend watch subscription yields for every change it observes.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Service;

/// Kind of change a registry event or watch result describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A service record was created.
    Create,
    /// A service record was updated.
    Update,
    /// A service record was removed.
    Delete,
}

impl EventType {
    /// Maps an action string to an event type. `"create"` and `"delete"`
    /// map to their variants; everything else is an update.
    #[must_use]
    pub fn from_action(action: &str) -> Self {
        match action {
            "create" => Self::Create,
            "delete" => Self::Delete,
            _ => Self::Update,
        }
    }

    /// Returns the lowercase action string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Notification describing a registry mutation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegistryEvent {
    /// Identifier of the issuing registry service.
    pub id: String,
    /// Unique id of this event, for log correlation.
    pub event_id: uuid::Uuid,
    /// Kind of mutation.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Issue time in UNIX nanoseconds.
    pub timestamp: i64,
    /// Snapshot of the service as supplied by the caller.
    pub service: Service,
}

impl RegistryEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(id: impl Into<String>, event_type: EventType, service: Service) -> Self {
        Self {
            id: id.into(),
            event_id: uuid::Uuid::new_v4(),
            event_type,
            timestamp: Utc::now().timestamp_nanos_opt().unwrap_or_default(),
            service,
        }
    }
}

/// A single change observed by a watch subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WatchResult {
    /// Kind of change.
    pub action: EventType,
    /// Service snapshot after (or, for deletes, before) the change.
    pub service: Service,
}

impl WatchResult {
    /// Creates a watch result.
    #[must_use]
    pub fn new(action: EventType, service: Service) -> Self {
        Self { action, service }
    }
}
