//! WebSocket layer: the watch stream and the published-event feed.
//!
//! `GET /api/v1/watch` upgrades into a multiplexed watch over the caller's
//! domains. `GET /ws/events` streams the events the gateway publishes,
//! filtered by per-connection subscriptions.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
pub mod watch;
