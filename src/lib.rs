//! # registry-gateway
//!
//! Namespace-aware façade over a service registry.
//!
//! Every call is scoped to a caller namespace carried in a request header.
//! Reads aggregate the shared default domain with the caller's own domain,
//! watches multiplex one backend subscription per domain into a single
//! stream, and successful writes publish a registry event.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── Watch + Event Feed (ws/)
//!     │
//!     ├── RegistryService (service/)
//!     │     ├── NamespaceResolver
//!     │     └── WatchMultiplexer
//!     │
//!     ├── RegistryBackend ── MemoryRegistry (domain/)
//!     └── EventPublisher ─── EventBus (domain/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod ws;
