//! Domain layer: namespaces, service records, events and collaborators.
//!
//! This module contains the tenant namespace model and domain-set logic,
//! the service record types, registry events and watch results, the
//! backend and publisher contracts, and their in-process implementations.

pub mod backend;
pub mod event_bus;
pub mod memory_registry;
pub mod namespace;
pub mod publisher;
pub mod registry_event;
pub mod service;

pub use backend::{RegistryBackend, Watcher};
pub use event_bus::EventBus;
pub use memory_registry::MemoryRegistry;
pub use namespace::{Namespace, NamespaceResolver, RequestContext, domain_set};
pub use publisher::EventPublisher;
pub use registry_event::{EventType, RegistryEvent, WatchResult};
pub use service::{Endpoint, Node, Service};
