//! Service layer: registry aggregation and watch multiplexing.

pub mod registry_service;
pub mod watch;

#[cfg(test)]
pub(crate) mod testing;

pub use registry_service::{RegistryOptions, RegistryService};
pub use watch::{WatchEnd, WatchMultiplexer, WatchSink};
