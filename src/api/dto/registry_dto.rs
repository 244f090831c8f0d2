//! Registry DTOs for register, deregister, lookup and watch.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::Service;

/// Registration options.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RegisterOptions {
    /// Lease in seconds. `0` means the record never expires.
    #[serde(default)]
    pub ttl: u64,
}

/// Request body for `POST /services`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// Service to register in the caller's namespace.
    pub service: Service,
    /// Optional registration options.
    #[serde(default)]
    pub options: Option<RegisterOptions>,
}

/// Request body for `DELETE /services`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct DeregisterRequest {
    /// Service (or nodes of it) to remove from the caller's namespace.
    pub service: Service,
}

/// Query parameters for lookup and list endpoints.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct DomainQuery {
    /// Additional domain to include in the lookup.
    #[serde(default)]
    pub domain: Option<String>,
}

/// Query parameters for `GET /watch`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct WatchQuery {
    /// Only report changes to this service name.
    #[serde(default)]
    pub service: Option<String>,
    /// Additional domain to watch.
    #[serde(default)]
    pub domain: Option<String>,
}

/// Response body for lookup and list endpoints.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ServicesResponse {
    /// Matching services, default domain first.
    pub services: Vec<Service>,
}
