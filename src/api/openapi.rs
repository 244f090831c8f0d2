//! OpenAPI document for the REST surface.

use utoipa::OpenApi;

use crate::api::dto::{DeregisterRequest, RegisterOptions, RegisterRequest, ServicesResponse};
use crate::api::handlers::{registry, system};
use crate::domain::{Endpoint, EventType, Node, RegistryEvent, Service, WatchResult};
use crate::error::{ErrorBody, ErrorResponse};

/// Generated OpenAPI description, served at `/api-docs/openapi.json`.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "registry-gateway",
        description = "Namespace-aware facade over a pluggable service registry."
    ),
    paths(
        registry::register_service,
        registry::deregister_service,
        registry::list_services,
        registry::get_service,
        system::health_handler,
    ),
    components(schemas(
        Service,
        Node,
        Endpoint,
        EventType,
        RegistryEvent,
        WatchResult,
        RegisterRequest,
        RegisterOptions,
        DeregisterRequest,
        ServicesResponse,
        ErrorResponse,
        ErrorBody,
        system::HealthResponse,
    )),
    tags(
        (name = "Registry", description = "Service registration and discovery"),
        (name = "System", description = "Operational endpoints"),
    )
)]
pub struct ApiDoc;
