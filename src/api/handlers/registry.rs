//! Registry handlers: register, deregister, get and list.

use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::context::{CallerContext, parse_domain};
use crate::api::dto::{DeregisterRequest, DomainQuery, RegisterRequest, ServicesResponse};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, GatewayError};

/// `POST /services`: Register a service in the caller's namespace.
///
/// # Errors
///
/// Returns [`GatewayError`] on an invalid service or backend failure.
#[utoipa::path(
    post,
    path = "/api/v1/services",
    tag = "Registry",
    summary = "Register a service",
    description = "Registers the service in the caller's namespace. A non-zero `options.ttl` sets a lease in seconds. A create event is published asynchronously.",
    request_body = RegisterRequest,
    responses(
        (status = 204, description = "Service registered"),
        (status = 400, description = "Invalid service or namespace", body = ErrorResponse),
        (status = 500, description = "Backend failure", body = ErrorResponse),
    )
)]
pub async fn register_service(
    State(state): State<AppState>,
    CallerContext(ctx): CallerContext,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let ttl = req
        .options
        .map(|o| o.ttl)
        .filter(|ttl| *ttl > 0)
        .map(Duration::from_secs);

    state
        .registry_service
        .register(&ctx, req.service, ttl)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /services`: Deregister a service from the caller's namespace.
///
/// # Errors
///
/// Returns [`GatewayError`] on an invalid service or backend failure.
#[utoipa::path(
    delete,
    path = "/api/v1/services",
    tag = "Registry",
    summary = "Deregister a service",
    description = "Removes the listed nodes (or the whole version if none are listed) from the caller's namespace. A delete event is published asynchronously.",
    request_body = DeregisterRequest,
    responses(
        (status = 204, description = "Service deregistered"),
        (status = 400, description = "Invalid service or namespace", body = ErrorResponse),
        (status = 500, description = "Backend failure", body = ErrorResponse),
    )
)]
pub async fn deregister_service(
    State(state): State<AppState>,
    CallerContext(ctx): CallerContext,
    Json(req): Json<DeregisterRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    state.registry_service.deregister(&ctx, req.service).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /services`: List services visible to the caller.
///
/// # Errors
///
/// Returns [`GatewayError`] if any queried domain fails.
#[utoipa::path(
    get,
    path = "/api/v1/services",
    tag = "Registry",
    summary = "List services",
    description = "Lists services from the default domain, the caller's namespace and the optional `domain`, in that order.",
    params(DomainQuery),
    responses(
        (status = 200, description = "Visible services", body = ServicesResponse),
        (status = 400, description = "Invalid namespace", body = ErrorResponse),
        (status = 500, description = "Backend failure", body = ErrorResponse),
    )
)]
pub async fn list_services(
    State(state): State<AppState>,
    CallerContext(ctx): CallerContext,
    Query(query): Query<DomainQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let explicit = parse_domain(query.domain.as_deref())?;
    let services = state
        .registry_service
        .list_services(&ctx, explicit.as_ref())
        .await?;
    Ok(Json(ServicesResponse { services }))
}

/// `GET /services/{name}`: Look up every version of a service.
///
/// # Errors
///
/// Returns [`GatewayError::ServiceNotFound`] if no queried domain holds
/// the service, or [`GatewayError::Internal`] if any domain fails.
#[utoipa::path(
    get,
    path = "/api/v1/services/{name}",
    tag = "Registry",
    summary = "Get a service",
    description = "Returns all versions of the service from the default domain, the caller's namespace and the optional `domain`, in that order.",
    params(
        ("name" = String, Path, description = "Service name"),
        DomainQuery,
    ),
    responses(
        (status = 200, description = "Matching services", body = ServicesResponse),
        (status = 404, description = "Service not found", body = ErrorResponse),
        (status = 500, description = "Backend failure", body = ErrorResponse),
    )
)]
pub async fn get_service(
    State(state): State<AppState>,
    CallerContext(ctx): CallerContext,
    Path(name): Path<String>,
    Query(query): Query<DomainQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let explicit = parse_domain(query.domain.as_deref())?;
    let services = state
        .registry_service
        .get_service(&ctx, &name, explicit.as_ref())
        .await?;
    Ok(Json(ServicesResponse { services }))
}

/// Registry routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/services",
            get(list_services)
                .post(register_service)
                .delete(deregister_service),
        )
        .route("/services/{name}", get(get_service))
}
