//! HTTP request handlers
//!
//! One handler per route-table operation, plus the unauthenticated health
//! and metrics endpoints. The gate has already run by the time any user
//! handler is entered.

use crate::api::{
    CreateUserRequest, HealthResponse, HealthStatus, UpdateUserRequest, UserResponse,
};
use crate::error::ApiResult;
use crate::metrics::{self, RequestTimer};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use tracing::{debug, info, warn};
use usergate_core::{Operation, UserId};

/// Get all users
#[utoipa::path(
    get,
    path = "/api/rest/users",
    tag = "users",
    responses(
        (status = 200, description = "All users, ordered by id", body = [UserResponse]),
        (status = 401, description = "Missing or invalid bearer token", body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(State(state): State<AppState>) -> Json<Vec<UserResponse>> {
    let _timer = RequestTimer::start(Operation::List);
    let users: Vec<UserResponse> = state.store.list().into_iter().map(Into::into).collect();
    debug!("Listing {} users", users.len());
    Json(users)
}

/// Create a user
#[utoipa::path(
    post,
    path = "/api/rest/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid payload", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let _timer = RequestTimer::start(Operation::Create);
    let Json(req) = payload?;

    let user = state.store.create(req.into())?;
    metrics::set_user_count(state.store.len());

    let location = format!("{}/users/{}", state.routes.base(), user.id);
    info!("Created user {}", user.id);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(UserResponse::from(user)),
    ))
}

/// Get one user
#[utoipa::path(
    get,
    path = "/api/rest/users/{userId}",
    tag = "users",
    params(("userId" = String, Path, description = "User identifier")),
    responses(
        (status = 200, description = "The user", body = UserResponse),
        (status = 401, description = "Missing or invalid bearer token", body = crate::error::ErrorResponse),
        (status = 404, description = "No such user", body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserResponse>> {
    let _timer = RequestTimer::start(Operation::GetOne);
    let user = state.store.get(&UserId::from(user_id))?;
    Ok(Json(user.into()))
}

/// Update one user
#[utoipa::path(
    patch,
    path = "/api/rest/users/{userId}",
    tag = "users",
    params(("userId" = String, Path, description = "User identifier")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "The updated user", body = UserResponse),
        (status = 400, description = "Invalid payload", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = crate::error::ErrorResponse),
        (status = 404, description = "No such user", body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ApiResult<Json<UserResponse>> {
    let _timer = RequestTimer::start(Operation::Update);
    let Json(req) = payload?;

    let user = state.store.update(&UserId::from(user_id), req.into())?;
    info!("Updated user {}", user.id);
    Ok(Json(user.into()))
}

/// Delete one user
#[utoipa::path(
    delete,
    path = "/api/rest/users/{userId}",
    tag = "users",
    params(("userId" = String, Path, description = "User identifier")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 401, description = "Missing or invalid bearer token", body = crate::error::ErrorResponse),
        (status = 404, description = "No such user", body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<StatusCode> {
    let _timer = RequestTimer::start(Operation::Delete);
    let user = state.store.delete(&UserId::from(user_id))?;
    metrics::set_user_count(state.store.len());
    info!("Deleted user {}", user.id);
    Ok(StatusCode::NO_CONTENT)
}

/// Health check - liveness probe
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "health",
    responses((status = 200, description = "Process is up", body = HealthResponse))
)]
pub async fn health_live(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health(&state, HealthStatus::Healthy))
}

/// Health check - readiness probe
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "health",
    responses(
        (status = 200, description = "Ready to serve", body = HealthResponse),
        (status = 503, description = "No user routes registered", body = HealthResponse),
    )
)]
pub async fn health_ready(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    if state.routes.routes().is_empty() {
        warn!("Readiness check failed: no user routes registered");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(health(&state, HealthStatus::Unhealthy)),
        );
    }
    (StatusCode::OK, Json(health(&state, HealthStatus::Healthy)))
}

fn health(state: &AppState, status: HealthStatus) -> HealthResponse {
    HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        users: state.store.len(),
    }
}

/// Prometheus metrics endpoint
pub async fn prometheus_metrics() -> String {
    metrics::get_prometheus_metrics()
}
