//! Bearer gate middleware
//!
//! Runs in front of the whole router so that every path under the
//! protected prefix is checked, including paths no route matches.

use crate::error::ApiError;
use crate::metrics;
use crate::router::core_method;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};
use usergate_core::{Operation, Rejection};

/// Response header naming the dispatched operation (debug mode only)
pub const OPERATION_HEADER: &str = "x-usergate-operation";

/// Reject requests under the protected prefix that lack the bearer token
pub async fn require_bearer(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    if !state.routes.is_protected(&path) {
        return next.run(request).await;
    }

    let operation = match check(&state, &request, &path) {
        Ok(operation) => operation,
        Err(rejection) => {
            warn!("Rejected {} {}: {}", request.method(), path, rejection);
            metrics::record_rejection(rejection);
            return ApiError::unauthorized().into_response();
        }
    };

    let mut response = next.run(request).await;
    if let Some(operation) = operation {
        debug!("Dispatched {} to {}", path, operation);
        response.headers_mut().insert(
            HeaderName::from_static(OPERATION_HEADER),
            HeaderValue::from_static(operation.as_str()),
        );
    }
    response
}

/// Run the gate inside its span; in debug mode also resolve the operation
fn check(state: &AppState, request: &Request, path: &str) -> Result<Option<Operation>, Rejection> {
    let span = crate::tracing::gate_span(request.method().as_str(), path);
    let _entered = span.enter();

    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .map(HeaderValue::as_bytes);

    if let Err(rejection) = state.gate.check_bytes(header) {
        crate::tracing::record_gate_outcome(&span, rejection.as_str(), false);
        return Err(rejection);
    }
    crate::tracing::record_gate_outcome(&span, "allowed", true);

    if !state.debug {
        return Ok(None);
    }
    Ok(core_method(request.method())
        .and_then(|method| state.routes.resolve(method, path))
        .map(|m| m.operation))
}
