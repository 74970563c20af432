//! # OpenAPI document
//!
//! Assembles the utoipa-annotated handlers into one OpenAPI document and
//! serves it at `/openapi.json`. Paths are written against the default
//! `/api/rest` prefix and rebased onto the configured one when served.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use usergate_core::routes::DEFAULT_PROTECTED_PREFIX;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::openapi::{OpenApi as OpenApiDoc, Paths};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Path the document is served at
pub const OPENAPI_PATH: &str = "/openapi.json";

/// Adds the bearer token security scheme
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut OpenApiDoc) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

/// OpenAPI document for the user API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "usergate",
        description = "CRUD API for users. Every `/api/rest` endpoint requires `Authorization: Bearer <token>`; health and metrics endpoints do not."
    ),
    paths(
        crate::handlers::list_users,
        crate::handlers::create_user,
        crate::handlers::get_user,
        crate::handlers::update_user,
        crate::handlers::delete_user,
        crate::handlers::health_live,
        crate::handlers::health_ready,
    ),
    components(
        schemas(
            crate::api::UserResponse,
            crate::api::CreateUserRequest,
            crate::api::UpdateUserRequest,
            crate::api::HealthResponse,
            crate::api::HealthStatus,
            crate::error::ErrorResponse,
        ),
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "users", description = "User resource, bearer token required"),
        (name = "health", description = "Liveness and readiness probes"),
    )
)]
pub struct ApiDoc;

/// The document with paths moved from the default prefix onto `prefix`
pub fn document_for_prefix(prefix: &str) -> OpenApiDoc {
    let mut doc = ApiDoc::openapi();
    if prefix == DEFAULT_PROTECTED_PREFIX {
        return doc;
    }

    let base = if prefix == "/" { "" } else { prefix };
    let mut rebased = Paths::new();
    for (path, item) in std::mem::take(&mut doc.paths.paths) {
        let path = match path.strip_prefix(DEFAULT_PROTECTED_PREFIX) {
            Some(rest) => format!("{}{}", base, rest),
            None => path,
        };
        rebased.paths.insert(path, item);
    }
    doc.paths = rebased;
    doc
}

/// Build the OpenAPI router
pub fn router() -> Router<AppState> {
    Router::new().route(OPENAPI_PATH, get(openapi_json))
}

/// GET /openapi.json
async fn openapi_json(State(state): State<AppState>) -> Json<OpenApiDoc> {
    Json(document_for_prefix(state.routes.protected_prefix()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_doc_generates() {
        let doc = ApiDoc::openapi();
        assert_eq!(doc.info.title, "usergate");
        assert_eq!(doc.info.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_openapi_doc_has_user_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/rest/users"));
        assert!(doc.paths.paths.contains_key("/api/rest/users/{userId}"));
        assert!(doc.paths.paths.contains_key("/health/live"));
    }

    #[test]
    fn test_openapi_doc_has_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }

    #[test]
    fn test_rebased_document() {
        let doc = document_for_prefix("/v2");
        assert!(doc.paths.paths.contains_key("/v2/users"));
        assert!(doc.paths.paths.contains_key("/v2/users/{userId}"));
        assert!(doc.paths.paths.contains_key("/health/ready"));
        assert!(!doc.paths.paths.contains_key("/api/rest/users"));
    }

    #[test]
    fn test_default_prefix_is_unchanged() {
        let doc = document_for_prefix(DEFAULT_PROTECTED_PREFIX);
        assert_eq!(doc.paths.paths.len(), ApiDoc::openapi().paths.paths.len());
    }
}
