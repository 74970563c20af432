//! usergate HTTP server - bearer-gated CRUD API for users
//!
//! ## Request pipeline
//!
//! ```text
//! TraceLayer → CORS → compression → bearer gate → router → handler
//! ```
//!
//! The gate only acts on paths under the protected prefix; `/health/*`,
//! `/metrics` and `/openapi.json` are served without credentials.

pub mod api;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod openapi;
pub mod router;
pub mod state;
pub mod tracing;

pub use api::{CreateUserRequest, HealthResponse, UpdateUserRequest, UserResponse};
pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{middleware::from_fn_with_state, routing::get, Router};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use usergate_core::UsergateConfig;

/// Assemble the full application router
pub fn app(state: AppState) -> Router {
    Router::new()
        // User resource, built from the route table
        .merge(router::resource_router(&state.routes))
        // Health checks
        .route("/health/live", get(handlers::health_live))
        .route("/health/ready", get(handlers::health_ready))
        // Metrics
        .route("/metrics", get(handlers::prometheus_metrics))
        // API description
        .merge(openapi::router())
        .with_state(state.clone())
        // The gate wraps the fallback too, so unknown protected paths are gated
        .layer(from_fn_with_state(state, middleware::require_bearer))
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Bind the configured address and serve until Ctrl-C
pub async fn serve(config: UsergateConfig) -> anyhow::Result<()> {
    let state = AppState::from_config(&config)?;
    metrics::set_user_count(state.store.len());

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local = listener.local_addr()?;

    ::tracing::info!("Listening on {}", local);
    ::tracing::info!("API description at http://{}{}", local, openapi::OPENAPI_PATH);
    ::tracing::info!("Prometheus metrics at http://{}/metrics", local);

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            ::tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        ::tracing::info!("Received shutdown signal, shutting down gracefully...");
    };

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
