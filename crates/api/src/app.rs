//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store and catalog service wiring
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};

use storefront_auth::{Hs256JwtValidator, JwtValidator};

use crate::config::AppConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let jwt: Arc<dyn JwtValidator> = Arc::new(Hs256JwtValidator::new(&config.jwt_secret));
    let services = Arc::new(services::build_services(config).await?);
    tracing::info!(backend = services.backend(), "services ready");
    Ok(build_app_with(services, jwt))
}

/// Router over already-built services.
pub fn build_app_with(services: Arc<services::AppServices>, jwt: Arc<dyn JwtValidator>) -> Router {
    let auth_state = middleware::AuthState { jwt };

    let api = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::identity_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api", api)
}
