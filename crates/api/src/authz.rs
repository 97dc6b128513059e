//! API-side authorization guard.
//!
//! Checked in handlers before any store call; the catalog service itself is
//! auth-agnostic.

use axum::{http::StatusCode, response::Response};

use storefront_auth::{Permission, authorize};

use crate::app::errors;
use crate::context::PrincipalContext;

/// Check that the request's principal holds `required`; 403 otherwise.
pub fn require_permission(
    principal: &PrincipalContext,
    required: &Permission,
) -> Result<(), Response> {
    authorize(&principal.principal(), required).map_err(|e| {
        tracing::debug!(user_id = %principal.user_id(), error = %e, "authorization denied");
        errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string())
    })
}
