use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use storefront_auth::JwtValidator;

use crate::app::errors;
use crate::context::PrincipalContext;

/// Name of the cookie the storefront frontend keeps its token in.
pub const TOKEN_COOKIE: &str = "token";

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

/// Resolve the caller's identity, if any.
///
/// No token: the request continues anonymously. A token that is present but
/// malformed, badly signed or expired is rejected with 401.
pub async fn identity_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let claims = match extract_token(req.headers()) {
        Ok(None) => None,
        Ok(Some(token)) => match state.jwt.validate(token, Utc::now()) {
            Ok(claims) => Some(claims),
            Err(e) => {
                tracing::debug!(error = %e, "rejecting token");
                return errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", "invalid token");
            }
        },
        Err(status) => {
            return errors::json_error(status, "unauthorized", "malformed authorization header");
        }
    };

    if let Some(claims) = claims {
        req.extensions_mut().insert(PrincipalContext::from(claims));
    }

    next.run(req).await
}

/// Bearer token from `Authorization`, else the `token` cookie.
fn extract_token(headers: &HeaderMap) -> Result<Option<&str>, StatusCode> {
    if let Some(header) = headers.get(header::AUTHORIZATION) {
        let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(StatusCode::UNAUTHORIZED)?
            .trim();
        if token.is_empty() {
            return Err(StatusCode::UNAUTHORIZED);
        }
        return Ok(Some(token));
    }

    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == TOKEN_COOKIE && !value.is_empty())
        .map(|(_, value)| value);

    Ok(from_cookie)
}
