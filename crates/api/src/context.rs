use axum::{async_trait, extract::FromRequestParts, http::request::Parts, response::Response};

use storefront_auth::{JwtClaims, Principal, Role};
use storefront_catalog::Reviewer;
use storefront_core::{DomainError, UserId};

use crate::app::errors;

/// Authenticated identity for a request, inserted by the identity middleware.
///
/// Extracting it from a request without a valid token rejects with 401.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    user_id: UserId,
    username: String,
    roles: Vec<Role>,
}

impl PrincipalContext {
    pub fn new(user_id: UserId, username: String, roles: Vec<Role>) -> Self {
        Self {
            user_id,
            username,
            roles,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// The identity recorded on reviews this user writes.
    pub fn reviewer(&self) -> Reviewer {
        Reviewer {
            user_id: self.user_id,
            name: self.username.clone(),
        }
    }

    pub fn principal(&self) -> Principal {
        Principal::from_roles(self.user_id, self.roles.clone())
    }
}

impl From<JwtClaims> for PrincipalContext {
    fn from(claims: JwtClaims) -> Self {
        Self::new(claims.sub, claims.username, claims.roles)
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for PrincipalContext {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<PrincipalContext>()
            .cloned()
            .ok_or_else(|| errors::domain_error_to_response(DomainError::Unauthorized))
    }
}
