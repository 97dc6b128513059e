//! `storefront-auth`: authentication and authorization boundary.
//!
//! Decodes HS256 bearer tokens into claims and checks permissions. Knows
//! nothing about HTTP or storage.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod rbac;

pub use authorize::{AuthzError, Principal, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtError, JwtValidator};
pub use rbac::{Permission, Role, permissions_for_roles};
