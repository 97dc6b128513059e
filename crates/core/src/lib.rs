//! `storefront-core`: shared domain building blocks.
//!
//! Identifiers, the entity marker trait and the error taxonomy every other
//! crate reports through. No IO lives here.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::{Entity, find_by_id};
pub use error::{DomainError, DomainResult};
pub use id::{CategoryId, OrderId, ProductId, UserId};
