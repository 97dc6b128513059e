//! Catalog domain module.
//!
//! Business rules for products, their reviews and categories, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage). Stores
//! call into this crate to validate and evolve documents; they never decide
//! business rules themselves.

pub mod category;
pub mod product;
pub mod query;
pub mod validation;

pub use category::Category;
pub use product::{Product, ProductDraft, ProductMutation, Review, Reviewer, check_rating};
pub use query::{
    DEFAULT_PAGE_SIZE, Page, PageRequest, ProductFilter, ProductSort, SHOWCASE_LIMIT,
};
pub use validation::{ProductField, Validation, validate};
