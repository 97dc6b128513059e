//! Document store abstraction.
//!
//! One trait per collection, composed into [`DocumentStore`]. The traits are
//! object-safe so the API can hold an `Arc<dyn DocumentStore>` and pick the
//! backend at startup.
//!
//! ## Atomicity
//!
//! [`ProductStore::modify_product`] is the only read-modify-write path. Each
//! backend runs the whole [`ProductMutation`] under its per-document lock, so
//! concurrent reviews or patches never interleave on the same product.

pub mod in_memory;
pub mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use storefront_catalog::{Category, Product, ProductFilter, ProductMutation, ProductSort};
use storefront_core::{CategoryId, DomainError, ProductId, UserId};
use storefront_sales::{Order, ProductSales};

pub use in_memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The mutation itself was rejected by a domain rule.
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("document serialization error: {0}")]
    Serialization(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// What the catalog knows about a user: enough to populate a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn insert_product(&self, product: Product) -> StoreResult<()>;

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>>;

    /// Apply `mutation` to one product atomically and return the result.
    ///
    /// Fails with `Domain(NotFound)` when the product does not exist and with
    /// `Domain(_)` when the mutation is rejected; nothing is written then.
    async fn modify_product(&self, id: ProductId, mutation: ProductMutation)
        -> StoreResult<Product>;

    /// Remove a product, returning it if it existed.
    async fn delete_product(&self, id: ProductId) -> StoreResult<Option<Product>>;

    async fn count_products(&self) -> StoreResult<u64>;

    /// Insertion-ordered slice of all products.
    async fn list_products(&self, skip: u64, limit: u32) -> StoreResult<Vec<Product>>;

    /// Every product matching `filter`, insertion-ordered.
    async fn find_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>>;

    /// First `limit` products under `sort`; ties keep insertion order.
    async fn sorted_products(&self, sort: ProductSort, limit: usize) -> StoreResult<Vec<Product>>;

    async fn products_in_category(&self, category: CategoryId) -> StoreResult<Vec<Product>>;

    /// Distinct brands of products in any of `categories`, sorted ascending.
    async fn distinct_brands(&self, categories: &[CategoryId]) -> StoreResult<Vec<String>>;
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// Fails with `Domain(Conflict)` if the name is taken (ignoring case).
    async fn insert_category(&self, category: Category) -> StoreResult<()>;

    async fn get_categories(&self, ids: &[CategoryId]) -> StoreResult<Vec<Category>>;

    /// All categories sorted by name.
    async fn list_categories(&self) -> StoreResult<Vec<Category>>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn upsert_user(&self, user: UserSummary) -> StoreResult<()>;

    /// Known users among `ids`. Unknown ids are skipped.
    async fn find_users(&self, ids: &[UserId]) -> StoreResult<Vec<UserSummary>>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert_order(&self, order: Order) -> StoreResult<()>;

    /// Quarterly top-sellers over paid orders, at most `limit` products.
    async fn top_sellers(&self, limit: usize) -> StoreResult<Vec<ProductSales>>;
}

/// Everything the catalog needs from a backend.
pub trait DocumentStore: ProductStore + CategoryStore + UserDirectory + OrderStore {}

impl<T> DocumentStore for T where T: ProductStore + CategoryStore + UserDirectory + OrderStore + ?Sized {}
