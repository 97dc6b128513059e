//! Infrastructure layer: document stores, file cleanup, and the catalog
//! service that sequences them.

pub mod catalog_service;
pub mod files;
pub mod store;

pub use catalog_service::{
    CatalogError, CatalogResult, CatalogService, ProductView, ReviewReceipt, TopSeller,
};
pub use files::{FsImageRemover, ImageRemover};
pub use store::{
    CategoryStore, DocumentStore, InMemoryDocumentStore, OrderStore, PostgresDocumentStore,
    ProductStore, StoreError, StoreResult, UserDirectory, UserSummary,
};
