//! Sales domain module.
//!
//! Orders are owned by the checkout flow; this crate only models them and
//! derives reporting from them. Deterministic logic only (no IO, no HTTP, no
//! storage).

pub mod analytics;
pub mod order;

pub use analytics::{ProductSales, Quarter, QuarterlySales, TOP_SELLERS_LIMIT, quarterly_top_sellers};
pub use order::{Order, OrderLine};
