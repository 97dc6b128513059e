//! Sales reporting over paid orders.
//!
//! The pipeline mirrors the stages a document store would run:
//! match paid, unwind lines, group by (product, year, quarter), regroup by
//! product, sort, limit. Stores with a native aggregation engine may push
//! the same stages down; they must produce the same output.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, ProductId};

use crate::order::Order;

/// Number of products the top-sellers report keeps.
pub const TOP_SELLERS_LIMIT: usize = 4;

/// Calendar quarter. Serialized as its number (1-4).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    /// Months 1-3 are Q1, 4-6 Q2, 7-9 Q3, everything later Q4.
    pub fn from_month(month: u32) -> Self {
        match month {
            0..=3 => Quarter::Q1,
            4..=6 => Quarter::Q2,
            7..=9 => Quarter::Q3,
            _ => Quarter::Q4,
        }
    }

    /// Calendar year and quarter of a UTC timestamp.
    pub fn of(at: DateTime<Utc>) -> (i32, Quarter) {
        (at.year(), Quarter::from_month(at.month()))
    }

    pub fn number(self) -> u8 {
        match self {
            Quarter::Q1 => 1,
            Quarter::Q2 => 2,
            Quarter::Q3 => 3,
            Quarter::Q4 => 4,
        }
    }
}

impl From<Quarter> for u8 {
    fn from(q: Quarter) -> Self {
        q.number()
    }
}

impl TryFrom<u8> for Quarter {
    type Error = DomainError;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            1 => Ok(Quarter::Q1),
            2 => Ok(Quarter::Q2),
            3 => Ok(Quarter::Q3),
            4 => Ok(Quarter::Q4),
            other => Err(DomainError::validation(format!("quarter out of range: {other}"))),
        }
    }
}

impl core::fmt::Display for Quarter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Q{}", self.number())
    }
}

/// Units of one product sold in one quarter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarterlySales {
    pub quarter: Quarter,
    pub year: i32,
    pub total_sales: u64,
}

/// Per-product sales history, chronological.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSales {
    pub product_id: ProductId,
    /// Name recorded on the first order line seen for the product.
    pub line_name: String,
    pub sales_data: Vec<QuarterlySales>,
    pub total_sales_overall: u64,
}

/// Rank products by units sold across paid orders.
///
/// Sorted by overall units descending; equal totals are ordered by product
/// id ascending. At most `limit` products are returned.
pub fn quarterly_top_sellers<'a>(
    orders: impl IntoIterator<Item = &'a Order>,
    limit: usize,
) -> Vec<ProductSales> {
    let mut per_quarter: BTreeMap<(ProductId, i32, Quarter), u64> = BTreeMap::new();
    let mut names: HashMap<ProductId, String> = HashMap::new();

    for order in orders.into_iter().filter(|o| o.is_paid()) {
        let (year, quarter) = Quarter::of(order.created_at());
        for line in order.lines() {
            *per_quarter.entry((line.product, year, quarter)).or_default() +=
                u64::from(line.quantity);
            names
                .entry(line.product)
                .or_insert_with(|| line.name.clone());
        }
    }

    // BTreeMap order is (product, year, quarter): groups are contiguous and
    // each product's periods come out chronologically.
    let mut ranked: Vec<ProductSales> = Vec::new();
    for ((product_id, year, quarter), total_sales) in per_quarter {
        let period = QuarterlySales {
            quarter,
            year,
            total_sales,
        };
        match ranked.last_mut() {
            Some(last) if last.product_id == product_id => {
                last.total_sales_overall += total_sales;
                last.sales_data.push(period);
            }
            _ => ranked.push(ProductSales {
                product_id,
                line_name: names.remove(&product_id).unwrap_or_default(),
                sales_data: vec![period],
                total_sales_overall: total_sales,
            }),
        }
    }

    ranked.sort_by(|a, b| {
        b.total_sales_overall
            .cmp(&a.total_sales_overall)
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
    ranked.truncate(limit);
    ranked
}
