//! Listing criteria: pagination, showcase sorts and the product filter.
//!
//! These are plain values. Each store translates them into its own query
//! language; [`ProductFilter::matches`] is the reference semantics.

use core::cmp::Ordering;

use storefront_core::{CategoryId, DomainError, DomainResult};

use crate::product::Product;

/// Page size used when the client does not send a usable one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Cap for the "top rated" and "new arrivals" listings.
pub const SHOWCASE_LIMIT: usize = 16;

/// 1-indexed page request.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Zero values fall back to the defaults.
    pub fn new(page: u32, limit: u32) -> Self {
        let defaults = Self::default();
        Self {
            page: if page == 0 { defaults.page } else { page },
            limit: if limit == 0 { defaults.limit } else { limit },
        }
    }

    /// Build from raw query-string values; anything unparsable or < 1 falls
    /// back to the defaults.
    pub fn from_query(page: Option<&str>, limit: Option<&str>) -> Self {
        let parse = |raw: Option<&str>| {
            raw.and_then(|s| s.trim().parse::<u32>().ok())
                .unwrap_or(0)
        };
        Self::new(parse(page), parse(limit))
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of records preceding this page.
    pub fn skip(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    /// `ceil(count / limit)`.
    pub fn pages_for(&self, count: u64) -> u64 {
        count.div_ceil(u64::from(self.limit))
    }
}

/// One page of results plus the totals clients need to paginate.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub count: u64,
    pub page: u32,
    pub pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, count: u64, request: PageRequest) -> Self {
        Self {
            items,
            count,
            page: request.page(),
            pages: request.pages_for(count),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            count: self.count,
            page: self.page,
            pages: self.pages,
        }
    }
}

/// Sort orders used by the showcase listings.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProductSort {
    /// Highest rating first.
    TopRated,
    /// Most recently created first.
    Newest,
}

impl ProductSort {
    pub fn compare(self, a: &Product, b: &Product) -> Ordering {
        match self {
            ProductSort::TopRated => b.rating().total_cmp(&a.rating()),
            ProductSort::Newest => b.created_at().cmp(&a.created_at()),
        }
    }
}

/// Filter criteria for the filtered product listing.
///
/// `None` means "no constraint" for that field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    /// Product category must be one of these.
    pub categories: Option<Vec<CategoryId>>,
    /// Product brand must equal, or case-insensitively contain, one of these.
    pub brands: Option<Vec<String>>,
    /// Inclusive price ceiling.
    pub max_price: Option<f64>,
}

impl ProductFilter {
    /// Build from raw query-string values (`category`, `brand`, `price`).
    ///
    /// `category` and `brand` accept comma-separated lists.
    pub fn from_query(
        category: Option<&str>,
        brand: Option<&str>,
        price: Option<&str>,
    ) -> DomainResult<Self> {
        let categories = match category {
            Some(raw) => Some(parse_categories(raw)?).filter(|c| !c.is_empty()),
            None => None,
        };

        let brands = brand
            .map(|raw| split_list(raw).map(decode_brand).collect::<Vec<_>>())
            .filter(|b| !b.is_empty());

        let max_price = match price.map(str::trim).filter(|p| !p.is_empty()) {
            Some(raw) => Some(
                raw.parse::<f64>()
                    .ok()
                    .filter(|p| p.is_finite())
                    .ok_or_else(|| DomainError::validation("price must be a number"))?,
            ),
            None => None,
        };

        Ok(Self {
            categories,
            brands,
            max_price,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_none() && self.brands.is_none() && self.max_price.is_none()
    }

    pub fn matches(&self, product: &Product) -> bool {
        let category_ok = self
            .categories
            .as_ref()
            .is_none_or(|set| set.contains(&product.category()));
        let brand_ok = self
            .brands
            .as_ref()
            .is_none_or(|wanted| wanted.iter().any(|b| brand_matches(product.brand(), b)));
        let price_ok = self.max_price.is_none_or(|max| product.price() <= max);

        category_ok && brand_ok && price_ok
    }
}

/// Split a comma-separated query value, dropping blank entries.
pub fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Parse a comma-separated list of category ids.
pub fn parse_categories(raw: &str) -> DomainResult<Vec<CategoryId>> {
    split_list(raw).map(str::parse::<CategoryId>).collect()
}

/// Undo a literal `%20` left behind by double-encoded brand names.
pub fn decode_brand(raw: &str) -> String {
    raw.replace("%20", " ")
}

/// Exact match, or case-insensitive substring match of `wanted` in `brand`.
pub fn brand_matches(brand: &str, wanted: &str) -> bool {
    brand == wanted || brand.to_lowercase().contains(&wanted.to_lowercase())
}
