use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use serde_json::{Value, json};

use storefront_catalog::{Category, Page, Product, ProductDraft, Review};
use storefront_core::{DomainError, DomainResult};
use storefront_infra::{ProductView, ReviewReceipt, TopSeller, UserSummary};

// -------------------------
// Request DTOs
// -------------------------

/// Numbers arrive as JSON numbers from API clients and as strings from
/// form-encoded frontends.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumberInput {
    Number(f64),
    Text(String),
}

impl NumberInput {
    /// Unparsable text becomes NaN so the price rule rejects it.
    pub fn to_f64(&self) -> f64 {
        match self {
            NumberInput::Number(n) => *n,
            NumberInput::Text(s) => s.trim().parse().unwrap_or(f64::NAN),
        }
    }
}

/// Upload middleware sends the stored path either bare or as a one-element
/// array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ImageInput {
    One(String),
    Many(Vec<String>),
}

impl ImageInput {
    pub fn into_path(self) -> Option<String> {
        match self {
            ImageInput::One(path) => Some(path),
            ImageInput::Many(paths) => paths.into_iter().next(),
        }
    }
}

/// Body of product create and update. Every field is optional here; the
/// catalog's rules decide what is required.
#[derive(Debug, Default, Deserialize)]
pub struct ProductRequest {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub price: Option<NumberInput>,
    pub description: Option<String>,
    pub image: Option<ImageInput>,
}

impl From<ProductRequest> for ProductDraft {
    fn from(body: ProductRequest) -> Self {
        ProductDraft {
            name: body.name,
            brand: body.brand,
            category: body.category,
            price: body.price.as_ref().map(NumberInput::to_f64),
            description: body.description,
            image: body.image.and_then(ImageInput::into_path),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub rating: Option<NumberInput>,
    #[serde(default)]
    pub comment: String,
}

impl ReviewRequest {
    /// Whole-star rating; range is checked by the catalog.
    pub fn rating(&self) -> DomainResult<i64> {
        let invalid = || DomainError::validation("rating must be between 1 and 5");
        let value = self.rating.as_ref().ok_or_else(invalid)?.to_f64();
        if !value.is_finite() || value.fract() != 0.0 {
            return Err(invalid());
        }
        Ok(value as i64)
    }
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    #[serde(default)]
    pub name: String,
}

// -------------------------
// Query DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub category: Option<String>,
    pub brand: Option<String>,
    pub price: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BrandsQuery {
    pub category: Option<String>,
}

// -------------------------
// Response envelope
// -------------------------

pub fn envelope(status: StatusCode, message: &str, data: Value) -> axum::response::Response {
    (
        status,
        Json(json!({
            "success": true,
            "message": message,
            "data": data,
        })),
    )
        .into_response()
}

pub fn page_envelope(message: &str, page: Page<ProductView>) -> axum::response::Response {
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": message,
            "data": page.items.iter().map(product_view_to_json).collect::<Vec<_>>(),
            "count": page.count,
            "page": page.page,
            "pages": page.pages,
        })),
    )
        .into_response()
}

// -------------------------
// JSON mapping
// -------------------------

pub fn category_to_json(category: &Category) -> Value {
    json!({
        "id": category.id_typed().to_string(),
        "name": category.name(),
        "createdAt": category.created_at(),
    })
}

fn user_to_json(user: &UserSummary) -> Value {
    json!({
        "id": user.id.to_string(),
        "username": user.username,
    })
}

fn review_to_json(review: &Review, user: Option<&UserSummary>) -> Value {
    json!({
        "name": review.name,
        "rating": review.rating,
        "comment": review.comment,
        "user": user.map(user_to_json).unwrap_or_else(|| json!(review.user.to_string())),
        "createdAt": review.created_at,
    })
}

fn product_json(product: &Product, category: Value, reviews: Vec<Value>) -> Value {
    json!({
        "id": product.id_typed().to_string(),
        "name": product.name(),
        "brand": product.brand(),
        "category": category,
        "price": product.price(),
        "description": product.description(),
        "image": product.image(),
        "reviews": reviews,
        "rating": product.rating(),
        "numReviews": product.num_reviews(),
        "createdAt": product.created_at(),
        "updatedAt": product.updated_at(),
    })
}

/// Unpopulated product: references stay as ids.
pub fn product_to_json(product: &Product) -> Value {
    let reviews = product
        .reviews()
        .iter()
        .map(|r| review_to_json(r, None))
        .collect();
    product_json(product, json!(product.category().to_string()), reviews)
}

/// Populated product: resolved references are embedded, unresolved ones
/// stay as ids.
pub fn product_view_to_json(view: &ProductView) -> Value {
    let product = &view.product;
    let category = view
        .category
        .as_ref()
        .map(category_to_json)
        .unwrap_or_else(|| json!(product.category().to_string()));
    let reviews = product
        .reviews()
        .iter()
        .enumerate()
        .map(|(i, r)| review_to_json(r, view.review_users.get(i).and_then(Option::as_ref)))
        .collect();
    product_json(product, category, reviews)
}

pub fn review_receipt_to_json(receipt: &ReviewReceipt) -> Value {
    json!({
        "productId": receipt.product_id.to_string(),
        "name": receipt.review.name,
        "rating": receipt.review.rating,
        "comment": receipt.review.comment,
        "user": receipt.review.user.to_string(),
        "createdAt": receipt.review.created_at,
    })
}

pub fn top_seller_to_json(seller: &TopSeller) -> Value {
    json!({
        "productId": seller.product_id.to_string(),
        "name": seller.name,
        "salesData": seller.sales_data.iter().map(|q| json!({
            "quarter": q.quarter.number(),
            "year": q.year,
            "totalSales": q.total_sales,
        })).collect::<Vec<_>>(),
        "totalSalesOverall": seller.total_sales_overall,
    })
}
