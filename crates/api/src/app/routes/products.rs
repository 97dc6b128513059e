use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};
use serde_json::Value;

use storefront_auth::Permission;
use storefront_catalog::{PageRequest, ProductFilter, query::parse_categories};
use storefront_core::{CategoryId, DomainError, ProductId};

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::authz::require_permission;
use crate::context::PrincipalContext;

type Response = axum::response::Response;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_product).get(list_products))
        .route("/top", get(top_products))
        .route("/new", get(new_products))
        .route("/filter", get(filter_products))
        .route("/brands", get(brands_by_category))
        .route("/top-sellers", get(top_sellers))
        .route("/category/:id", get(products_by_category))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/:id/reviews", post(add_review))
}

fn parse_product_id(raw: &str) -> Result<ProductId, Response> {
    raw.parse().map_err(errors::domain_error_to_response)
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
    body: Result<Json<dto::ProductRequest>, JsonRejection>,
) -> Response {
    if let Err(denied) = require_permission(&principal, &Permission::PRODUCTS_WRITE) {
        return denied;
    }
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::body_rejection_to_response(rejection),
    };

    match services.catalog().create_product(body.into()).await {
        Ok(product) => dto::envelope(
            StatusCode::CREATED,
            "Product Created Successfully",
            dto::product_to_json(&product),
        ),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Query(q): Query<dto::PageQuery>,
) -> Response {
    let request = PageRequest::from_query(q.page.as_deref(), q.limit.as_deref());
    match services.catalog().list_products(request).await {
        Ok(page) => dto::page_envelope("Products Found", page),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn top_products(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match services.catalog().top_products().await {
        Ok(views) => dto::envelope(
            StatusCode::OK,
            "Top Products Found",
            Value::Array(views.iter().map(dto::product_view_to_json).collect()),
        ),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn new_products(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match services.catalog().new_products().await {
        Ok(views) => dto::envelope(
            StatusCode::OK,
            "New Products Found",
            Value::Array(views.iter().map(dto::product_view_to_json).collect()),
        ),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn filter_products(
    Extension(services): Extension<Arc<AppServices>>,
    Query(q): Query<dto::FilterQuery>,
) -> Response {
    let filter = match ProductFilter::from_query(
        q.category.as_deref(),
        q.brand.as_deref(),
        q.price.as_deref(),
    ) {
        Ok(f) => f,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.catalog().filter_products(&filter).await {
        Ok(views) => dto::envelope(
            StatusCode::OK,
            "Products Found",
            Value::Array(views.iter().map(dto::product_view_to_json).collect()),
        ),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn brands_by_category(
    Extension(services): Extension<Arc<AppServices>>,
    Query(q): Query<dto::BrandsQuery>,
) -> Response {
    let categories = match q
        .category
        .as_deref()
        .map(parse_categories)
        .transpose()
        .and_then(|c| {
            c.filter(|c| !c.is_empty())
                .ok_or_else(|| DomainError::validation("category is required"))
        }) {
        Ok(c) => c,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.catalog().brands_by_category(&categories).await {
        Ok(brands) => dto::envelope(StatusCode::OK, "Brands Found", serde_json::json!(brands)),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn top_sellers(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match services.catalog().top_sellers().await {
        Ok(sellers) => dto::envelope(
            StatusCode::OK,
            "Top Sellers Found",
            Value::Array(sellers.iter().map(dto::top_seller_to_json).collect()),
        ),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn products_by_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let category: CategoryId = match id.parse() {
        Ok(c) => c,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.catalog().products_by_category(category).await {
        Ok(products) => dto::envelope(
            StatusCode::OK,
            "Products Found",
            Value::Array(products.iter().map(dto::product_to_json).collect()),
        ),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_product_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services.catalog().get_product(id).await {
        Ok(view) => dto::envelope(StatusCode::OK, "Product Found", dto::product_view_to_json(&view)),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
    Path(id): Path<String>,
    body: Result<Json<dto::ProductRequest>, JsonRejection>,
) -> Response {
    if let Err(denied) = require_permission(&principal, &Permission::PRODUCTS_WRITE) {
        return denied;
    }
    let id = match parse_product_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::body_rejection_to_response(rejection),
    };

    match services.catalog().update_product(id, body.into()).await {
        Ok(product) => dto::envelope(
            StatusCode::OK,
            "Product Updated Successfully",
            dto::product_to_json(&product),
        ),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
    Path(id): Path<String>,
) -> Response {
    if let Err(denied) = require_permission(&principal, &Permission::PRODUCTS_WRITE) {
        return denied;
    }
    let id = match parse_product_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services.catalog().delete_product(id).await {
        Ok(product) => dto::envelope(
            StatusCode::OK,
            "Product Deleted Successfully",
            dto::product_to_json(&product),
        ),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn add_review(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
    Path(id): Path<String>,
    body: Result<Json<dto::ReviewRequest>, JsonRejection>,
) -> Response {
    let id = match parse_product_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::body_rejection_to_response(rejection),
    };
    let rating = match body.rating() {
        Ok(r) => r,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services
        .catalog()
        .add_review(id, principal.reviewer(), rating, body.comment)
        .await
    {
        Ok(receipt) => dto::envelope(
            StatusCode::CREATED,
            "Review Added Successfully",
            dto::review_receipt_to_json(&receipt),
        ),
        Err(e) => errors::catalog_error_to_response(e),
    }
}
