use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    routing::get,
};
use serde_json::Value;

use storefront_auth::Permission;

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::authz::require_permission;
use crate::context::PrincipalContext;

type Response = axum::response::Response;

pub fn router() -> Router {
    Router::new().route("/", get(list_categories).post(create_category))
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
    body: Result<Json<dto::CategoryRequest>, JsonRejection>,
) -> Response {
    if let Err(denied) = require_permission(&principal, &Permission::CATEGORIES_WRITE) {
        return denied;
    }
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::body_rejection_to_response(rejection),
    };

    match services.catalog().create_category(&body.name).await {
        Ok(category) => dto::envelope(
            StatusCode::CREATED,
            "Category Created Successfully",
            dto::category_to_json(&category),
        ),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn list_categories(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match services.catalog().list_categories().await {
        Ok(categories) => dto::envelope(
            StatusCode::OK,
            "Categories Found",
            Value::Array(categories.iter().map(dto::category_to_json).collect()),
        ),
        Err(e) => errors::catalog_error_to_response(e),
    }
}
