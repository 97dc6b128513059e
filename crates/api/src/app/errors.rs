use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use storefront_core::DomainError;
use storefront_infra::CatalogError;

pub fn catalog_error_to_response(err: CatalogError) -> axum::response::Response {
    match err {
        CatalogError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        CatalogError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        e @ CatalogError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", e.to_string()),
        CatalogError::Conflict(msg) => json_error(StatusCode::BAD_REQUEST, "conflict", msg),
        CatalogError::Unauthorized => {
            json_error(StatusCode::UNAUTHORIZED, "unauthorized", "authentication required")
        }
        CatalogError::Store(msg) => {
            tracing::error!(error = %msg, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "internal store error")
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    catalog_error_to_response(err.into())
}

pub fn body_rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
