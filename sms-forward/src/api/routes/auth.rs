//! Secret validation for the web client.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::get,
};

use super::parse_body;
use crate::api::error::ApiResult;
use crate::api::models::{ApiResponse, ValidateSecretRequest};
use crate::api::server::AppState;

/// Create the auth router.
pub fn router() -> Router<AppState> {
    Router::new().route("/validate", get(validate_header).post(validate_body))
}

/// Check the `X-Auth-Secret` header.
#[utoipa::path(
    get,
    path = "/api/v1/auth/validate",
    tag = "auth",
    responses(
        (status = 200, description = "Secret accepted"),
        (status = 401, description = "Invalid secret", body = crate::api::error::ApiErrorResponse)
    ),
    security(("auth_secret" = []))
)]
pub async fn validate_header(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<ApiResponse<()>>> {
    state.authorize(None, &headers)?;
    Ok(Json(ApiResponse::ok("secret valid")))
}

/// Check a secret sent as `{"secret": "..."}`.
#[utoipa::path(
    post,
    path = "/api/v1/auth/validate",
    tag = "auth",
    request_body = ValidateSecretRequest,
    responses(
        (status = 200, description = "Secret accepted"),
        (status = 401, description = "Invalid secret", body = crate::api::error::ApiErrorResponse)
    )
)]
pub async fn validate_body(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<ApiResponse<()>>> {
    let request: ValidateSecretRequest = if body.is_empty() {
        ValidateSecretRequest::default()
    } else {
        parse_body(&state, "/auth/validate", &body)?
    };
    state.authorize(request.secret.as_deref(), &headers)?;
    Ok(Json(ApiResponse::ok("secret valid")))
}
