//! API route modules.
//!
//! Organizes routes by resource type. Everything lives under `/api/v1`.

pub mod auth;
pub mod call;
pub mod console;
pub mod health;
pub mod sms;

use axum::Router;
use axum::body::Bytes;
use serde::de::DeserializeOwned;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::error::{ApiError, ApiResult};
use crate::api::openapi::ApiDoc;
use crate::api::server::AppState;

/// Create the main API router with all routes.
///
/// The browser console is mounted at `/` when the state names a console
/// directory.
pub fn create_router(state: AppState) -> Router {
    let console_dir = state.console_dir.clone();

    let router = Router::new()
        .nest("/api/v1/sms", sms::router())
        .nest("/api/v1/call", call::router())
        .nest("/api/v1/auth", auth::router())
        .nest("/api/v1/health", health::router())
        .with_state(state)
        .merge(SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", ApiDoc::openapi()));

    match console_dir {
        Some(dir) => router.merge(console::router(&dir)),
        None => router,
    }
}

/// Decode a JSON request body, logging it first when debug is on.
///
/// Handlers read the raw body themselves so that malformed JSON answers with
/// the usual envelope and a 400.
pub(crate) fn parse_body<T: DeserializeOwned>(
    state: &AppState,
    route: &str,
    body: &Bytes,
) -> ApiResult<T> {
    if state.debug {
        tracing::info!(
            route,
            body = %String::from_utf8_lossy(body),
            "Received raw request body"
        );
    }

    serde_json::from_slice(body).map_err(|e| {
        tracing::warn!(route, error = %e, "Rejected malformed request body");
        ApiError::bad_request(format!("invalid JSON: {e}"))
    })
}
