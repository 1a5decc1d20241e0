//! Call notification route.

use axum::{Json, Router, body::Bytes, extract::State, http::HeaderMap, routing::post};
use tracing::{info, warn};

use super::parse_body;
use crate::api::error::ApiResult;
use crate::api::models::{ApiResponse, CallReceiveRequest, ForwardSummary};
use crate::api::server::AppState;
use crate::database::models::NewCall;
use crate::notification::InboundEvent;

/// Create the call router.
pub fn router() -> Router<AppState> {
    Router::new().route("/receive", post(receive_call))
}

/// Accept a call notification from the gateway and forward it.
///
/// Call rules are matched against the number, contact name and call type.
#[utoipa::path(
    post,
    path = "/api/v1/call/receive",
    tag = "call",
    request_body = CallReceiveRequest,
    responses(
        (status = 200, description = "Call accepted", body = ApiResponse<ForwardSummary>),
        (status = 400, description = "Malformed body", body = crate::api::error::ApiErrorResponse),
        (status = 401, description = "Invalid secret", body = crate::api::error::ApiErrorResponse)
    )
)]
pub async fn receive_call(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<ApiResponse<ForwardSummary>>> {
    let request: CallReceiveRequest = parse_body(&state, "/call/receive", &body)?;
    state.authorize(request.secret.as_deref(), &headers)?;

    let call = request.call;
    info!(
        number = %call.number,
        name = %call.name,
        time = %call.time,
        call_type = %call.call_type,
        duration = call.duration,
        phone_id = %call.phone_id,
        "Call received"
    );

    let row = NewCall::from(&call);
    let outcomes = state.engine.process(&InboundEvent::Call(call)).await;

    if let Some(event_log) = &state.event_log
        && let Err(e) = event_log.insert_call(&row).await
    {
        warn!(number = %row.phone_number, error = %e, "Failed to record call");
    }

    Ok(Json(ApiResponse::with_data(
        "Call received and processed",
        ForwardSummary::from(outcomes.as_slice()),
    )))
}
