//! SMS routes: inbound forwarding, outbound sending and message history.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, post},
};
use tracing::{info, warn};

use super::parse_body;
use crate::api::error::{ApiError, ApiResult};
use crate::api::models::{
    ApiResponse, ConversationQuery, ConversationResponse, ForwardSummary, SendSmsRequest,
    SendSmsResponse, SmsMessageResponse, SmsReceiveRequest,
};
use crate::api::server::AppState;
use crate::database::models::{NewSms, SmsStatus};
use crate::error::Error;
use crate::notification::InboundEvent;

/// Create the SMS router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/receive", post(receive_sms))
        .route("/send", post(send_sms))
        .route("/conversations", get(list_conversations))
        .route("/conversation/{number}", get(get_conversation))
}

/// Accept an SMS from the gateway and forward it.
///
/// Forwarding is best effort: the request succeeds even when every matched
/// channel fails.
#[utoipa::path(
    post,
    path = "/api/v1/sms/receive",
    tag = "sms",
    request_body = SmsReceiveRequest,
    responses(
        (status = 200, description = "SMS accepted", body = ApiResponse<ForwardSummary>),
        (status = 400, description = "Malformed body", body = crate::api::error::ApiErrorResponse),
        (status = 401, description = "Invalid secret", body = crate::api::error::ApiErrorResponse)
    )
)]
pub async fn receive_sms(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<ApiResponse<ForwardSummary>>> {
    let request: SmsReceiveRequest = parse_body(&state, "/sms/receive", &body)?;
    state.authorize(request.secret.as_deref(), &headers)?;

    let sms = request.sms;
    info!(
        number = %sms.number,
        time = %sms.time,
        source = %sms.source,
        sms_id = %sms.sms_id,
        phone_id = %sms.phone_id,
        "SMS received"
    );

    let row = NewSms::incoming(&sms.number, &sms.phone_id, &sms.text);
    let outcomes = state.engine.process(&InboundEvent::Sms(sms)).await;

    if let Some(event_log) = &state.event_log
        && let Err(e) = event_log.insert_sms(&row).await
    {
        warn!(number = %row.from_number, error = %e, "Failed to record incoming SMS");
    }

    Ok(Json(ApiResponse::with_data(
        "SMS received and processed",
        ForwardSummary::from(outcomes.as_slice()),
    )))
}

/// Send an SMS through the gateway.
#[utoipa::path(
    post,
    path = "/api/v1/sms/send",
    tag = "sms",
    request_body = SendSmsRequest,
    responses(
        (status = 200, description = "Handed to the gateway", body = ApiResponse<SendSmsResponse>),
        (status = 400, description = "Missing recipient or message", body = crate::api::error::ApiErrorResponse),
        (status = 401, description = "Invalid secret", body = crate::api::error::ApiErrorResponse),
        (status = 500, description = "Gateway command failed", body = crate::api::error::ApiErrorResponse)
    ),
    security(("auth_secret" = []))
)]
pub async fn send_sms(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<ApiResponse<SendSmsResponse>>> {
    let request: SendSmsRequest = parse_body(&state, "/sms/send", &body)?;
    state.authorize(request.secret.as_deref(), &headers)?;

    if request.recipient.trim().is_empty() || request.message.is_empty() {
        return Err(ApiError::bad_request(
            "Missing required fields: recipient and message",
        ));
    }

    let device = request
        .device
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(&state.default_device)
        .to_string();
    let recipient = request.recipient.trim().to_string();

    let result = state
        .transport
        .send_sms(&device, &recipient, &request.message)
        .await;

    if let Some(event_log) = &state.event_log {
        let status = if result.is_ok() {
            SmsStatus::Sent
        } else {
            SmsStatus::Failed
        };
        let row = NewSms::outgoing(&device, &recipient, &request.message, status);
        if let Err(e) = event_log.insert_sms(&row).await {
            warn!(recipient = %recipient, error = %e, "Failed to record outgoing SMS");
        }
    }

    match result {
        Ok(output) => Ok(Json(ApiResponse::with_data(
            format!("SMS sent: {}", output.trim()),
            SendSmsResponse {
                device,
                recipient,
                output,
            },
        ))),
        Err(e) => Err(Error::from(e).into()),
    }
}

/// List conversations, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/sms/conversations",
    tag = "sms",
    params(ConversationQuery),
    responses(
        (status = 200, description = "Latest message per counterparty", body = ApiResponse<Vec<ConversationResponse>>),
        (status = 401, description = "Invalid secret", body = crate::api::error::ApiErrorResponse)
    ),
    security(("auth_secret" = []))
)]
pub async fn list_conversations(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ConversationQuery>,
) -> ApiResult<Json<ApiResponse<Vec<ConversationResponse>>>> {
    state.authorize(None, &headers)?;

    let conversations = state
        .event_log()?
        .list_conversations(query.page(), query.limit())
        .await
        .map_err(ApiError::from)?;

    Ok(Json(ApiResponse::with_data(
        "ok",
        conversations.into_iter().map(Into::into).collect(),
    )))
}

/// Messages exchanged with one number, oldest first.
#[utoipa::path(
    get,
    path = "/api/v1/sms/conversation/{number}",
    tag = "sms",
    params(("number" = String, Path, description = "Counterparty phone number")),
    responses(
        (status = 200, description = "Message history", body = ApiResponse<Vec<SmsMessageResponse>>),
        (status = 401, description = "Invalid secret", body = crate::api::error::ApiErrorResponse)
    ),
    security(("auth_secret" = []))
)]
pub async fn get_conversation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(number): Path<String>,
) -> ApiResult<Json<ApiResponse<Vec<SmsMessageResponse>>>> {
    state.authorize(None, &headers)?;

    let messages = state
        .event_log()?
        .conversation(&number)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(ApiResponse::with_data(
        "ok",
        messages.into_iter().map(Into::into).collect(),
    )))
}
