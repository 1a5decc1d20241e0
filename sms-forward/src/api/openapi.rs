//! OpenAPI documentation configuration.
//!
//! Generated with `utoipa` and served through Swagger UI at `/api/docs`.

use utoipa::OpenApi;

use crate::api::models::{
    CallReceiveRequest, ConversationResponse, ForwardSummary, HealthResponse, SendSmsRequest,
    SendSmsResponse, SmsMessageResponse, SmsReceiveRequest, ValidateSecretRequest,
};
use crate::api::server::AUTH_HEADER;

/// OpenAPI documentation for the sms-forward API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "sms-forward API",
        description = "Receives SMS and call events from the telephony gateway, forwards them to notification channels and sends SMS through the gateway."
    ),
    tags(
        (name = "sms", description = "Inbound SMS forwarding, outbound SMS and message history"),
        (name = "call", description = "Inbound call forwarding"),
        (name = "auth", description = "Shared secret validation"),
        (name = "health", description = "Liveness")
    ),
    paths(
        crate::api::routes::sms::receive_sms,
        crate::api::routes::sms::send_sms,
        crate::api::routes::sms::list_conversations,
        crate::api::routes::sms::get_conversation,
        crate::api::routes::call::receive_call,
        crate::api::routes::auth::validate_header,
        crate::api::routes::auth::validate_body,
        crate::api::routes::health::health_check,
    ),
    components(
        schemas(
            SmsReceiveRequest,
            CallReceiveRequest,
            ForwardSummary,
            SendSmsRequest,
            SendSmsResponse,
            ValidateSecretRequest,
            ConversationResponse,
            SmsMessageResponse,
            HealthResponse,
            crate::api::error::ApiErrorResponse,
            crate::notification::SmsEvent,
            crate::notification::CallEvent,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Security scheme for the shared secret header.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "auth_secret",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new(AUTH_HEADER),
                    ),
                ),
            );
        }
    }
}
