//! API server setup and configuration.

use axum::Router;
use axum::extract::{DefaultBodyLimit, Request};
use axum::http::HeaderMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::api::error::{ApiError, ApiResult};
use crate::api::routes;
use crate::config::DEFAULT_DEVICE;
use crate::database::repositories::EventLogRepository;
use crate::error::{Error, Result};
use crate::notification::NotificationEngine;
use crate::transport::DeliveryTransport;

/// Header carrying the shared secret for requests without a JSON body.
pub const AUTH_HEADER: &str = "X-Auth-Secret";

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Server bind address
    pub bind_address: String,
    /// Server port
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Request body size limit in bytes
    pub body_limit: usize,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 1285,
            enable_cors: true,
            body_limit: 1024 * 1024,
        }
    }
}

impl ApiServerConfig {
    /// Load API server config from environment variables, falling back to defaults.
    ///
    /// Supported env vars:
    /// - `API_BIND_ADDRESS` (e.g. "0.0.0.0")
    /// - `SMS_SEND_PORT` (e.g. "1285")
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(bind_address) = lookup("API_BIND_ADDRESS")
            && !bind_address.trim().is_empty()
        {
            config.bind_address = bind_address.trim().to_string();
        }

        if let Some(port) = lookup("SMS_SEND_PORT")
            && let Ok(parsed) = port.trim().parse::<u16>()
        {
            config.port = parsed;
        }

        config
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Server start time for uptime calculation
    pub start_time: Instant,
    /// Rule evaluation and forwarding for inbound events
    pub engine: Arc<NotificationEngine>,
    /// Outbound SMS through the gateway
    pub transport: DeliveryTransport,
    /// SMS and call history; history endpoints answer 503 without it
    pub event_log: Option<Arc<dyn EventLogRepository>>,
    /// Shared secret; `None` accepts every request
    pub forward_secret: Option<Arc<str>>,
    /// Device used when a send request names none
    pub default_device: String,
    /// Log raw request bodies
    pub debug: bool,
    /// Browser console assets; not served when `None`
    pub console_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(engine: Arc<NotificationEngine>, transport: DeliveryTransport) -> Self {
        Self {
            start_time: Instant::now(),
            engine,
            transport,
            event_log: None,
            forward_secret: None,
            default_device: DEFAULT_DEVICE.to_string(),
            debug: false,
            console_dir: None,
        }
    }

    /// Set the event log repository.
    pub fn with_event_log(mut self, event_log: Arc<dyn EventLogRepository>) -> Self {
        self.event_log = Some(event_log);
        self
    }

    /// Require `secret` on API requests. An empty secret disables the check.
    pub fn with_secret(mut self, secret: Option<&str>) -> Self {
        self.forward_secret = secret.filter(|s| !s.is_empty()).map(Arc::from);
        self
    }

    pub fn with_default_device(mut self, device: impl Into<String>) -> Self {
        self.default_device = device.into();
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Serve the browser console from `dir`.
    pub fn with_console_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.console_dir = Some(dir.into());
        self
    }

    /// Accept the request if the secret in the body or in the
    /// `X-Auth-Secret` header matches.
    pub fn authorize(&self, body_secret: Option<&str>, headers: &HeaderMap) -> ApiResult<()> {
        let Some(expected) = self.forward_secret.as_deref() else {
            return Ok(());
        };

        let header_secret = headers
            .get(AUTH_HEADER)
            .and_then(|value| value.to_str().ok());

        if body_secret == Some(expected) || header_secret == Some(expected) {
            Ok(())
        } else {
            tracing::warn!("Rejected request with invalid secret");
            Err(ApiError::unauthorized("authentication failed"))
        }
    }

    pub(crate) fn event_log(&self) -> ApiResult<&Arc<dyn EventLogRepository>> {
        self.event_log
            .as_ref()
            .ok_or_else(|| ApiError::service_unavailable("Message history not available"))
    }
}

/// API server.
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
    cancel_token: CancellationToken,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig, state: AppState) -> Self {
        Self {
            config,
            state,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Get the cancellation token for graceful shutdown.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Build the router with all middleware and routes.
    pub fn build_router(&self) -> Router {
        let mut router = routes::create_router(self.state.clone())
            .layer(DefaultBodyLimit::max(self.config.body_limit));

        if self.config.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            router = router.layer(cors);
        }

        router.layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request| {
                    if req.uri().path().starts_with("/api/v1/health") {
                        Span::none()
                    } else {
                        let mut make_span =
                            tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO);
                        use tower_http::trace::MakeSpan;
                        make_span.make_span(req)
                    }
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        if span.is_disabled() {
                            return;
                        }
                        let on_response =
                            tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO);
                        use tower_http::trace::OnResponse;
                        on_response.on_response(res, latency, span);
                    },
                ),
        )
    }

    /// Start the server and run until shut down.
    pub async fn run(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.bind_address, self.config.port)
            .parse()
            .map_err(|e| Error::config(format!("Invalid address: {}", e)))?;

        let router = self.build_router();
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("API server listening on http://{}", addr);

        let cancel_token = self.cancel_token.clone();

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                tracing::info!("API server shutting down...");
            })
            .await?;

        Ok(())
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    use crate::domain::RuleSet;
    use crate::notification::channels::{DispatcherSettings, HttpChannelDispatcher};
    use crate::notification::EventFormatter;
    use crate::transport::GatewayCommandConfig;

    fn state() -> AppState {
        let dispatcher = HttpChannelDispatcher::new(DispatcherSettings::default()).unwrap();
        let engine = NotificationEngine::new(
            Arc::new(RuleSet::default()),
            EventFormatter::new(chrono_tz::Asia::Shanghai),
            Arc::new(dispatcher),
        );
        AppState::new(
            Arc::new(engine),
            DeliveryTransport::from_config(&GatewayCommandConfig::shell("cat")),
        )
    }

    #[test]
    fn test_config_defaults() {
        let config = ApiServerConfig::default();
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.port, 1285);
        assert!(config.enable_cors);
    }

    #[test]
    fn test_config_from_env() {
        let config = ApiServerConfig::from_lookup(|name| match name {
            "SMS_SEND_PORT" => Some("8080".to_string()),
            "API_BIND_ADDRESS" => Some("127.0.0.1".to_string()),
            _ => None,
        });
        assert_eq!(config.port, 8080);
        assert_eq!(config.bind_address, "127.0.0.1");

        let config = ApiServerConfig::from_lookup(|name| match name {
            "SMS_SEND_PORT" => Some("not-a-port".to_string()),
            _ => None,
        });
        assert_eq!(config.port, 1285);
    }

    #[test]
    fn test_authorize_without_secret_accepts_everything() {
        let state = state();
        assert!(state.authorize(None, &HeaderMap::new()).is_ok());
        assert!(state.with_secret(Some("")).authorize(None, &HeaderMap::new()).is_ok());
    }

    #[test]
    fn test_authorize_body_or_header() {
        let state = state().with_secret(Some("s3cret"));

        assert!(state.authorize(Some("s3cret"), &HeaderMap::new()).is_ok());

        let mut headers = HeaderMap::new();
        headers.insert(AUTH_HEADER, HeaderValue::from_static("s3cret"));
        assert!(state.authorize(None, &headers).is_ok());

        let err = state.authorize(Some("wrong"), &HeaderMap::new()).unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::UNAUTHORIZED);
        assert_eq!(err.message, "authentication failed");
    }

    #[test]
    fn test_server_creation() {
        let server = ApiServer::new(ApiServerConfig::default(), state());
        assert!(!server.cancel_token().is_cancelled());
        server.shutdown();
        assert!(server.cancel_token().is_cancelled());
    }
}
