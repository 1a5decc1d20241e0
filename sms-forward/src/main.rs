use std::sync::Arc;

use sms_forward::api::{ApiServer, ApiServerConfig, AppState};
use sms_forward::config::{AppConfig, load_rule_set};
use sms_forward::database::{self, repositories::SqlxEventLogRepository};
use sms_forward::logging::{LogFormat, init_logging};
use sms_forward::notification::{EventFormatter, HttpChannelDispatcher, NotificationEngine};
use sms_forward::transport::DeliveryTransport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_logging(LogFormat::from_env())?;

    let config = AppConfig::from_env_or_default();
    tracing::debug!(?config, "Configuration loaded");

    let pool = database::init_pool(&config.database_url).await?;
    database::run_migrations(&pool).await?;

    let (rules, report) = load_rule_set(&config.rules_path).await?;
    if rules.is_empty() {
        tracing::warn!(
            path = %config.rules_path.display(),
            rejected = report.rejected.len(),
            "No forwarding rules loaded; inbound events will only be recorded"
        );
    }

    let dispatcher = HttpChannelDispatcher::new(config.dispatcher_settings())?;
    let engine = NotificationEngine::new(
        Arc::new(rules),
        EventFormatter::new(config.timezone),
        Arc::new(dispatcher),
    );
    let transport = DeliveryTransport::from_config(&config.gateway);

    let mut state = AppState::new(Arc::new(engine), transport)
        .with_event_log(Arc::new(SqlxEventLogRepository::new(pool.clone())))
        .with_secret(config.forward_secret.as_deref())
        .with_default_device(config.default_device.clone())
        .with_debug(config.debug);

    match &config.console_dir {
        Some(dir) if dir.is_dir() => state = state.with_console_dir(dir),
        Some(dir) => tracing::warn!(
            path = %dir.display(),
            "Web console directory not found; console disabled"
        ),
        None => tracing::info!("Web console disabled"),
    }

    let server = ApiServer::new(ApiServerConfig::from_env_or_default(), state);

    let cancel_token = server.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            cancel_token.cancel();
        }
    });

    server.run().await?;
    pool.close().await;

    tracing::info!("sms-forward stopped");
    Ok(())
}
