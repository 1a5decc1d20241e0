//! Email notification channel using SMTP.
//!
//! Port 465 uses implicit TLS; any other port upgrades with STARTTLS when the
//! server offers it.

use std::fmt;
use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::{info, warn};

use super::DispatchResult;
use crate::notification::formatter::RenderedMessage;
use crate::utils::http_client::install_rustls_provider;

const CHANNEL: &str = "email";

/// Port for SMTP over implicit TLS.
const SMTPS_PORT: u16 = 465;

/// Email channel configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    /// Sender address.
    pub from: String,
    /// Recipient address; several may be separated by commas.
    pub to: String,
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

/// Build the plain-text message: subject is the title, body the long message.
pub(super) fn build_message(
    config: &EmailConfig,
    message: &RenderedMessage,
) -> Result<Message, String> {
    let from: Mailbox = config
        .from
        .parse()
        .map_err(|e| format!("invalid from address '{}': {e}", config.from))?;

    let mut builder = Message::builder()
        .from(from)
        .subject(message.title.clone())
        .header(ContentType::TEXT_PLAIN);

    let mut recipients = 0;
    for to in config.to.split(',').map(str::trim).filter(|to| !to.is_empty()) {
        let mailbox: Mailbox = to
            .parse()
            .map_err(|e| format!("invalid to address '{to}': {e}"))?;
        builder = builder.to(mailbox);
        recipients += 1;
    }
    if recipients == 0 {
        return Err("no recipient address".to_string());
    }

    builder
        .body(message.long.clone())
        .map_err(|e| format!("failed to build message: {e}"))
}

fn build_transport(
    config: &EmailConfig,
    timeout: Duration,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, String> {
    install_rustls_provider();

    let credentials = Credentials::new(config.username.clone(), config.password.clone());
    let builder = if config.smtp_port == SMTPS_PORT {
        AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| format!("invalid SMTP host: {e}"))?
    } else {
        let tls = TlsParameters::new(config.smtp_host.clone())
            .map_err(|e| format!("invalid SMTP host: {e}"))?;
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
            .tls(Tls::Opportunistic(tls))
    };

    Ok(builder
        .port(config.smtp_port)
        .credentials(credentials)
        .timeout(Some(timeout))
        .build())
}

pub(super) async fn send(
    config: &EmailConfig,
    message: &RenderedMessage,
    timeout: Duration,
) -> DispatchResult {
    let email = match build_message(config, message) {
        Ok(email) => email,
        Err(e) => {
            warn!(channel = CHANNEL, error = %e, "Email not sent");
            return DispatchResult::failed(CHANNEL, None, e);
        }
    };

    let transport = match build_transport(config, timeout) {
        Ok(transport) => transport,
        Err(e) => {
            warn!(channel = CHANNEL, error = %e, "Email not sent");
            return DispatchResult::failed(CHANNEL, None, e);
        }
    };

    match transport.send(email).await {
        Ok(response) => {
            let code = response.code().to_string().parse::<u16>().ok();
            info!(channel = CHANNEL, host = %config.smtp_host, "Email sent");
            DispatchResult::delivered(CHANNEL, code)
        }
        Err(e) => {
            warn!(channel = CHANNEL, host = %config.smtp_host, error = %e, "Email delivery failed");
            DispatchResult::failed(CHANNEL, None, format!("SMTP error: {e}"))
        }
    }
}
