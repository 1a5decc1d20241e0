//! Process configuration and the forwarding rule file.
//!
//! Process settings come from environment variables (optionally loaded from
//! a `.env` file by the binary). Forwarding rules come from a YAML or JSON
//! file read once at startup.

mod env_subst;
pub mod rules;

pub use rules::{RejectedRule, RuleSetReport, load_rule_set, parse_rule_set};

use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;
use tracing::warn;

use crate::notification::channels::{DEFAULT_NOTIFY_TIMEOUT, DispatcherSettings};
use crate::transport::{DEFAULT_GATEWAY_SCRIPT, DEFAULT_GATEWAY_TIMEOUT, GatewayCommandConfig};

pub const DEFAULT_RULES_PATH: &str = "/data/config/forward.yaml";
pub const DEFAULT_DATABASE_URL: &str = "sqlite:/data/sms.db?mode=rwc";
pub const DEFAULT_DEVICE: &str = "quectel0";
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Shanghai;
/// Web console assets, relative to the working directory.
pub const DEFAULT_CONSOLE_DIR: &str = "web";

const MAX_NOTIFY_TIMEOUT_SECS: u64 = 30;

/// Application configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Shared secret for API requests. `None` disables the check.
    pub forward_secret: Option<String>,
    pub rules_path: PathBuf,
    pub database_url: String,
    /// Zone used when rendering timestamps in notifications.
    pub timezone: Tz,
    /// Device used by `/sms/send` when the request names none.
    pub default_device: String,
    pub gateway: GatewayCommandConfig,
    pub notify_timeout: Duration,
    /// Log raw request bodies.
    pub debug: bool,
    /// Directory holding the browser console. `None` disables it.
    pub console_dir: Option<PathBuf>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("forward_secret", &self.forward_secret.as_ref().map(|_| "<redacted>"))
            .field("rules_path", &self.rules_path)
            .field("database_url", &self.database_url)
            .field("timezone", &self.timezone)
            .field("default_device", &self.default_device)
            .field("gateway", &self.gateway)
            .field("notify_timeout", &self.notify_timeout)
            .field("debug", &self.debug)
            .field("console_dir", &self.console_dir)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            forward_secret: None,
            rules_path: PathBuf::from(DEFAULT_RULES_PATH),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            timezone: DEFAULT_TIMEZONE,
            default_device: DEFAULT_DEVICE.to_string(),
            gateway: GatewayCommandConfig::default(),
            notify_timeout: DEFAULT_NOTIFY_TIMEOUT,
            debug: false,
            console_dir: Some(PathBuf::from(DEFAULT_CONSOLE_DIR)),
        }
    }
}

impl AppConfig {
    /// Load config from environment variables, falling back to defaults.
    ///
    /// Supported env vars:
    /// - `FORWARD_SECRET`
    /// - `FORWARD_CONFIG` (rule file path)
    /// - `DATABASE_URL`
    /// - `FORWARD_TIMEZONE` (IANA name, e.g. "Asia/Shanghai")
    /// - `DEFAULT_DEVICE`
    /// - `GATEWAY_SCRIPT`, `GATEWAY_COMMAND_TIMEOUT_SECS`
    /// - `NOTIFY_TIMEOUT_SECS` (1..=30)
    /// - `DEBUG` ("true" or "1")
    /// - `WEB_CONSOLE_DIR` (console assets; "off" disables the console)
    ///
    /// Invalid values are ignored with a warning.
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        config.forward_secret = var("FORWARD_SECRET");

        if let Some(path) = var("FORWARD_CONFIG") {
            config.rules_path = PathBuf::from(path);
        }

        if let Some(url) = var("DATABASE_URL") {
            config.database_url = url;
        }

        if let Some(zone) = var("FORWARD_TIMEZONE") {
            match zone.parse::<Tz>() {
                Ok(tz) => config.timezone = tz,
                Err(e) => warn!(value = %zone, error = %e, "Ignoring invalid FORWARD_TIMEZONE"),
            }
        }

        if let Some(device) = var("DEFAULT_DEVICE") {
            config.default_device = device;
        }

        let script = var("GATEWAY_SCRIPT").unwrap_or_else(|| DEFAULT_GATEWAY_SCRIPT.to_string());
        let mut gateway_timeout = DEFAULT_GATEWAY_TIMEOUT;
        if let Some(secs) = var("GATEWAY_COMMAND_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(secs) if secs > 0 => gateway_timeout = Duration::from_secs(secs),
                _ => warn!(value = %secs, "Ignoring invalid GATEWAY_COMMAND_TIMEOUT_SECS"),
            }
        }
        config.gateway = GatewayCommandConfig::shell(script).with_timeout(gateway_timeout);

        if let Some(secs) = var("NOTIFY_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(secs) => {
                    config.notify_timeout =
                        Duration::from_secs(secs.clamp(1, MAX_NOTIFY_TIMEOUT_SECS));
                }
                Err(_) => warn!(value = %secs, "Ignoring invalid NOTIFY_TIMEOUT_SECS"),
            }
        }

        config.debug = var("DEBUG")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        if let Some(dir) = var("WEB_CONSOLE_DIR") {
            config.console_dir = if dir.eq_ignore_ascii_case("off") {
                None
            } else {
                Some(PathBuf::from(dir))
            };
        }

        config
    }

    /// Settings for the HTTP channel dispatcher.
    pub fn dispatcher_settings(&self) -> DispatcherSettings {
        DispatcherSettings {
            timeout: self.notify_timeout,
            ..DispatcherSettings::default()
        }
    }
}
