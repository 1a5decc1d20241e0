//! Outbound SMS delivery through the telephony gateway.
//!
//! The gateway is driven by a shell command that reads the message body from
//! stdin and takes the device and recipient as positional arguments. The body
//! can be larger than a pipe buffer, so it is written by
//! [`process_utils::run_with_stdin`] on its own task while this side waits.

use std::io;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use process_utils::{StdinRun, StdinRunError, run_with_stdin, tokio_command};
use tracing::{info, warn};

/// Default gateway command timeout.
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);

/// Asterisk CLI invocation used by the chan_quectel gateway.
///
/// `$1` is the device, `$2` the recipient; the body arrives on stdin.
pub const DEFAULT_GATEWAY_SCRIPT: &str = r#"asterisk -rx "quectel sms \"$1\" \"$2\" \"$(cat)\"""#;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to start gateway command: {0}")]
    Spawn(#[source] io::Error),

    #[error("gateway command timed out after {}s", .timeout.as_secs_f32())]
    TimedOut { timeout: Duration, output: String },

    #[error("failed to write message to stdin: {source}")]
    WriteFailed {
        output: String,
        #[source]
        source: io::Error,
    },

    #[error("gateway command failed ({status}): {}", .output.trim())]
    CommandFailed { output: String, status: ExitStatus },

    #[error("failed to wait for gateway command: {0}")]
    Wait(#[source] io::Error),

    #[error("invalid SMS request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Combined output captured before the failure, if any.
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::TimedOut { output, .. }
            | Self::WriteFailed { output, .. }
            | Self::CommandFailed { output, .. } => Some(output),
            _ => None,
        }
    }
}

impl From<StdinRunError> for TransportError {
    fn from(err: StdinRunError) -> Self {
        match err {
            StdinRunError::Spawn(e) => Self::Spawn(e),
            StdinRunError::TimedOut { timeout, output } => Self::TimedOut {
                timeout,
                output: String::from_utf8_lossy(&output).into_owned(),
            },
            StdinRunError::Wait { source, .. } => Self::Wait(source),
        }
    }
}

/// Combine a finished run into the transport result.
///
/// A write failure outranks the exit status: the gateway may exit zero after
/// sending a truncated body.
fn combine(run: StdinRun) -> Result<String, TransportError> {
    let output = run.output_lossy();
    if let Err(source) = run.write {
        return Err(TransportError::WriteFailed { output, source });
    }
    if !run.status.success() {
        return Err(TransportError::CommandFailed {
            output,
            status: run.status,
        });
    }
    Ok(output)
}

/// Runs a gateway command with a body on stdin.
#[async_trait]
pub trait GatewayCommand: Send + Sync {
    /// Execute with positional `args` and `stdin` as input, returning the
    /// combined stdout/stderr on success.
    async fn execute(
        &self,
        args: &[&str],
        stdin: Vec<u8>,
        timeout: Duration,
    ) -> Result<String, TransportError>;
}

/// How the gateway command is launched.
#[derive(Debug, Clone)]
pub struct GatewayCommandConfig {
    pub program: String,
    /// Arguments placed before the per-message positional arguments.
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl Default for GatewayCommandConfig {
    fn default() -> Self {
        Self::shell(DEFAULT_GATEWAY_SCRIPT)
    }
}

impl GatewayCommandConfig {
    /// Run `script` with `sh -c`; positional arguments become `$1`, `$2`, ...
    pub fn shell(script: impl Into<String>) -> Self {
        Self {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.into(), "_".to_string()],
            timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Executes the gateway command as a local child process.
#[derive(Debug, Clone)]
pub struct ProcessGateway {
    program: String,
    base_args: Vec<String>,
}

impl ProcessGateway {
    pub fn new(config: &GatewayCommandConfig) -> Self {
        Self {
            program: config.program.clone(),
            base_args: config.args.clone(),
        }
    }
}

#[async_trait]
impl GatewayCommand for ProcessGateway {
    async fn execute(
        &self,
        args: &[&str],
        stdin: Vec<u8>,
        timeout: Duration,
    ) -> Result<String, TransportError> {
        let mut command = tokio_command(&self.program);
        command.args(&self.base_args).args(args);

        let run = run_with_stdin(command, stdin, timeout).await?;
        combine(run)
    }
}

/// Sends outbound SMS through the gateway. No retries.
#[derive(Clone)]
pub struct DeliveryTransport {
    gateway: Arc<dyn GatewayCommand>,
    timeout: Duration,
}

impl DeliveryTransport {
    pub fn new(gateway: Arc<dyn GatewayCommand>, timeout: Duration) -> Self {
        Self { gateway, timeout }
    }

    /// A transport running the configured command as a child process.
    pub fn from_config(config: &GatewayCommandConfig) -> Self {
        Self::new(Arc::new(ProcessGateway::new(config)), config.timeout)
    }

    /// Send `body` to `recipient` via `device`, returning the gateway output.
    pub async fn send_sms(
        &self,
        device: &str,
        recipient: &str,
        body: &str,
    ) -> Result<String, TransportError> {
        if device.trim().is_empty() {
            return Err(TransportError::InvalidRequest("device is empty".to_string()));
        }
        if recipient.trim().is_empty() {
            return Err(TransportError::InvalidRequest(
                "recipient is empty".to_string(),
            ));
        }

        let result = self
            .gateway
            .execute(&[device, recipient], body.as_bytes().to_vec(), self.timeout)
            .await;

        match &result {
            Ok(output) => info!(
                device = %device,
                recipient = %recipient,
                body_len = body.len(),
                output = %output.trim(),
                "SMS handed to gateway"
            ),
            Err(e) => warn!(
                device = %device,
                recipient = %recipient,
                body_len = body.len(),
                error = %e,
                "SMS send failed"
            ),
        }
        result
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;

    fn transport(script: &str, timeout: Duration) -> DeliveryTransport {
        DeliveryTransport::from_config(&GatewayCommandConfig::shell(script).with_timeout(timeout))
    }

    #[test]
    fn test_default_config_runs_asterisk_via_sh() {
        let config = GatewayCommandConfig::default();
        assert_eq!(config.program, "sh");
        assert_eq!(config.args[0], "-c");
        assert!(config.args[1].starts_with("asterisk -rx"));
        assert_eq!(config.args[2], "_");
        assert_eq!(config.timeout, DEFAULT_GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn test_positional_args_and_stdin_body() {
        let t = transport(
            r#"printf '%s|%s|' "$1" "$2"; cat"#,
            Duration::from_secs(5),
        );
        let output = t
            .send_sms("quectel0", "+8613800000000", "line one\nline two 你好")
            .await
            .unwrap();
        assert_eq!(output, "quectel0|+8613800000000|line one\nline two 你好");
    }

    #[tokio::test]
    async fn test_large_body_delayed_reader_does_not_deadlock() {
        let body = "x".repeat(128 * 1024);
        let t = transport("sleep 0.5; wc -c", Duration::from_secs(10));

        let started = Instant::now();
        let output = t.send_sms("quectel0", "10086", &body).await.unwrap();

        assert_eq!(output.trim(), "131072");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_never_exiting_command_times_out() {
        let t = transport("exec sleep 60", Duration::from_millis(300));

        let started = Instant::now();
        let err = t.send_sms("quectel0", "10086", "hi").await.unwrap_err();

        assert!(matches!(err, TransportError::TimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_non_zero_exit_reports_output() {
        let t = transport(
            "cat >/dev/null; echo 'No such device' >&2; exit 2",
            Duration::from_secs(5),
        );
        let err = t.send_sms("quectel9", "10086", "hi").await.unwrap_err();

        match &err {
            TransportError::CommandFailed { output, status } => {
                assert_eq!(status.code(), Some(2));
                assert!(output.contains("No such device"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("No such device"));
    }

    #[tokio::test]
    async fn test_reader_closing_early_is_write_failure() {
        let body = "y".repeat(1024 * 1024);
        let t = transport("exec echo early", Duration::from_secs(5));
        let err = t.send_sms("quectel0", "10086", &body).await.unwrap_err();

        match err {
            TransportError::WriteFailed { output, .. } => assert_eq!(output.trim(), "early"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_recipient_is_rejected_before_spawn() {
        let t = transport("exit 0", Duration::from_secs(1));
        assert!(matches!(
            t.send_sms("quectel0", " ", "hi").await,
            Err(TransportError::InvalidRequest(_))
        ));
    }
}
