//! Run a child process while streaming a payload into its stdin.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStderr, ChildStdout, Command};
use tokio::sync::oneshot;
use tracing::debug;

use crate::NoWindowExt;

/// Read buffer size for each output pipe.
const PIPE_CHUNK: usize = 8 * 1024;

/// Outcome of a child that exited before the deadline.
///
/// `write` carries the stdin writer's own result. It is reported even when the
/// child exited first (for example a broken pipe because the child never read
/// its input), so callers decide how to rank it against the exit status.
#[derive(Debug)]
pub struct StdinRun {
    /// Interleaved stdout and stderr, in arrival order.
    pub output: Vec<u8>,
    pub status: ExitStatus,
    pub write: io::Result<()>,
}

impl StdinRun {
    /// Combined output decoded lossily as UTF-8.
    pub fn output_lossy(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StdinRunError {
    #[error("failed to spawn command: {0}")]
    Spawn(#[source] io::Error),

    /// The child (or the stdin writer) outlived the deadline and was killed.
    #[error("command timed out after {timeout:?}")]
    TimedOut { timeout: Duration, output: Vec<u8> },

    #[error("failed to wait for command: {source}")]
    Wait {
        output: Vec<u8>,
        #[source]
        source: io::Error,
    },
}

/// Spawn `command`, write `input` to its stdin on a separate task, and wait
/// for it to exit while collecting stdout and stderr.
///
/// The writer task reports through a oneshot channel that is always drained
/// before returning, and the task itself is joined (or aborted on timeout), so
/// nothing outlives the call. The child is killed if it is still running when
/// `timeout` elapses.
pub async fn run_with_stdin(
    mut command: Command,
    input: Vec<u8>,
    timeout: Duration,
) -> Result<StdinRun, StdinRunError> {
    command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    command.no_window();

    let deadline = tokio::time::Instant::now() + timeout;
    let mut child = command.spawn().map_err(StdinRunError::Spawn)?;

    let stdin = child.stdin.take();
    let (report_tx, report_rx) = oneshot::channel::<io::Result<()>>();
    let writer = tokio::spawn(async move {
        let result = match stdin {
            Some(mut stdin) => {
                let written = stdin.write_all(&input).await;
                // Dropping the handle closes the pipe so the child sees EOF.
                drop(stdin);
                written
            }
            None => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "child stdin was not captured",
            )),
        };
        let _ = report_tx.send(result);
    });

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let mut output = Vec::new();

    let waited = tokio::time::timeout_at(deadline, async {
        let (collected, status) =
            tokio::join!(collect_combined(stdout, stderr, &mut output), child.wait());
        collected?;
        status
    })
    .await;

    let status = match waited {
        Ok(Ok(status)) => status,
        Ok(Err(source)) => {
            kill_child(&mut child).await;
            writer.abort();
            let _ = writer.await;
            return Err(StdinRunError::Wait { output, source });
        }
        Err(_) => {
            kill_child(&mut child).await;
            writer.abort();
            let _ = writer.await;
            return Err(StdinRunError::TimedOut { timeout, output });
        }
    };

    let write = match tokio::time::timeout_at(deadline, report_rx).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err(io::Error::other("stdin writer ended without reporting")),
        Err(_) => {
            // Something else still holds the read end open without draining it.
            writer.abort();
            let _ = writer.await;
            return Err(StdinRunError::TimedOut { timeout, output });
        }
    };
    let _ = writer.await;

    debug!(
        status = %status,
        output_len = output.len(),
        write_ok = write.is_ok(),
        "piped command finished"
    );

    Ok(StdinRun {
        output,
        status,
        write,
    })
}

async fn kill_child(child: &mut tokio::process::Child) {
    if let Err(e) = child.kill().await {
        debug!(error = %e, "failed to kill child process");
    }
}

/// Drain both output pipes into `sink`, interleaving chunks as they arrive.
async fn collect_combined(
    mut stdout: Option<ChildStdout>,
    mut stderr: Option<ChildStderr>,
    sink: &mut Vec<u8>,
) -> io::Result<()> {
    let mut out_buf = [0u8; PIPE_CHUNK];
    let mut err_buf = [0u8; PIPE_CHUNK];

    while stdout.is_some() || stderr.is_some() {
        tokio::select! {
            read = read_pipe(stdout.as_mut(), &mut out_buf), if stdout.is_some() => {
                match read? {
                    0 => stdout = None,
                    n => sink.extend_from_slice(&out_buf[..n]),
                }
            }
            read = read_pipe(stderr.as_mut(), &mut err_buf), if stderr.is_some() => {
                match read? {
                    0 => stderr = None,
                    n => sink.extend_from_slice(&err_buf[..n]),
                }
            }
        }
    }

    Ok(())
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<&mut R>, buf: &mut [u8]) -> io::Result<usize> {
    match pipe {
        Some(pipe) => pipe.read(buf).await,
        None => Ok(0),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;

    fn sh(script: &str) -> Command {
        let mut cmd = crate::tokio_command("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[tokio::test]
    async fn test_round_trips_stdin() {
        let run = run_with_stdin(sh("cat"), b"hello\nworld".to_vec(), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(run.status.success());
        assert!(run.write.is_ok());
        assert_eq!(run.output_lossy(), "hello\nworld");
    }

    #[tokio::test]
    async fn test_large_body_with_delayed_reader() {
        let body = vec![b'x'; 128 * 1024];
        let started = Instant::now();
        let run = run_with_stdin(
            sh("sleep 0.3; wc -c"),
            body,
            Duration::from_secs(10),
        )
        .await
        .unwrap();

        assert!(run.status.success());
        assert!(run.write.is_ok());
        assert_eq!(run.output_lossy().trim(), "131072");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_never_exiting_command_times_out() {
        let started = Instant::now();
        let err = run_with_stdin(sh("exec sleep 30"), Vec::new(), Duration::from_millis(200))
            .await
            .unwrap_err();

        assert!(matches!(err, StdinRunError::TimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_timeout_with_unread_large_body() {
        let body = vec![b'y'; 512 * 1024];
        let err = run_with_stdin(sh("exec sleep 30"), body, Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, StdinRunError::TimedOut { .. }));
    }

    #[tokio::test]
    async fn test_reports_exit_status_and_stderr() {
        let run = run_with_stdin(
            sh("cat >/dev/null; echo out; echo err >&2; exit 3"),
            b"ignored".to_vec(),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(run.status.code(), Some(3));
        let output = run.output_lossy();
        assert!(output.contains("out"));
        assert!(output.contains("err"));
    }

    #[tokio::test]
    async fn test_write_failure_when_child_ignores_stdin() {
        let body = vec![b'z'; 1024 * 1024];
        let run = run_with_stdin(sh("exec true"), body, Duration::from_secs(5))
            .await
            .unwrap();

        assert!(run.status.success());
        assert!(run.write.is_err());
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let cmd = crate::tokio_command("/definitely/not/a/real/binary");
        let err = run_with_stdin(cmd, Vec::new(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, StdinRunError::Spawn(_)));
    }
}
