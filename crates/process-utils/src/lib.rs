//! Small process-related helpers shared across the workspace.
//!
//! Besides the Windows `CREATE_NO_WINDOW` helper, this crate provides
//! [`run_with_stdin`], which feeds a payload into a child's stdin on its own
//! task while the caller waits for the child. Writing and waiting on the same
//! path deadlocks as soon as the payload exceeds the pipe buffer and the child
//! only reads after doing something else first.

#[cfg(feature = "tokio")]
use std::ffi::OsStr;

#[cfg(feature = "tokio")]
mod piped;

#[cfg(feature = "tokio")]
pub use piped::{StdinRun, StdinRunError, run_with_stdin};

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Apply the Windows `CREATE_NO_WINDOW` flag to child processes.
///
/// On non-Windows targets this is a no-op.
pub trait NoWindowExt {
    fn no_window(&mut self);
}

#[cfg(feature = "tokio")]
impl NoWindowExt for tokio::process::Command {
    fn no_window(&mut self) {
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            self.as_std_mut().creation_flags(CREATE_NO_WINDOW);
        }
    }
}

/// Create a `tokio::process::Command` with `CREATE_NO_WINDOW` applied on Windows.
#[cfg(feature = "tokio")]
pub fn tokio_command(program: impl AsRef<OsStr>) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new(program);
    cmd.no_window();
    cmd
}
