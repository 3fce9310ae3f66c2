use std::{
    ffi::OsString,
    io::{self, ErrorKind, Read},
    path::Path,
    process::{ChildStderr, Command, ExitStatus, Stdio},
    thread,
    time::{Duration, Instant},
};

use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A renderer invocation that ran to completion within the time budget.
#[derive(Debug)]
pub(crate) struct Invocation {
    pub(crate) status: ExitStatus,
    pub(crate) stderr: String,
}

#[derive(Debug, Error)]
pub(crate) enum InvokeError {
    #[error("renderer executable could not be found: {0}")]
    NotFound(io::Error),
    #[error("renderer exceeded the {budget:?} time budget")]
    TimedOut { budget: Duration },
    #[error("renderer process error: {0}")]
    Io(io::Error),
}

/// Run the renderer with the composed arguments, blocking until it exits or
/// the budget elapses. On expiry the child is killed and reaped before the
/// error is returned.
pub(crate) fn run(
    cli_path: &Path,
    args: &[OsString],
    budget: Duration,
) -> Result<Invocation, InvokeError> {
    let mut child = Command::new(cli_path)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                InvokeError::NotFound(err)
            } else {
                InvokeError::Io(err)
            }
        })?;

    // Drained concurrently: a renderer that fills the pipe buffer with
    // diagnostics before exiting would otherwise block on the full pipe and
    // surface as a timeout instead of a normal non-zero exit.
    let mut drain = child.stderr.take().map(spawn_stderr_drain);

    let deadline = Instant::now() + budget;
    let status = loop {
        match child.try_wait().map_err(InvokeError::Io)? {
            Some(status) => break status,
            None if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                if let Some(handle) = drain.take() {
                    let _ = handle.join();
                }
                return Err(InvokeError::TimedOut { budget });
            }
            None => thread::sleep(POLL_INTERVAL),
        }
    };

    let stderr = match drain.take() {
        Some(handle) => handle
            .join()
            .map(|buf| String::from_utf8_lossy(&buf).into_owned())
            .unwrap_or_default(),
        None => String::new(),
    };

    Ok(Invocation { status, stderr })
}

fn spawn_stderr_drain(mut pipe: ChildStderr) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}
