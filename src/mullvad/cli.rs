//! [`VpnClient`] implementation backed by the `mullvad` binary.
//!
//! Every call spawns a short-lived child process, drains its output on
//! helper threads and polls it until it exits or the deadline passes.  A
//! child that outlives the deadline is killed.

use crate::traits::VpnClient;
use log::{debug, warn};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// Interval between exit-status polls while waiting for a child.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Errors from running the client.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("mullvad is not installed")]
    NotInstalled,
    #[error("failed to run {0}: {1}")]
    Spawn(String, #[source] std::io::Error),
    #[error("`mullvad {args}` failed ({code}): {stderr}")]
    Failed {
        args: String,
        code: String,
        stderr: String,
    },
    #[error("`mullvad {args}` timed out after {timeout:?}")]
    Timeout { args: String, timeout: Duration },
    #[error("`mullvad {0}` printed invalid UTF-8")]
    Utf8(String),
}

/// Handle to the installed client.
#[derive(Debug, Clone)]
pub struct MullvadCli {
    binary: Option<PathBuf>,
    timeout: Duration,
}

impl MullvadCli {
    /// Use `binary` if it exists, otherwise look `mullvad` up on `PATH`.
    pub fn locate(binary: &Path, timeout: Duration) -> Self {
        let binary = if binary.is_file() {
            Some(binary.to_path_buf())
        } else {
            match which::which("mullvad") {
                Ok(found) => {
                    debug!("{} missing, using {}", binary.display(), found.display());
                    Some(found)
                }
                Err(e) => {
                    debug!("mullvad not found: {}", e);
                    None
                }
            }
        };
        Self { binary, timeout }
    }

    /// Use exactly `binary`, without any lookup.
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: Some(binary.into()),
            timeout,
        }
    }

    pub fn binary(&self) -> Option<&Path> {
        self.binary.as_deref()
    }
}

impl VpnClient for MullvadCli {
    type Error = CliError;

    fn is_installed(&self) -> bool {
        self.binary.is_some()
    }

    fn run(&self, args: &[&str]) -> Result<String, CliError> {
        let binary = self.binary.as_ref().ok_or(CliError::NotInstalled)?;
        let joined = args.join(" ");
        debug!("running mullvad {}", joined);

        let mut child = Command::new(binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CliError::Spawn(binary.display().to_string(), e))?;

        let deadline = Instant::now() + self.timeout;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match wait_with_deadline(&mut child, deadline) {
            Ok(Some(status)) => status,
            Ok(None) => {
                warn!("mullvad {} timed out, killing it", joined);
                let _ = child.kill();
                let _ = child.wait();
                return Err(CliError::Timeout {
                    args: joined,
                    timeout: self.timeout,
                });
            }
            Err(e) => return Err(CliError::Spawn(binary.display().to_string(), e)),
        };

        // A grandchild may still hold the pipes open after the exit.
        let (stdout, stderr) = match (collect(stdout, deadline), collect(stderr, deadline)) {
            (Some(out), Some(err)) => (out, err),
            _ => {
                warn!("mullvad {} exited but its output stayed open", joined);
                return Err(CliError::Timeout {
                    args: joined,
                    timeout: self.timeout,
                });
            }
        };
        let stderr = String::from_utf8_lossy(&stderr).trim().to_string();

        if !status.success() {
            return Err(CliError::Failed {
                args: joined,
                code: status
                    .code()
                    .map(|c| format!("exit {}", c))
                    .unwrap_or_else(|| "killed".into()),
                stderr,
            });
        }
        if !stderr.is_empty() {
            warn!("mullvad {} wrote to stderr: {}", joined, stderr);
        }

        String::from_utf8(stdout).map_err(|_| CliError::Utf8(joined))
    }

    fn command_line(&self, args: &[&str]) -> String {
        let mut line = self
            .binary
            .as_ref()
            .map(|b| shell_quote(&b.display().to_string()))
            .unwrap_or_else(|| "mullvad".into());
        for arg in args {
            line.push(' ');
            line.push_str(&shell_quote(arg));
        }
        line
    }
}

/// Single-quote `word` for `sh` unless it only holds safe characters.
fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+:@%,=".contains(c));
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// Poll `child` until it exits (`Some`) or `deadline` passes (`None`).
fn wait_with_deadline(
    child: &mut Child,
    deadline: Instant,
) -> std::io::Result<Option<std::process::ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Read a pipe to the end on a helper thread so the child never blocks on a
/// full pipe buffer.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<Receiver<Vec<u8>>> {
    pipe.map(|mut pipe| {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = tx.send(buf);
        });
        rx
    })
}

/// Wait for a drained pipe until `deadline`; `None` if it is still open.
fn collect(rx: Option<Receiver<Vec<u8>>>, deadline: Instant) -> Option<Vec<u8>> {
    let rx = match rx {
        Some(rx) => rx,
        None => return Some(Vec::new()),
    };
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(buf) => Some(buf),
        Err(RecvTimeoutError::Timeout) => None,
        Err(RecvTimeoutError::Disconnected) => Some(Vec::new()),
    }
}
