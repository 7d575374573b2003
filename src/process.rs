//! Sandboxed execution of external tools with timeout and cancellation
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Limit for slow analyzers unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Time between SIGTERM and SIGKILL when tearing down a process group.
const KILL_GRACE: Duration = Duration::from_millis(100);

/// How long to keep draining pipes after the process group was killed.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("no command to run")]
    EmptyCommand,

    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` timed out after {timeout:?}")]
    Timeout {
        program: String,
        timeout: Duration,
        stderr: String,
    },

    #[error("`{program}` was cancelled")]
    Cancelled { program: String, stderr: String },

    #[error("`{program}` exited with {}: {stderr}", describe_code(.code))]
    Exit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("failed while waiting for `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "a signal".to_string(),
    }
}

impl ProcessError {
    /// Captured standard error, when the process got far enough to produce any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            ProcessError::Exit { stderr, .. }
            | ProcessError::Timeout { stderr, .. }
            | ProcessError::Cancelled { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

/// Which exit statuses count as a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitPolicy {
    /// Only status 0.
    SuccessOnly,
    /// Status 0 or one of the listed "findings present" statuses.
    Tolerate(&'static [i32]),
}

impl ExitPolicy {
    pub fn accepts(&self, code: Option<i32>) -> bool {
        match (self, code) {
            (_, Some(0)) => true,
            (ExitPolicy::Tolerate(codes), Some(c)) => codes.contains(&c),
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub program: String,
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// Apply `policy`, turning unexpected statuses into [`ProcessError::Exit`].
    pub fn check(self, policy: ExitPolicy) -> Result<Self, ProcessError> {
        if policy.accepts(self.code) {
            return Ok(self);
        }
        Err(ProcessError::Exit {
            stderr: self.stderr_lossy().trim().to_string(),
            program: self.program,
            code: self.code,
        })
    }
}

/// Run `argv` in `cwd`, collecting stdout and stderr.
///
/// The child gets its own process group so that a timeout or cancellation
/// tears down everything it spawned, not just the direct child.
pub async fn run(
    argv: &[String],
    cwd: &Path,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> Result<ProcessOutput, ProcessError> {
    let (program, args) = argv.split_first().ok_or(ProcessError::EmptyCommand)?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    tracing::debug!(%program, ?args, cwd = %cwd.display(), "spawning tool");
    let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
        program: program.clone(),
        source,
    })?;
    let pid = child.id();
    // Pipes are drained on their own tasks so that whatever the tool wrote
    // before a timeout or cancellation is still available afterwards.
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let deadline = async {
        match timeout {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };

    let ended = tokio::select! {
        status = child.wait() => Ended::Exited(status),
        _ = deadline => Ended::TimedOut,
        _ = cancel.cancelled() => Ended::Cancelled,
    };

    match ended {
        Ended::Exited(status) => {
            let status = status.map_err(|source| ProcessError::Wait {
                program: program.clone(),
                source,
            })?;
            Ok(ProcessOutput {
                program: program.clone(),
                code: status.code(),
                stdout: collect(stdout, timeout).await,
                stderr: collect(stderr, timeout).await,
            })
        }
        Ended::TimedOut => {
            tracing::warn!(%program, ?timeout, "tool timed out; terminating process group");
            terminate_process_tree(pid).await;
            stdout.abort();
            Err(ProcessError::Timeout {
                program: program.clone(),
                timeout: timeout.unwrap_or_default(),
                stderr: lossy_trimmed(collect(stderr, Some(DRAIN_GRACE)).await),
            })
        }
        Ended::Cancelled => {
            tracing::info!(%program, "check cancelled; terminating process group");
            terminate_process_tree(pid).await;
            stdout.abort();
            Err(ProcessError::Cancelled {
                program: program.clone(),
                stderr: lossy_trimmed(collect(stderr, Some(DRAIN_GRACE)).await),
            })
        }
    }
}

enum Ended {
    Exited(std::io::Result<std::process::ExitStatus>),
    TimedOut,
    Cancelled,
}

fn drain<R>(pipe: Option<R>) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            if let Err(e) = pipe.read_to_end(&mut buf).await {
                tracing::debug!(error = %e, "pipe read ended early");
            }
        }
        buf
    })
}

/// Output gathered by a [`drain`] task. With a `limit`, a pipe still held
/// open by a stray process yields nothing once the limit passes.
async fn collect(handle: JoinHandle<Vec<u8>>, limit: Option<Duration>) -> Vec<u8> {
    let joined = match limit {
        Some(limit) => match tokio::time::timeout(limit, handle).await {
            Ok(joined) => joined,
            Err(_) => return Vec::new(),
        },
        None => handle.await,
    };
    joined.unwrap_or_default()
}

fn lossy_trimmed(bytes: Vec<u8>) -> String {
    String::from_utf8_lossy(&bytes).trim().to_string()
}

async fn terminate_process_tree(pid: Option<u32>) {
    let Some(pid) = pid else {
        return;
    };

    #[cfg(unix)]
    {
        let Ok(pgid) = libc::pid_t::try_from(pid) else {
            return;
        };
        // SAFETY: killpg only sends a signal; the group id came from our own child.
        unsafe {
            libc::killpg(pgid, libc::SIGTERM);
        }
        tokio::time::sleep(KILL_GRACE).await;
        unsafe {
            libc::killpg(pgid, libc::SIGKILL);
        }
    }

    #[cfg(windows)]
    {
        let _ = std::process::Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/T", "/F"])
            .output();
    }
}
