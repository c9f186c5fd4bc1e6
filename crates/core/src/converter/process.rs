//! Running external tools under a timeout and a cancellation token.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::error::ConverterError;

/// Longest stderr excerpt kept in a [`ConverterError::ConversionFailed`].
const MAX_STDERR_CHARS: usize = 4096;

enum Outcome {
    Exited(ExitStatus, String),
    Failed(std::io::Error),
    TimedOut,
    Cancelled,
}

/// Kills the child's whole process group when dropped while armed, so
/// helpers spawned by the tool die with it.
struct GroupGuard {
    pid: Option<u32>,
}

impl GroupGuard {
    fn disarm(&mut self) {
        self.pid = None;
    }
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        if let Some(pid) = self.pid.take() {
            kill_process_group(pid);
        }
    }
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        debug!(pid, error = %e, "Process group already gone");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

/// Runs `program` with `args` until it exits, times out or is cancelled.
///
/// A non-zero exit is reported with the tail of its stderr.
pub(crate) async fn run_tool(
    tool: &str,
    program: &Path,
    args: &[String],
    timeout_secs: u64,
    cancel: &CancellationToken,
) -> Result<(), ConverterError> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);

    debug!(tool, args = ?args, "Spawning external tool");

    let mut child = command.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConverterError::ToolNotFound {
                tool: tool.to_string(),
                path: program.to_path_buf(),
            }
        } else {
            ConverterError::Io(e)
        }
    })?;
    let mut guard = GroupGuard { pid: child.id() };
    let mut stderr = child.stderr.take();

    let outcome = {
        let wait = async {
            let mut captured = String::new();
            if let Some(pipe) = stderr.as_mut() {
                let _ = pipe.read_to_string(&mut captured).await;
            }
            child.wait().await.map(|status| (status, captured))
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Outcome::Cancelled,
            res = tokio::time::timeout(Duration::from_secs(timeout_secs), wait) => match res {
                Ok(Ok((status, captured))) => Outcome::Exited(status, captured),
                Ok(Err(e)) => Outcome::Failed(e),
                Err(_) => Outcome::TimedOut,
            },
        }
    };

    match outcome {
        Outcome::Exited(status, captured) => {
            guard.disarm();
            if status.success() {
                Ok(())
            } else {
                let stderr = tail(&captured);
                Err(ConverterError::conversion_failed(
                    format!("{} exited with code: {:?}", tool, status.code()),
                    (!stderr.is_empty()).then_some(stderr),
                ))
            }
        }
        Outcome::Failed(e) => Err(ConverterError::Io(e)),
        Outcome::TimedOut => {
            drop(guard);
            let _ = child.kill().await;
            Err(ConverterError::Timeout { timeout_secs })
        }
        Outcome::Cancelled => {
            drop(guard);
            let _ = child.kill().await;
            Err(ConverterError::Cancelled)
        }
    }
}

fn tail(text: &str) -> String {
    let trimmed = text.trim();
    let count = trimmed.chars().count();
    if count <= MAX_STDERR_CHARS {
        trimmed.to_string()
    } else {
        trimmed.chars().skip(count - MAX_STDERR_CHARS).collect()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Instant;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn test_successful_exit() {
        let cancel = CancellationToken::new();
        let result = run_tool("sh", Path::new("/bin/sh"), &sh("exit 0"), 5, &cancel).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_failure_captures_stderr() {
        let cancel = CancellationToken::new();
        let err = run_tool("sh", Path::new("/bin/sh"), &sh("echo oops >&2; exit 3"), 5, &cancel)
            .await
            .unwrap_err();

        match err {
            ConverterError::ConversionFailed { reason, stderr } => {
                assert!(reason.contains("Some(3)"));
                assert_eq!(stderr.as_deref(), Some("oops"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let cancel = CancellationToken::new();
        let err = run_tool("ghost", &PathBuf::from("/nonexistent/ghost"), &[], 5, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ConverterError::ToolNotFound { .. }));
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let cancel = CancellationToken::new();
        let started = Instant::now();
        let err = run_tool("sh", Path::new("/bin/sh"), &sh("sleep 30"), 1, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ConverterError::Timeout { timeout_secs: 1 }));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_cancellation_kills_process() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = run_tool("sh", Path::new("/bin/sh"), &sh("sleep 30"), 60, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ConverterError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_tail_keeps_end() {
        let long = "x".repeat(MAX_STDERR_CHARS) + "END";
        let cut = tail(&long);
        assert_eq!(cut.chars().count(), MAX_STDERR_CHARS);
        assert!(cut.ends_with("END"));
    }
}
