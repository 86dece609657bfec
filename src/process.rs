//! Running the native analyzer as a subprocess.

use std::ffi::OsString;
use std::io::{self, BufReader, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::BridgeError;
use crate::request::EnvironmentVariables;

/// Everything needed to launch the analyzer once.
#[derive(Debug, Clone)]
pub struct ProcessInvocation {
    pub executable: PathBuf,
    pub arguments: Vec<OsString>,
    /// Merged over the ambient environment of the current process.
    pub environment: Arc<EnvironmentVariables>,
    pub working_directory: Option<PathBuf>,
}

/// Executes a process and hands its standard output to a callback.
///
/// Execution is synchronous: `execute` returns after the callback has
/// returned and the process has been reaped.
pub trait ProcessRunner: Send + Sync {
    fn execute(
        &self,
        invocation: &ProcessInvocation,
        on_stdout: &mut dyn FnMut(&mut dyn Read),
    ) -> Result<(), BridgeError>;
}

/// `ProcessRunner` backed by `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubprocessRunner;

impl SubprocessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessRunner for SubprocessRunner {
    fn execute(
        &self,
        invocation: &ProcessInvocation,
        on_stdout: &mut dyn FnMut(&mut dyn Read),
    ) -> Result<(), BridgeError> {
        let mut command = Command::new(&invocation.executable);
        command
            .args(&invocation.arguments)
            .envs(invocation.environment.iter())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        if let Some(dir) = &invocation.working_directory {
            command.current_dir(dir);
        }

        debug!(
            executable = %invocation.executable.display(),
            args = ?invocation.arguments,
            "starting analyzer"
        );
        let mut child = command.spawn().map_err(|source| BridgeError::ProcessStart {
            executable: invocation.executable.clone(),
            source,
        })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            BridgeError::ProcessIo(io::Error::new(
                io::ErrorKind::Other,
                "analyzer stdout was not captured",
            ))
        })?;
        let mut reader = BufReader::new(stdout);
        on_stdout(&mut reader);
        drop(reader);

        // The callback may stop early. An analyzer still running at this
        // point is killed so it cannot hold the caller.
        let killed = match child.try_wait().map_err(BridgeError::ProcessIo)? {
            Some(_) => false,
            None => {
                match child.kill() {
                    Ok(()) => {}
                    // Already exited between the two calls.
                    Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
                    Err(e) => return Err(BridgeError::ProcessIo(e)),
                }
                true
            }
        };

        let status = child.wait().map_err(BridgeError::ProcessIo)?;
        if killed {
            debug!(%status, "analyzer killed after its output was consumed");
        } else if status.success() {
            debug!(%status, "analyzer exited");
        } else {
            warn!(%status, executable = %invocation.executable.display(), "analyzer exited with failure");
        }
        Ok(())
    }
}

/// Shared flag a caller flips to stop launching further analyses.
///
/// Checked before a subprocess starts, never while one is being decoded.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_token_is_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_missing_executable_fails_to_start() {
        let invocation = ProcessInvocation {
            executable: PathBuf::from("/definitely/not/here/cfamily-analyzer"),
            arguments: vec![OsString::from("file.cpp")],
            environment: Arc::new(EnvironmentVariables::new()),
            working_directory: None,
        };
        let mut called = false;
        let err = SubprocessRunner::new()
            .execute(&invocation, &mut |_| called = true)
            .unwrap_err();
        assert!(matches!(err, BridgeError::ProcessStart { .. }));
        assert!(!called);
    }

    #[cfg(unix)]
    #[test]
    fn test_stdout_is_streamed_to_callback() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("out.bin");
        std::fs::write(&file, b"hello analyzer").unwrap();

        let invocation = ProcessInvocation {
            executable: PathBuf::from("cat"),
            arguments: vec![file.into_os_string()],
            environment: Arc::new(EnvironmentVariables::new()),
            working_directory: Some(dir.path().to_path_buf()),
        };
        let mut captured = Vec::new();
        SubprocessRunner::new()
            .execute(&invocation, &mut |out| {
                out.read_to_end(&mut captured).unwrap();
            })
            .unwrap();
        assert_eq!(captured, b"hello analyzer");
    }

    #[cfg(unix)]
    #[test]
    fn test_lingering_process_is_killed() {
        let invocation = ProcessInvocation {
            executable: PathBuf::from("sh"),
            arguments: vec![
                OsString::from("-c"),
                OsString::from("printf done; exec >&-; exec sleep 4"),
            ],
            environment: Arc::new(EnvironmentVariables::new()),
            working_directory: None,
        };
        let started = std::time::Instant::now();
        let mut captured = String::new();
        SubprocessRunner::new()
            .execute(&invocation, &mut |out| {
                out.read_to_string(&mut captured).unwrap();
            })
            .unwrap();
        assert_eq!(captured, "done");
        assert!(started.elapsed() < std::time::Duration::from_secs(2));
    }

    #[cfg(unix)]
    #[test]
    fn test_environment_reaches_process() {
        let mut env = EnvironmentVariables::new();
        env.insert("CFBRIDGE_TEST_VAR".to_string(), "bbb".to_string());
        let invocation = ProcessInvocation {
            executable: PathBuf::from("printenv"),
            arguments: vec![OsString::from("CFBRIDGE_TEST_VAR")],
            environment: Arc::new(env),
            working_directory: None,
        };
        let mut captured = String::new();
        SubprocessRunner::new()
            .execute(&invocation, &mut |out| {
                out.read_to_string(&mut captured).unwrap();
            })
            .unwrap();
        assert_eq!(captured.trim_end(), "bbb");
    }
}
