use async_trait::async_trait;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

use super::resolve::resolve_entry_executable;
use crate::config::BridgeConfig;

/// `STATUS_CONTROL_C_EXIT` (0xC000013A).
///
/// The first WSL invocation after the subsystem cold-starts is sometimes
/// killed asynchronously by the host and exits with this code even though
/// the command itself was fine.
pub const STATUS_CONTROL_C_EXIT: i64 = 0xC000_013A;

/// `CREATE_NEW_PROCESS_GROUP | CREATE_NO_WINDOW`
pub const WINDOWS_CREATION_FLAGS: u32 = 0x0000_0200 | 0x0800_0000;

/// Normalized result of one executor invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    /// Standard output with trailing whitespace trimmed
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i64,
    /// Number of launches it took, at least 1
    pub attempts: u32,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    fn launch_failure(err: &io::Error, attempts: u32) -> Self {
        Self {
            stdout: String::new(),
            stderr: err.to_string(),
            exit_code: -1,
            attempts,
        }
    }
}

/// Bounded retry for the spurious interrupted exit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Single attempt, no retry
    pub fn disabled() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}

/// Raw exit of a single child process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOutput {
    pub exit_code: i64,
    pub stdout: String,
    pub stderr: String,
}

/// Starts the entry executable once and waits for it
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    async fn launch(&self, program: &Path, command: &str) -> io::Result<RawOutput>;
}

/// Launches real child processes via tokio
pub struct SystemLauncher;

#[async_trait]
impl ProcessLauncher for SystemLauncher {
    async fn launch(&self, program: &Path, command: &str) -> io::Result<RawOutput> {
        let mut cmd = Command::new(program);
        cmd.arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // The bridge usually runs as a service without a console; a child
        // that inherits or allocates one can wedge it.
        #[cfg(windows)]
        cmd.creation_flags(WINDOWS_CREATION_FLAGS);

        let output = cmd.output().await?;
        Ok(RawOutput {
            exit_code: exit_code_of(output.status),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

fn exit_code_of(status: ExitStatus) -> i64 {
    match status.code() {
        // NTSTATUS values come back as negative i32
        #[cfg(windows)]
        Some(code) => i64::from(code as u32),
        #[cfg(not(windows))]
        Some(code) => i64::from(code),
        None => signal_exit_code(status),
    }
}

#[cfg(unix)]
fn signal_exit_code(status: ExitStatus) -> i64 {
    use std::os::unix::process::ExitStatusExt;
    status.signal().map(|sig| 128 + i64::from(sig)).unwrap_or(-1)
}

#[cfg(not(unix))]
fn signal_exit_code(_status: ExitStatus) -> i64 {
    -1
}

/// Anything that can run one shell command line in the subsystem
#[async_trait]
pub trait ShellExecutor: Send + Sync {
    async fn execute(&self, command: &str) -> ExecutionResult;
}

/// Runs shell commands through the WSL entry executable
pub struct Executor {
    program: PathBuf,
    policy: RetryPolicy,
    launcher: Arc<dyn ProcessLauncher>,
}

impl Executor {
    pub fn new(program: impl Into<PathBuf>, policy: RetryPolicy) -> Self {
        Self::with_launcher(program, policy, Arc::new(SystemLauncher))
    }

    pub fn with_launcher(
        program: impl Into<PathBuf>,
        policy: RetryPolicy,
        launcher: Arc<dyn ProcessLauncher>,
    ) -> Self {
        Self {
            program: program.into(),
            policy,
            launcher,
        }
    }

    /// Resolve the entry executable and retry policy from configuration
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(
            resolve_entry_executable(&config.entry_executable),
            config.retry.policy(),
        )
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

#[async_trait]
impl ShellExecutor for Executor {
    async fn execute(&self, command: &str) -> ExecutionResult {
        let mut attempt = 1;
        loop {
            tracing::debug!(attempt, "wsl: {}", command);

            let raw = match self.launcher.launch(&self.program, command).await {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!("Failed to launch {:?}: {}", self.program, e);
                    return ExecutionResult::launch_failure(&e, attempt);
                }
            };

            if raw.exit_code == STATUS_CONTROL_C_EXIT && attempt < self.policy.max_attempts {
                tracing::warn!(
                    attempt,
                    "wsl exited with STATUS_CONTROL_C_EXIT, retrying in {:?}",
                    self.policy.delay
                );
                tokio::time::sleep(self.policy.delay).await;
                attempt += 1;
                continue;
            }

            return ExecutionResult {
                stdout: raw.stdout.trim_end().to_string(),
                stderr: raw.stderr,
                exit_code: raw.exit_code,
                attempts: attempt,
            };
        }
    }
}
