use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::heuristics::ProgressClassifier;
use super::{
    CloseOutcome, CreateOutcome, DebugCheck, DebugReport, Pane, PaneListing, PaneProgress,
    ScreenCapture, SendOutcome,
};
use crate::error::{BridgeError, Result};
use crate::wsl::{ExecutionResult, ShellExecutor};

/// Lists every pane of every session, one tab-separated line per pane.
pub const LIST_PANES_COMMAND: &str = r"tmux list-panes -a -F '#{session_name}\t#{window_index}\t#{window_active}\t#{pane_id}\t#{pane_index}\t#{pane_current_command}\t#{pane_current_path}'";

const LIST_SESSIONS_DEBUG_COMMAND: &str = r"tmux list-sessions -F '#{session_name}\t#{session_id}'";

const PANE_FIELDS: usize = 7;

static RE_SESSION_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").unwrap());

static RE_PANE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^%[0-9]+$").unwrap());

/// Known tmux failure classes, recognized from stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TmuxErrorKind {
    SessionNotFound,
    ServerNotRunning,
    DuplicateSession,
}

impl TmuxErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            Self::SessionNotFound => "not_found",
            Self::ServerNotRunning => "tmux_server_not_running",
            Self::DuplicateSession => "already_exists",
        }
    }
}

/// Classify tmux stderr text. Matching is case-sensitive.
pub fn classify_tmux_error(stderr: &str) -> Option<TmuxErrorKind> {
    if stderr.contains("can't find session") {
        Some(TmuxErrorKind::SessionNotFound)
    } else if stderr.contains("failed to connect to server") {
        Some(TmuxErrorKind::ServerNotRunning)
    } else if stderr.contains("duplicate session") {
        Some(TmuxErrorKind::DuplicateSession)
    } else {
        None
    }
}

/// Whether `name` is safe to splice into a tmux command line
pub fn is_valid_session_name(name: &str) -> bool {
    RE_SESSION_NAME.is_match(name)
}

fn validate_session_name(name: &str) -> Result<()> {
    if is_valid_session_name(name) {
        Ok(())
    } else {
        Err(BridgeError::InvalidArgument(format!(
            "invalid session name {:?}: use letters, digits, '-' or '_'",
            name
        )))
    }
}

fn validate_target(target: &str) -> Result<()> {
    if is_valid_session_name(target) || RE_PANE_ID.is_match(target) {
        Ok(())
    } else {
        Err(BridgeError::InvalidArgument(format!(
            "invalid pane target {:?}",
            target
        )))
    }
}

/// Quote `s` as a single POSIX shell word
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Parse one listing line into a [`Pane`].
///
/// Fields may be separated by real tabs or by a literal `\t` when the tmux
/// build echoes the format escape verbatim. Lines with the wrong field count
/// are rejected.
pub fn parse_pane_line(line: &str) -> Option<Pane> {
    let line = line.trim_end_matches('\r');
    if line.is_empty() {
        return None;
    }

    let mut parts: Vec<&str> = line.split('\t').collect();
    if parts.len() != PANE_FIELDS {
        parts = line.split(r"\t").collect();
    }
    if parts.len() != PANE_FIELDS {
        return None;
    }

    Some(Pane {
        session: parts[0].to_string(),
        window_index: parts[1].to_string(),
        window_flag: parts[2].to_string(),
        pane_id: parts[3].to_string(),
        pane_index: parts[4].to_string(),
        command: parts[5].to_string(),
        path: parts[6].to_string(),
    })
}

/// Client for tmux running inside the subsystem
#[derive(Clone)]
pub struct TmuxClient {
    exec: Arc<dyn ShellExecutor>,
}

impl TmuxClient {
    pub fn new(exec: Arc<dyn ShellExecutor>) -> Self {
        Self { exec }
    }

    pub(crate) async fn run(&self, command: &str) -> ExecutionResult {
        self.exec.execute(command).await
    }

    /// List all panes across all sessions
    pub async fn list_panes(&self) -> PaneListing {
        let result = self.run(LIST_PANES_COMMAND).await;

        if result.exit_code != 0 {
            // No server simply means no panes yet
            if classify_tmux_error(&result.stderr) == Some(TmuxErrorKind::ServerNotRunning)
                || result.stderr.contains("no server running")
            {
                return PaneListing {
                    ok: true,
                    panes: Vec::new(),
                    error: None,
                    stderr: None,
                };
            }
            return PaneListing {
                ok: false,
                panes: Vec::new(),
                error: Some("tmux_error".to_string()),
                stderr: Some(result.stderr),
            };
        }

        let mut panes = Vec::new();
        for line in result.stdout.lines() {
            match parse_pane_line(line) {
                Some(pane) => panes.push(pane),
                None if !line.trim().is_empty() => {
                    tracing::debug!("Skipping malformed pane line: {:?}", line);
                }
                None => {}
            }
        }

        PaneListing {
            ok: true,
            panes,
            error: None,
            stderr: None,
        }
    }

    /// Create a detached session, optionally named
    pub async fn create_session(&self, name: Option<&str>) -> Result<CreateOutcome> {
        let command = match name {
            Some(name) => {
                validate_session_name(name)?;
                format!("tmux new-session -d -s {}", name)
            }
            None => "tmux new-session -d".to_string(),
        };

        let result = self.run(&command).await;
        let ok = result.success();
        if ok {
            tracing::info!("Created tmux session {:?}", name);
        }

        Ok(CreateOutcome {
            ok,
            name: name.map(str::to_string),
            error: (!ok).then(|| failure_code(&result)),
        })
    }

    /// Kill a session by name
    pub async fn close_session(&self, name: &str) -> Result<CloseOutcome> {
        validate_session_name(name)?;

        let result = self.run(&format!("tmux kill-session -t {}", name)).await;
        let (ok, error) = match classify_tmux_error(&result.stderr) {
            Some(kind @ (TmuxErrorKind::SessionNotFound | TmuxErrorKind::ServerNotRunning)) => {
                (false, Some(kind.code().to_string()))
            }
            _ if result.success() => (true, None),
            _ => (false, Some("tmux_error".to_string())),
        };
        if ok {
            tracing::info!("Closed tmux session {}", name);
        }

        Ok(CloseOutcome {
            ok,
            session: name.to_string(),
            error,
        })
    }

    /// Capture the visible screen plus `lines` of scrollback
    pub async fn capture_pane(&self, target: &str, lines: u32) -> Result<ScreenCapture> {
        validate_target(target)?;

        let command = if lines > 0 {
            format!("tmux capture-pane -p -t {} -S -{}", target, lines)
        } else {
            format!("tmux capture-pane -p -t {}", target)
        };
        let result = self.run(&command).await;
        let ok = result.success();

        Ok(ScreenCapture {
            ok,
            target: target.to_string(),
            error: (!ok).then(|| failure_code(&result)),
            text: result.stdout,
        })
    }

    /// Type literal text into a pane, optionally pressing Enter
    pub async fn send_text(&self, target: &str, text: &str, enter: bool) -> Result<SendOutcome> {
        validate_target(target)?;

        if !text.is_empty() {
            let result = self
                .run(&format!("tmux send-keys -t {} -l {}", target, shell_quote(text)))
                .await;
            if !result.success() {
                return Ok(SendOutcome {
                    ok: false,
                    target: target.to_string(),
                    error: Some(failure_code(&result)),
                });
            }
        }

        if enter {
            let result = self
                .run(&format!("tmux send-keys -t {} Enter", target))
                .await;
            if !result.success() {
                return Ok(SendOutcome {
                    ok: false,
                    target: target.to_string(),
                    error: Some(failure_code(&result)),
                });
            }
        }

        Ok(SendOutcome {
            ok: true,
            target: target.to_string(),
            error: None,
        })
    }

    /// Capture a pane and classify its progress state
    pub async fn progress(
        &self,
        target: &str,
        current_command: Option<&str>,
        lines: u32,
    ) -> Result<PaneProgress> {
        let capture = self.capture_pane(target, lines).await?;
        Ok(PaneProgress {
            target: target.to_string(),
            state: ProgressClassifier::infer(&capture.text, current_command),
            command: current_command.map(str::to_string),
        })
    }

    /// Run the diagnostic probes used when panes don't show up
    pub async fn debug(&self) -> DebugReport {
        let probes = [
            ("whoami", "whoami"),
            ("pwd", "pwd"),
            ("tmux_version", "tmux -V"),
            ("list_sessions", LIST_SESSIONS_DEBUG_COMMAND),
            ("list_panes", LIST_PANES_COMMAND),
        ];

        let mut checks = BTreeMap::new();
        for (name, command) in probes {
            let result = self.run(command).await;
            checks.insert(
                name.to_string(),
                DebugCheck {
                    stdout_repr: format!("{:?}", result.stdout),
                    exit_code: result.exit_code,
                    stdout: result.stdout,
                    stderr: result.stderr,
                    attempts: result.attempts,
                },
            );
        }

        let ok = checks.get("whoami").is_some_and(|c| c.exit_code == 0);
        DebugReport { ok, checks }
    }
}

fn failure_code(result: &ExecutionResult) -> String {
    classify_tmux_error(&result.stderr)
        .map(|kind| kind.code())
        .unwrap_or("tmux_error")
        .to_string()
}
