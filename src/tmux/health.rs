use serde::Serialize;

use super::client::{classify_tmux_error, TmuxClient, TmuxErrorKind};

/// Coarse tmux server state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// Server up with at least one session
    Ok,
    /// Server up, no sessions
    Empty,
    /// No server started yet; an idle steady state, not a failure
    NoServer,
}

/// Result of a health probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<HealthState>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthReport {
    fn state(state: HealthState, count: usize) -> Self {
        Self {
            ok: true,
            state: Some(state),
            count,
            error: None,
        }
    }

    fn failed() -> Self {
        Self {
            ok: false,
            state: None,
            count: 0,
            error: Some("tmux_error".to_string()),
        }
    }
}

impl TmuxClient {
    /// Summarize server reachability and session count
    pub async fn health(&self) -> HealthReport {
        let result = self.run("tmux list-sessions").await;

        if result.success() {
            let count = result
                .stdout
                .lines()
                .filter(|line| !line.trim().is_empty())
                .count();
            let state = if count == 0 {
                HealthState::Empty
            } else {
                HealthState::Ok
            };
            return HealthReport::state(state, count);
        }

        if classify_tmux_error(&result.stderr) == Some(TmuxErrorKind::ServerNotRunning) {
            return HealthReport::state(HealthState::NoServer, 0);
        }

        tracing::debug!(
            exit_code = result.exit_code,
            "tmux list-sessions failed: {}",
            result.stderr.trim()
        );
        HealthReport::failed()
    }
}
