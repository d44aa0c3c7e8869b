pub(crate) mod client;
mod health;
mod heuristics;

pub use client::{
    classify_tmux_error, is_valid_session_name, parse_pane_line, shell_quote, TmuxClient,
    TmuxErrorKind, LIST_PANES_COMMAND,
};
pub use health::{HealthReport, HealthState};
pub use heuristics::{foreground_job, infer_state, ProgressClassifier, ProgressState};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One pane as reported by `tmux list-panes -a`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pane {
    pub session: String,
    pub window_index: String,
    /// `1` for the session's active window
    pub window_flag: String,
    /// Pane id, e.g. `%3`
    pub pane_id: String,
    pub pane_index: String,
    /// Foreground command running in the pane
    pub command: String,
    /// Working directory of the pane
    pub path: String,
}

/// Fresh pane listing across all sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaneListing {
    pub ok: bool,
    pub panes: Vec<Pane>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

impl PaneListing {
    /// Distinct session names, in listing order
    pub fn sessions(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for pane in &self.panes {
            if !names.contains(&pane.session.as_str()) {
                names.push(&pane.session);
            }
        }
        names
    }

    /// Panes grouped by session name
    pub fn by_session(&self) -> BTreeMap<&str, Vec<&Pane>> {
        let mut map: BTreeMap<&str, Vec<&Pane>> = BTreeMap::new();
        for pane in &self.panes {
            map.entry(pane.session.as_str()).or_default().push(pane);
        }
        map
    }
}

/// Outcome of `new-session`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateOutcome {
    pub ok: bool,
    /// Name that was requested, if any
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of `kill-session`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloseOutcome {
    pub ok: bool,
    pub session: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Captured screen text of one pane
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScreenCapture {
    pub ok: bool,
    pub target: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of typing into a pane
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendOutcome {
    pub ok: bool,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Progress state of one pane
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaneProgress {
    pub target: String,
    pub state: ProgressState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

/// One diagnostic probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebugCheck {
    pub exit_code: i64,
    pub stdout: String,
    pub stderr: String,
    /// Escaped rendering of stdout, shows stray `\t` and control bytes
    pub stdout_repr: String,
    pub attempts: u32,
}

/// Result of the diagnostic probe set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebugReport {
    pub ok: bool,
    pub checks: BTreeMap<String, DebugCheck>,
}
