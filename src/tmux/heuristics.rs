use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Coarse progress state of a pane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProgressState {
    /// Nothing in flight, prompt showing
    #[default]
    Idle,
    /// A command is in flight
    Running,
    /// Blocked on a yes/no approval
    Waiting,
    /// A failure is on screen
    Error,
}

impl ProgressState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Waiting => "waiting",
            Self::Error => "error",
        }
    }
}

static RE_ERROR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)(Traceback|[Ff]ailed to open|^\s*[Ee]rror:|panicked at|^fatal:)").unwrap()
});

static RE_WAITING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\(y/n\)|\[y/n\]|\[yes/no\]|\bapprove\b|do you want to proceed|allow this)")
        .unwrap()
});

// `%` is zsh's prompt; a digit before it is a progress percentage
static RE_PROMPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:[$#>❯›]|(?:^|[^0-9])%)\s*$").unwrap());

const PLAIN_SHELLS: &[&str] = &["bash", "zsh", "sh", "fish", "dash", "ksh", "tmux"];

static RE_READY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bready\b").unwrap());

const RECENT_LINES: usize = 20;

/// Classifies raw screen text into a [`ProgressState`]
pub struct ProgressClassifier;

impl ProgressClassifier {
    /// Infer the state from screen text and the command believed in flight.
    ///
    /// Precedence: error > waiting > running > idle. A prompt blocks forward
    /// progress, so it outranks a command in flight.
    pub fn infer(screen: &str, current_command: Option<&str>) -> ProgressState {
        let recent = recent_lines(screen);

        if RE_ERROR.is_match(&recent) {
            return ProgressState::Error;
        }

        if RE_WAITING.is_match(&recent) {
            return ProgressState::Waiting;
        }

        let in_flight = current_command.is_some_and(|c| !c.trim().is_empty());
        if in_flight && !shows_idle_marker(&recent) {
            return ProgressState::Running;
        }

        ProgressState::Idle
    }
}

/// Shorthand for [`ProgressClassifier::infer`]
pub fn infer_state(screen: &str, current_command: Option<&str>) -> ProgressState {
    ProgressClassifier::infer(screen, current_command)
}

/// The pane's foreground command as a job in flight, or `None` when it is
/// just the interactive shell (login shells show up as `-bash`)
pub fn foreground_job(pane_command: &str) -> Option<&str> {
    let name = pane_command.trim();
    let base = name.trim_start_matches('-').rsplit('/').next().unwrap_or(name);
    if base.is_empty() || PLAIN_SHELLS.contains(&base) {
        None
    } else {
        Some(name)
    }
}

fn recent_lines(content: &str) -> String {
    let lines: Vec<&str> = content.lines().rev().take(RECENT_LINES).collect();
    lines.into_iter().rev().collect::<Vec<_>>().join("\n")
}

fn shows_idle_marker(recent: &str) -> bool {
    let last = recent.lines().rev().find(|line| !line.trim().is_empty());
    match last {
        Some(line) => RE_PROMPT.is_match(line) || RE_READY.is_match(recent),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_error() {
        assert_eq!(infer_state("Traceback: failed to open file", None), ProgressState::Error);
        assert_eq!(
            infer_state("compiling\nerror: could not compile", None),
            ProgressState::Error
        );
    }

    #[test]
    fn test_error_beats_command_in_flight() {
        let screen = "Traceback (most recent call last):\n  File \"x.py\"";
        assert_eq!(infer_state(screen, Some("python")), ProgressState::Error);
    }

    #[test]
    fn test_detect_waiting() {
        assert_eq!(
            infer_state("Please approve this command (y/n)", None),
            ProgressState::Waiting
        );
        assert_eq!(
            infer_state("Overwrite file? [y/N]", Some("codex")),
            ProgressState::Waiting
        );
    }

    #[test]
    fn test_running_from_command() {
        assert_eq!(infer_state("", Some("codex")), ProgressState::Running);
        assert_eq!(
            infer_state("Compiling wsl-bridge v0.1.0", Some("cargo")),
            ProgressState::Running
        );
    }

    #[test]
    fn test_prompt_means_idle_even_with_command() {
        assert_eq!(
            infer_state("done\nmegha@host:~$ ", Some("bash")),
            ProgressState::Idle
        );
        assert_eq!(infer_state("ready", Some("codex")), ProgressState::Idle);
    }

    #[test]
    fn test_zsh_prompt_means_idle() {
        assert_eq!(infer_state("megha@host ~ % ", Some("zsh")), ProgressState::Idle);
        assert_eq!(infer_state("host%", Some("codex")), ProgressState::Idle);
        // a trailing percentage is progress, not a prompt
        assert_eq!(
            infer_state("Downloading crates 45%", Some("cargo")),
            ProgressState::Running
        );
    }

    #[test]
    fn test_foreground_job_skips_shells() {
        assert_eq!(foreground_job("zsh"), None);
        assert_eq!(foreground_job("-bash"), None);
        assert_eq!(foreground_job("/usr/bin/fish"), None);
        assert_eq!(foreground_job("tmux"), None);
        assert_eq!(foreground_job(""), None);
        assert_eq!(foreground_job("codex"), Some("codex"));
        assert_eq!(foreground_job("node"), Some("node"));
        // idle shell with an unknown prompt stays idle
        assert_eq!(
            infer_state("weird prompt ::", foreground_job("zsh")),
            ProgressState::Idle
        );
    }

    #[test]
    fn test_detect_idle() {
        assert_eq!(infer_state("ready", None), ProgressState::Idle);
        assert_eq!(infer_state("", None), ProgressState::Idle);
        assert_eq!(infer_state("some output", Some("  ")), ProgressState::Idle);
    }

    #[test]
    fn test_only_recent_lines_count() {
        let mut screen = String::from("Traceback: old failure\n");
        for i in 0..30 {
            screen.push_str(&format!("line {}\n", i));
        }
        assert_eq!(infer_state(&screen, None), ProgressState::Idle);
    }

    #[test]
    fn test_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ProgressState::Waiting).unwrap(),
            "\"waiting\""
        );
        assert_eq!(ProgressState::Running.as_str(), "running");
    }
}
