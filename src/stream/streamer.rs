use bytes::Bytes;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::encode_event;
use crate::config::StreamSettings;
use crate::error::Result;
use crate::tmux::{foreground_job, HealthReport, PaneListing, PaneProgress, TmuxClient};

/// One sampled view of the bridge
#[derive(Debug, Clone, Serialize)]
pub struct Sample {
    pub health: HealthReport,
    pub panes: PaneListing,
    pub progress: Vec<PaneProgress>,
}

/// Periodically samples tmux state and pushes changed events to a client
pub struct UpdateStreamer {
    tmux: TmuxClient,
    settings: StreamSettings,
}

impl UpdateStreamer {
    pub fn new(tmux: TmuxClient, settings: StreamSettings) -> Self {
        Self { tmux, settings }
    }

    /// Sample health, panes and per-pane progress once
    pub async fn sample(&self) -> Sample {
        let health = self.tmux.health().await;
        let panes = self.tmux.list_panes().await;

        let mut progress = Vec::with_capacity(panes.panes.len());
        for pane in &panes.panes {
            let job = foreground_job(&pane.command);
            match self
                .tmux
                .progress(&pane.pane_id, job, self.settings.capture_lines)
                .await
            {
                Ok(p) => progress.push(p),
                Err(e) => tracing::debug!("Skipping pane {}: {}", pane.pane_id, e),
            }
        }

        Sample {
            health,
            panes,
            progress,
        }
    }

    fn frames(sample: &Sample) -> Result<Vec<(&'static str, Bytes)>> {
        Ok(vec![
            ("health", encode_event("health", &sample.health)?),
            ("panes", encode_event("panes", &sample.panes)?),
            (
                "progress",
                encode_event("progress", &json!({ "panes": sample.progress }))?,
            ),
        ])
    }

    /// Stream until `cancel` fires or the receiving side goes away.
    ///
    /// Each event is sent as one fully encoded frame; unchanged events are
    /// suppressed and a heartbeat fills quiet stretches.
    pub async fn run(self, sink: mpsc::Sender<Bytes>, cancel: CancellationToken) -> Result<()> {
        let mut ticker = tokio::time::interval(self.settings.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last: HashMap<&'static str, Bytes> = HashMap::new();
        let mut tick: u64 = 0;
        let mut quiet_ticks: u32 = 0;

        tracing::info!("Update stream started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sink.closed() => break,
                _ = ticker.tick() => {}
            }
            tick += 1;

            let sample = tokio::select! {
                _ = cancel.cancelled() => break,
                sample = self.sample() => sample,
            };

            let mut changed = false;
            for (name, frame) in Self::frames(&sample)? {
                if last.get(name) == Some(&frame) {
                    continue;
                }
                if sink.send(frame.clone()).await.is_err() {
                    tracing::info!("Update stream client went away");
                    return Ok(());
                }
                last.insert(name, frame);
                changed = true;
            }

            if changed {
                quiet_ticks = 0;
                continue;
            }

            quiet_ticks += 1;
            if self.settings.heartbeat_ticks > 0 && quiet_ticks >= self.settings.heartbeat_ticks {
                quiet_ticks = 0;
                let frame = encode_event("heartbeat", &json!({ "tick": tick }))?;
                if sink.send(frame).await.is_err() {
                    break;
                }
            }
        }

        tracing::info!("Update stream stopped");
        Ok(())
    }

    /// Run on its own task, independent of any request's executor calls
    pub fn spawn(
        self,
        buffer: usize,
        cancel: CancellationToken,
    ) -> (mpsc::Receiver<Bytes>, JoinHandle<Result<()>>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let handle = tokio::spawn(self.run(tx, cancel));
        (rx, handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wsl::{ExecutionResult, ShellExecutor};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Answers tmux commands from a mutable screen
    struct FakeTmux {
        screen: Mutex<String>,
        pane_command: &'static str,
    }

    impl FakeTmux {
        fn new(screen: &str) -> Arc<Self> {
            Self::running(screen, "codex")
        }

        fn running(screen: &str, pane_command: &'static str) -> Arc<Self> {
            Arc::new(Self {
                screen: Mutex::new(screen.to_string()),
                pane_command,
            })
        }

        fn set_screen(&self, screen: &str) {
            *self.screen.lock().unwrap() = screen.to_string();
        }
    }

    #[async_trait]
    impl ShellExecutor for FakeTmux {
        async fn execute(&self, command: &str) -> ExecutionResult {
            let stdout = if command.starts_with("tmux list-sessions") {
                "codex: 1 windows".to_string()
            } else if command.starts_with("tmux list-panes") {
                format!("codex\t0\t1\t%1\t0\t{}\t/home/megha", self.pane_command)
            } else if command.starts_with("tmux capture-pane") {
                self.screen.lock().unwrap().clone()
            } else {
                String::new()
            };
            ExecutionResult {
                stdout,
                stderr: String::new(),
                exit_code: 0,
                attempts: 1,
            }
        }
    }

    fn settings(heartbeat_ticks: u32) -> StreamSettings {
        StreamSettings {
            interval_ms: 1000,
            capture_lines: 20,
            heartbeat_ticks,
        }
    }

    fn event_name(frame: &Bytes) -> String {
        let s = std::str::from_utf8(frame).unwrap();
        s.lines().next().unwrap().trim_start_matches("event: ").to_string()
    }

    #[tokio::test(start_paused = true)]
    async fn test_emits_initial_snapshot_then_changes() {
        let fake = FakeTmux::new("working on it");
        let streamer = UpdateStreamer::new(TmuxClient::new(fake.clone()), settings(0));
        let (mut rx, handle) = streamer.spawn(8, CancellationToken::new());

        let names: Vec<String> = [
            rx.recv().await.unwrap(),
            rx.recv().await.unwrap(),
            rx.recv().await.unwrap(),
        ]
        .iter()
        .map(event_name)
        .collect();
        assert_eq!(names, vec!["health", "panes", "progress"]);

        fake.set_screen("Traceback: failed to open file");
        let frame = rx.recv().await.unwrap();
        let s = std::str::from_utf8(&frame).unwrap();
        assert!(s.starts_with("event: progress\n"));
        assert!(s.contains(r#""state":"error""#));

        drop(rx);
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_when_quiet() {
        let fake = FakeTmux::new("megha@host:~$ ");
        let streamer = UpdateStreamer::new(TmuxClient::new(fake), settings(2));
        let (mut rx, _handle) = streamer.spawn(8, CancellationToken::new());

        for _ in 0..3 {
            rx.recv().await.unwrap();
        }
        let frame = rx.recv().await.unwrap();
        assert_eq!(event_name(&frame), "heartbeat");
        assert_eq!(&frame[..], b"event: heartbeat\ndata: {\"tick\":3}\n\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_loop() {
        let fake = FakeTmux::new("");
        let cancel = CancellationToken::new();
        let streamer = UpdateStreamer::new(TmuxClient::new(fake), settings(0));
        let (mut rx, handle) = streamer.spawn(8, cancel.clone());

        rx.recv().await.unwrap();
        cancel.cancel();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_sample_infers_progress() {
        let fake = FakeTmux::new("Do you want to proceed? (y/n)");
        let streamer = UpdateStreamer::new(TmuxClient::new(fake), settings(0));

        let sample = streamer.sample().await;
        assert_eq!(sample.health.count, 1);
        assert_eq!(sample.panes.panes.len(), 1);
        assert_eq!(sample.progress[0].state, crate::tmux::ProgressState::Waiting);
        assert_eq!(sample.progress[0].command.as_deref(), Some("codex"));
    }

    #[tokio::test]
    async fn test_idle_shell_is_not_running() {
        let fake = FakeTmux::running("megha@host ~ % ", "zsh");
        let streamer = UpdateStreamer::new(TmuxClient::new(fake), settings(0));

        let sample = streamer.sample().await;
        assert_eq!(sample.progress[0].state, crate::tmux::ProgressState::Idle);
        assert_eq!(sample.progress[0].command, None);
    }

    #[tokio::test]
    async fn test_shell_with_unknown_prompt_is_idle() {
        let fake = FakeTmux::running("[megha@host]:: ", "-bash");
        let streamer = UpdateStreamer::new(TmuxClient::new(fake), settings(0));

        let sample = streamer.sample().await;
        assert_eq!(sample.progress[0].state, crate::tmux::ProgressState::Idle);
    }
}
