//! Host-side bridge to tmux sessions running inside WSL.
//!
//! Commands go through the [`wsl::Executor`], which rides out the spurious
//! interrupted exit seen right after the subsystem cold-starts. On top of it
//! sit the tmux session model, health probe and progress classifier; the
//! [`stream::UpdateStreamer`] samples those and pushes named events.

pub mod access;
pub mod config;
pub mod desktop;
pub mod error;
pub mod stream;
pub mod tmux;
pub mod wsl;

use std::sync::Arc;

use config::BridgeConfig;
use desktop::InputCoordinator;
use stream::UpdateStreamer;
use tmux::TmuxClient;
use wsl::Executor;

/// All bridge components, wired from one immutable configuration
#[derive(Clone)]
pub struct Bridge {
    pub config: Arc<BridgeConfig>,
    pub executor: Arc<Executor>,
    pub tmux: TmuxClient,
    pub input: InputCoordinator,
}

impl Bridge {
    pub fn new(config: BridgeConfig) -> Self {
        let executor = Arc::new(Executor::from_config(&config));
        tracing::debug!(
            "WSL entry point {:?}, {:?}",
            executor.program(),
            executor.policy()
        );

        let (monitors, injector) = desktop::default_backend();
        Self {
            tmux: TmuxClient::new(executor.clone()),
            input: InputCoordinator::new(monitors, injector),
            executor,
            config: Arc::new(config),
        }
    }

    /// A fresh streamer for one client connection
    pub fn streamer(&self) -> UpdateStreamer {
        UpdateStreamer::new(self.tmux.clone(), self.config.stream.clone())
    }
}
