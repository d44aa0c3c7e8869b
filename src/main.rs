use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use wsl_bridge::access::ErrorOutcome;
use wsl_bridge::config::{self, BridgeConfig};
use wsl_bridge::desktop::{ClickRequest, MouseButton};
use wsl_bridge::error::BridgeError;
use wsl_bridge::wsl::ShellExecutor;
use wsl_bridge::Bridge;

#[derive(Parser)]
#[command(name = "wsl-bridge")]
#[command(about = "Drive tmux sessions inside WSL and stream their state")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// WSL entry executable (overrides config)
    #[arg(long, env = "WSL_EXE")]
    wsl_exe: Option<String>,

    /// Require a token for streaming (overrides config)
    #[arg(
        long,
        env = "BRIDGE_AUTH_REQUIRED",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    auth_required: Option<bool>,

    /// Expected token (overrides config)
    #[arg(long, env = "BRIDGE_AUTH_TOKEN", hide_env_values = true)]
    auth_token: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a shell command inside WSL
    Exec { command: String },
    /// List panes across all sessions
    Panes,
    /// Create a detached session
    New { name: Option<String> },
    /// Kill a session
    Kill { name: String },
    /// tmux server health
    Health,
    /// Diagnostic probes
    Debug,
    /// Print a pane's screen
    Capture {
        target: String,
        #[arg(long, default_value_t = 40)]
        lines: u32,
    },
    /// Infer a pane's progress state
    State {
        target: String,
        /// Command believed to be running in the pane
        #[arg(long)]
        command: Option<String>,
    },
    /// Type text into a pane
    Send {
        target: String,
        text: String,
        #[arg(long)]
        enter: bool,
    },
    /// Press a named key on the desktop
    Key { name: String },
    /// Click on the desktop
    Click {
        #[arg(long)]
        x: Option<i64>,
        #[arg(long)]
        y: Option<i64>,
        #[arg(long)]
        render_w: Option<i64>,
        #[arg(long)]
        render_h: Option<i64>,
        #[arg(long, default_value = "left")]
        button: MouseButton,
        #[arg(long)]
        double: bool,
    },
    /// Stream update events to stdout until interrupted
    Watch {
        #[arg(long, env = "BRIDGE_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
}

fn load_config(args: &Args) -> Result<BridgeConfig> {
    let mut config = if let Some(path) = &args.config {
        config::load_config(path).with_context(|| format!("Failed to load config from {:?}", path))?
    } else {
        let default_path = config::default_config_path();
        if default_path.exists() {
            config::load_config(&default_path)
                .with_context(|| format!("Failed to load config from {:?}", default_path))?
        } else {
            tracing::debug!("Using default configuration");
            BridgeConfig::default()
        }
    };

    if let Some(exe) = &args.wsl_exe {
        config.entry_executable = exe.clone();
    }
    if let Some(required) = args.auth_required {
        config.auth.required = required;
    }
    if let Some(token) = &args.auth_token {
        config.auth.token = token.clone();
    }
    config.validate()?;
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report(err: BridgeError) -> Result<()> {
    let outcome = ErrorOutcome::from(&err);
    print_json(&outcome)?;
    std::process::exit(if outcome.status == 500 { 1 } else { 2 });
}

async fn watch(bridge: &Bridge, token: Option<&str>) -> Result<()> {
    if let Err(e) = bridge.config.auth.check(token) {
        return report(e);
    }

    let cancel = CancellationToken::new();
    let (mut rx, handle) = bridge.streamer().spawn(16, cancel.clone());

    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let mut stdout = std::io::stdout();
    while let Some(frame) = rx.recv().await {
        if stdout.write_all(&frame).and_then(|_| stdout.flush()).is_err() {
            // Reader closed the pipe
            cancel.cancel();
            break;
        }
    }
    drop(rx);

    handle.await.context("update stream task panicked")??;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&args)?;
    let bridge = Bridge::new(config);
    let capture_lines = bridge.config.stream.capture_lines;

    match args.command {
        Command::Exec { command } => print_json(&bridge.executor.execute(&command).await),
        Command::Panes => print_json(&bridge.tmux.list_panes().await),
        Command::New { name } => match bridge.tmux.create_session(name.as_deref()).await {
            Ok(out) => print_json(&out),
            Err(e) => report(e),
        },
        Command::Kill { name } => match bridge.tmux.close_session(&name).await {
            Ok(out) => print_json(&out),
            Err(e) => report(e),
        },
        Command::Health => print_json(&bridge.tmux.health().await),
        Command::Debug => print_json(&bridge.tmux.debug().await),
        Command::Capture { target, lines } => match bridge.tmux.capture_pane(&target, lines).await {
            Ok(out) => print_json(&out),
            Err(e) => report(e),
        },
        Command::State { target, command } => {
            match bridge
                .tmux
                .progress(&target, command.as_deref(), capture_lines)
                .await
            {
                Ok(out) => print_json(&out),
                Err(e) => report(e),
            }
        }
        Command::Send {
            target,
            text,
            enter,
        } => match bridge.tmux.send_text(&target, &text, enter).await {
            Ok(out) => print_json(&out),
            Err(e) => report(e),
        },
        Command::Key { name } => match bridge.input.send_key(&name) {
            Ok(out) => print_json(&out),
            Err(e) => report(e),
        },
        Command::Click {
            x,
            y,
            render_w,
            render_h,
            button,
            double,
        } => {
            let req = ClickRequest {
                x,
                y,
                render_w,
                render_h,
                button,
                double,
            };
            match bridge.input.scale_and_click(req) {
                Ok(out) => print_json(&out),
                Err(e) => report(e),
            }
        }
        Command::Watch { token } => watch(&bridge, token.as_deref()).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("wsl-bridge").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_auth_required_accepts_boolish_values() {
        let cases = [
            ("1", true),
            ("yes", true),
            ("on", true),
            ("0", false),
            ("off", false),
        ];
        for (value, expected) in cases {
            let args = parse(&["--auth-required", value, "health"]);
            assert_eq!(args.auth_required, Some(expected), "value {:?}", value);
        }
    }

    #[test]
    fn test_auth_required_rejects_garbage() {
        let res = Args::try_parse_from(["wsl-bridge", "--auth-required", "maybe", "health"]);
        assert!(res.is_err());
    }

    #[test]
    fn test_override_applies_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.toml");
        std::fs::write(&path, "").unwrap();
        let path = path.to_string_lossy().into_owned();

        let args = parse(&[
            "--config",
            &path,
            "--auth-required",
            "1",
            "--auth-token",
            "secret",
            "health",
        ]);
        let config = load_config(&args).unwrap();
        assert!(config.auth.required);
        assert_eq!(config.auth.token, "secret");
    }
}
