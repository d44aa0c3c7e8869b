//! Desktop input: click scaling and native key routing

mod keys;
mod native;

pub use keys::{lookup_key, KeyAction, VirtualKey};
pub use native::{default_backend, InputInjector, MonitorSource, UnsupportedDesktop};

#[cfg(windows)]
pub use native::WindowsDesktop;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{BridgeError, Result};

/// One physical display region in virtual-screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorGeometry {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

impl std::str::FromStr for MouseButton {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "middle" => Ok(Self::Middle),
            other => Err(BridgeError::InvalidArgument(format!(
                "unknown mouse button {:?}",
                other
            ))),
        }
    }
}

/// A click as requested by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct ClickRequest {
    pub x: Option<i64>,
    pub y: Option<i64>,
    /// Size the UI rendered the screenshot at, if different from the monitor
    pub render_w: Option<i64>,
    pub render_h: Option<i64>,
    #[serde(default)]
    pub button: MouseButton,
    #[serde(default)]
    pub double: bool,
}

/// Result of a click
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClickOutcome {
    pub ok: bool,
    pub exit_code: i32,
    pub button: MouseButton,
    pub double: bool,
    /// Monitor-relative point that was clicked, `None` for the cursor position
    pub x: Option<i64>,
    pub y: Option<i64>,
}

/// Result of a key press
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyOutcome {
    pub ok: bool,
    pub exit_code: i32,
    pub key: String,
    /// `native` for a single key, `native_combo` for modifier combos
    pub mode: &'static str,
}

/// Map a UI point onto the monitor.
///
/// Without a render size the point is taken as already monitor-relative.
pub fn scale_point(
    x: i64,
    y: i64,
    render: Option<(i64, i64)>,
    monitor: &MonitorGeometry,
) -> Result<(i64, i64)> {
    let Some((render_w, render_h)) = render else {
        return Ok((x, y));
    };
    if render_w <= 0 || render_h <= 0 {
        return Err(BridgeError::InvalidArgument(
            "render_w and render_h must be positive".into(),
        ));
    }

    let sx = (x as f64 * f64::from(monitor.width) / render_w as f64).round() as i64;
    let sy = (y as f64 * f64::from(monitor.height) / render_h as f64).round() as i64;
    Ok((sx, sy))
}

fn pair<T>(a: Option<T>, b: Option<T>, what: &str) -> Result<Option<(T, T)>> {
    match (a, b) {
        (Some(a), Some(b)) => Ok(Some((a, b))),
        (None, None) => Ok(None),
        _ => Err(BridgeError::InvalidArgument(format!(
            "{} must be provided together",
            what
        ))),
    }
}

/// Routes UI input actions to the native injection backend
#[derive(Clone)]
pub struct InputCoordinator {
    monitors: Arc<dyn MonitorSource>,
    injector: Arc<dyn InputInjector>,
}

impl InputCoordinator {
    pub fn new(monitors: Arc<dyn MonitorSource>, injector: Arc<dyn InputInjector>) -> Self {
        Self { monitors, injector }
    }

    /// Scale a UI click onto the monitor and inject it
    pub fn scale_and_click(&self, req: ClickRequest) -> Result<ClickOutcome> {
        let point = pair(req.x, req.y, "x and y")?;
        let render = pair(req.render_w, req.render_h, "render_w and render_h")?;

        let scaled = match point {
            Some((x, y)) => {
                let monitor = self.monitors.primary()?;
                let (sx, sy) = scale_point(x, y, render, &monitor)?;
                let abs_x = i64::from(monitor.left) + sx;
                let abs_y = i64::from(monitor.top) + sy;
                tracing::debug!(x, y, sx, sy, "click at ({}, {})", abs_x, abs_y);
                self.injector.move_cursor(to_i32(abs_x)?, to_i32(abs_y)?)?;
                Some((sx, sy))
            }
            None => None,
        };

        let clicks = if req.double { 2 } else { 1 };
        for _ in 0..clicks {
            self.injector.click(req.button)?;
        }

        Ok(ClickOutcome {
            ok: true,
            exit_code: 0,
            button: req.button,
            double: req.double,
            x: scaled.map(|(x, _)| x),
            y: scaled.map(|(_, y)| y),
        })
    }

    /// Press a named key or combo
    pub fn send_key(&self, key_name: &str) -> Result<KeyOutcome> {
        let action =
            lookup_key(key_name).ok_or_else(|| BridgeError::UnsupportedKey(key_name.to_string()))?;

        let mode = match action {
            KeyAction::Single(vk) => {
                self.injector.send_vk(vk)?;
                "native"
            }
            KeyAction::Combo(modifier, vk) => {
                self.injector.send_vk_combo(modifier, vk)?;
                "native_combo"
            }
        };

        Ok(KeyOutcome {
            ok: true,
            exit_code: 0,
            key: key_name.trim().to_ascii_lowercase(),
            mode,
        })
    }
}

fn to_i32(v: i64) -> Result<i32> {
    i32::try_from(v)
        .map_err(|_| BridgeError::InvalidArgument(format!("coordinate {} out of range", v)))
}
