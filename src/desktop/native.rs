use std::sync::Arc;

use super::keys::VirtualKey;
use super::{MonitorGeometry, MouseButton};
use crate::error::{BridgeError, Result};

/// Native mouse and keyboard injection
pub trait InputInjector: Send + Sync {
    /// Move the cursor to a virtual-screen point
    fn move_cursor(&self, x: i32, y: i32) -> Result<()>;
    /// Press and release a button at the cursor
    fn click(&self, button: MouseButton) -> Result<()>;
    fn send_vk(&self, vk: VirtualKey) -> Result<()>;
    fn send_vk_combo(&self, modifier: VirtualKey, vk: VirtualKey) -> Result<()>;
}

/// Geometry of the monitor screenshots are taken from
pub trait MonitorSource: Send + Sync {
    fn primary(&self) -> Result<MonitorGeometry>;
}

/// Backend for hosts without a native desktop
pub struct UnsupportedDesktop;

fn unsupported<T>() -> Result<T> {
    Err(BridgeError::Injection(
        "native input is only available on Windows".into(),
    ))
}

impl InputInjector for UnsupportedDesktop {
    fn move_cursor(&self, _x: i32, _y: i32) -> Result<()> {
        unsupported()
    }

    fn click(&self, _button: MouseButton) -> Result<()> {
        unsupported()
    }

    fn send_vk(&self, _vk: VirtualKey) -> Result<()> {
        unsupported()
    }

    fn send_vk_combo(&self, _modifier: VirtualKey, _vk: VirtualKey) -> Result<()> {
        unsupported()
    }
}

impl MonitorSource for UnsupportedDesktop {
    fn primary(&self) -> Result<MonitorGeometry> {
        unsupported()
    }
}

/// Monitor source and injector for this host
pub fn default_backend() -> (Arc<dyn MonitorSource>, Arc<dyn InputInjector>) {
    #[cfg(windows)]
    {
        (Arc::new(WindowsDesktop), Arc::new(WindowsDesktop))
    }
    #[cfg(not(windows))]
    {
        (Arc::new(UnsupportedDesktop), Arc::new(UnsupportedDesktop))
    }
}

/// `SendInput`-based injection on the interactive desktop
#[cfg(windows)]
pub struct WindowsDesktop;

#[cfg(windows)]
mod win {
    use windows_sys::Win32::UI::Input::KeyboardAndMouse::{
        SendInput, INPUT, INPUT_KEYBOARD, INPUT_MOUSE, KEYEVENTF_KEYUP, MOUSEEVENTF_LEFTDOWN,
        MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MIDDLEDOWN, MOUSEEVENTF_MIDDLEUP, MOUSEEVENTF_RIGHTDOWN,
        MOUSEEVENTF_RIGHTUP,
    };
    use windows_sys::Win32::UI::WindowsAndMessaging::{
        GetSystemMetrics, SetCursorPos, SM_CXSCREEN, SM_CYSCREEN,
    };

    use super::super::{MonitorGeometry, MouseButton};
    use super::{InputInjector, MonitorSource, VirtualKey, WindowsDesktop};
    use crate::error::{BridgeError, Result};

    fn key_input(vk: VirtualKey, up: bool) -> INPUT {
        // SAFETY: INPUT is plain old data; all-zero is a valid value
        let mut input: INPUT = unsafe { std::mem::zeroed() };
        input.r#type = INPUT_KEYBOARD;
        unsafe {
            input.Anonymous.ki.wVk = vk.0;
            input.Anonymous.ki.dwFlags = if up { KEYEVENTF_KEYUP } else { 0 };
        }
        input
    }

    fn mouse_input(flags: u32) -> INPUT {
        // SAFETY: as above
        let mut input: INPUT = unsafe { std::mem::zeroed() };
        input.r#type = INPUT_MOUSE;
        unsafe {
            input.Anonymous.mi.dwFlags = flags;
        }
        input
    }

    fn send(inputs: &[INPUT]) -> Result<()> {
        let sent = unsafe {
            SendInput(
                inputs.len() as u32,
                inputs.as_ptr(),
                std::mem::size_of::<INPUT>() as i32,
            )
        };
        if sent as usize != inputs.len() {
            return Err(BridgeError::Injection(format!(
                "SendInput injected {} of {} events: {}",
                sent,
                inputs.len(),
                std::io::Error::last_os_error()
            )));
        }
        Ok(())
    }

    impl InputInjector for WindowsDesktop {
        fn move_cursor(&self, x: i32, y: i32) -> Result<()> {
            if unsafe { SetCursorPos(x, y) } == 0 {
                return Err(BridgeError::Injection(format!(
                    "SetCursorPos failed: {}",
                    std::io::Error::last_os_error()
                )));
            }
            Ok(())
        }

        fn click(&self, button: MouseButton) -> Result<()> {
            let (down, up) = match button {
                MouseButton::Left => (MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP),
                MouseButton::Right => (MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP),
                MouseButton::Middle => (MOUSEEVENTF_MIDDLEDOWN, MOUSEEVENTF_MIDDLEUP),
            };
            send(&[mouse_input(down), mouse_input(up)])
        }

        fn send_vk(&self, vk: VirtualKey) -> Result<()> {
            send(&[key_input(vk, false), key_input(vk, true)])
        }

        fn send_vk_combo(&self, modifier: VirtualKey, vk: VirtualKey) -> Result<()> {
            send(&[
                key_input(modifier, false),
                key_input(vk, false),
                key_input(vk, true),
                key_input(modifier, true),
            ])
        }
    }

    impl MonitorSource for WindowsDesktop {
        fn primary(&self) -> Result<MonitorGeometry> {
            let (width, height) =
                unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) };
            if width <= 0 || height <= 0 {
                return Err(BridgeError::Injection("no primary monitor".into()));
            }
            Ok(MonitorGeometry {
                left: 0,
                top: 0,
                width: width as u32,
                height: height as u32,
            })
        }
    }
}
