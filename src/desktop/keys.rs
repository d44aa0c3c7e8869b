use serde::Serialize;

/// Windows virtual-key code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct VirtualKey(pub u16);

impl VirtualKey {
    pub const BACK: Self = Self(0x08);
    pub const TAB: Self = Self(0x09);
    pub const RETURN: Self = Self(0x0D);
    pub const SHIFT: Self = Self(0x10);
    pub const CONTROL: Self = Self(0x11);
    pub const MENU: Self = Self(0x12);
    pub const ESCAPE: Self = Self(0x1B);
    pub const SPACE: Self = Self(0x20);
    pub const PRIOR: Self = Self(0x21);
    pub const NEXT: Self = Self(0x22);
    pub const END: Self = Self(0x23);
    pub const HOME: Self = Self(0x24);
    pub const LEFT: Self = Self(0x25);
    pub const UP: Self = Self(0x26);
    pub const RIGHT: Self = Self(0x27);
    pub const DOWN: Self = Self(0x28);
    pub const DELETE: Self = Self(0x2E);
    pub const F1: Self = Self(0x70);

    /// Letter keys share their uppercase ASCII code
    const fn letter(c: u8) -> Self {
        Self(c.to_ascii_uppercase() as u16)
    }
}

/// What a symbolic key name injects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Single(VirtualKey),
    /// Modifier held around a key
    Combo(VirtualKey, VirtualKey),
}

/// Resolve a key name; `None` means unsupported
pub fn lookup_key(name: &str) -> Option<KeyAction> {
    use KeyAction::{Combo, Single};

    let name = name.trim().to_ascii_lowercase();
    let action = match name.as_str() {
        "enter" | "return" => Single(VirtualKey::RETURN),
        "tab" => Single(VirtualKey::TAB),
        "escape" | "esc" => Single(VirtualKey::ESCAPE),
        "backspace" => Single(VirtualKey::BACK),
        "delete" | "del" => Single(VirtualKey::DELETE),
        "space" => Single(VirtualKey::SPACE),
        "up" => Single(VirtualKey::UP),
        "down" => Single(VirtualKey::DOWN),
        "left" => Single(VirtualKey::LEFT),
        "right" => Single(VirtualKey::RIGHT),
        "home" => Single(VirtualKey::HOME),
        "end" => Single(VirtualKey::END),
        "pageup" => Single(VirtualKey::PRIOR),
        "pagedown" => Single(VirtualKey::NEXT),
        "shift+tab" => Combo(VirtualKey::SHIFT, VirtualKey::TAB),
        "alt+tab" => Combo(VirtualKey::MENU, VirtualKey::TAB),
        "alt+f4" => Combo(VirtualKey::MENU, VirtualKey(VirtualKey::F1.0 + 3)),
        other => {
            if let Some(n) = other.strip_prefix('f').and_then(|n| n.parse::<u16>().ok()) {
                return (1..=12)
                    .contains(&n)
                    .then(|| Single(VirtualKey(VirtualKey::F1.0 + n - 1)));
            }
            let letter = other.strip_prefix("ctrl+")?;
            return match letter.as_bytes() {
                [c @ (b'a' | b'c' | b'd' | b'l' | b's' | b'v' | b'x' | b'z')] => {
                    Some(Combo(VirtualKey::CONTROL, VirtualKey::letter(*c)))
                }
                _ => None,
            };
        }
    };
    Some(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_keys() {
        assert_eq!(lookup_key("backspace"), Some(KeyAction::Single(VirtualKey::BACK)));
        assert_eq!(lookup_key(" Enter "), Some(KeyAction::Single(VirtualKey::RETURN)));
        assert_eq!(lookup_key("esc"), lookup_key("escape"));
        assert_eq!(lookup_key("f5"), Some(KeyAction::Single(VirtualKey(0x74))));
    }

    #[test]
    fn test_combos() {
        assert_eq!(
            lookup_key("ctrl+c"),
            Some(KeyAction::Combo(VirtualKey::CONTROL, VirtualKey(0x43)))
        );
        assert_eq!(
            lookup_key("alt+f4"),
            Some(KeyAction::Combo(VirtualKey::MENU, VirtualKey(0x73)))
        );
        assert_eq!(
            lookup_key("shift+tab"),
            Some(KeyAction::Combo(VirtualKey::SHIFT, VirtualKey::TAB))
        );
    }

    #[test]
    fn test_unsupported() {
        assert_eq!(lookup_key("capslock"), None);
        assert_eq!(lookup_key("ctrl+q"), None);
        assert_eq!(lookup_key("f13"), None);
        assert_eq!(lookup_key("f"), None);
        assert_eq!(lookup_key(""), None);
    }
}
