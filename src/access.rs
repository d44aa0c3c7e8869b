//! Request-scoped access policy: token auth, UI mode flags, redirect safety

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

pub const DESKTOP_MODE_COOKIE: &str = "bridge_desktop_mode";
pub const COMPACT_MODE_COOKIE: &str = "bridge_compact_mode";

/// Token authentication settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub required: bool,
    pub token: String,
}

impl AuthConfig {
    /// Valid when auth is off, or when the token matches a non-empty secret
    pub fn is_valid_token(&self, presented: Option<&str>) -> bool {
        if !self.required {
            return true;
        }
        match presented {
            Some(token) => !token.is_empty() && !self.token.is_empty() && token == self.token,
            None => false,
        }
    }

    pub fn check(&self, presented: Option<&str>) -> Result<(), BridgeError> {
        if self.is_valid_token(presented) {
            Ok(())
        } else {
            tracing::warn!("Rejected request with missing or invalid token");
            Err(BridgeError::Unauthorized)
        }
    }
}

/// Defaults applied when neither query nor cookie sets a mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeDefaults {
    pub desktop_default: bool,
    pub compact_default: bool,
}

impl Default for ModeDefaults {
    fn default() -> Self {
        Self {
            desktop_default: true,
            compact_default: false,
        }
    }
}

fn parse_flag(value: &str, extra_on: &[&str]) -> Option<bool> {
    let v = value.trim().to_ascii_lowercase();
    match v.as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ if extra_on.contains(&v.as_str()) => Some(true),
        _ => None,
    }
}

/// Query value beats cookie, cookie beats default. Unrecognised values
/// fall through to the next source.
fn resolve_flag(
    query: Option<&str>,
    cookie: Option<&str>,
    default: bool,
    extra_on: &[&str],
) -> bool {
    query
        .and_then(|q| parse_flag(q, extra_on))
        .or_else(|| cookie.and_then(|c| parse_flag(c, extra_on)))
        .unwrap_or(default)
}

impl ModeDefaults {
    /// Desktop mode from `?desktop=` and the desktop cookie
    pub fn desktop_enabled(&self, query: Option<&str>, cookie: Option<&str>) -> bool {
        resolve_flag(query, cookie, self.desktop_default, &[])
    }

    /// Compact mode from `?compact=` and the compact cookie; `mobile` means on
    pub fn compact_enabled(&self, query: Option<&str>, cookie: Option<&str>) -> bool {
        resolve_flag(query, cookie, self.compact_default, &["mobile"])
    }
}

/// Only same-origin absolute paths survive; anything else becomes `/`.
/// Browsers drop tab and newline from URLs, so `/\t/host` would turn into
/// `//host`; no control character, whitespace or backslash is allowed.
pub fn safe_next_path(next: &str) -> &str {
    let ok = next.starts_with('/')
        && !next.starts_with("//")
        && !next.contains("://")
        && !next
            .chars()
            .any(|c| c.is_control() || c.is_whitespace() || c == '\\');
    if ok {
        next
    } else {
        "/"
    }
}

/// A redirect for the HTTP layer to emit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redirect {
    pub location: String,
    pub status: u16,
    pub cache_control: &'static str,
}

/// Mobile entry point lands on the compact UI
pub fn mobile_entry_redirect() -> Redirect {
    Redirect {
        location: "/?compact=1".to_string(),
        status: 307,
        cache_control: "no-store",
    }
}

/// Structured failure body with the HTTP status it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorOutcome {
    pub ok: bool,
    pub error: &'static str,
    pub detail: String,
    #[serde(skip)]
    pub status: u16,
}

impl From<&BridgeError> for ErrorOutcome {
    fn from(err: &BridgeError) -> Self {
        let status = match err {
            BridgeError::Unauthorized => 401,
            e if e.is_client_error() => 400,
            _ => 500,
        };
        Self {
            ok: false,
            error: err.code(),
            detail: err.to_string(),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required(secret: &str) -> AuthConfig {
        AuthConfig {
            required: true,
            token: secret.to_string(),
        }
    }

    #[test]
    fn test_auth_token_required() {
        let auth = required("secret");
        assert!(auth.is_valid_token(Some("secret")));
        assert!(!auth.is_valid_token(Some("wrong")));
        assert!(!auth.is_valid_token(Some("")));
        assert!(!auth.is_valid_token(None));
    }

    #[test]
    fn test_auth_empty_secret_rejects_everything() {
        let auth = required("");
        assert!(!auth.is_valid_token(Some("")));
    }

    #[test]
    fn test_auth_not_required() {
        let auth = AuthConfig::default();
        assert!(auth.is_valid_token(None));
        assert!(auth.check(Some("anything")).is_ok());
    }

    #[test]
    fn test_unauthorized_outcome() {
        let err = required("secret").check(Some("wrong")).unwrap_err();
        let out = ErrorOutcome::from(&err);
        assert_eq!(out.status, 401);
        assert!(!out.ok);
        assert_eq!(out.error, "unauthorized");
    }

    #[test]
    fn test_desktop_mode() {
        let modes = ModeDefaults::default();
        assert!(modes.desktop_enabled(None, None));
        assert!(!modes.desktop_enabled(None, Some("0")));
        assert!(modes.desktop_enabled(Some("on"), Some("off")));
        assert!(!modes.desktop_enabled(Some("maybe"), Some("off")));
    }

    #[test]
    fn test_compact_mode() {
        let modes = ModeDefaults::default();
        assert!(!modes.compact_enabled(None, None));
        assert!(modes.compact_enabled(Some("1"), None));
        assert!(modes.compact_enabled(Some("mobile"), None));
        assert!(modes.compact_enabled(None, Some("true")));
        assert!(!modes.compact_enabled(Some("0"), Some("1")));
        // desktop has no alias
        assert!(!modes.desktop_enabled(Some("mobile"), Some("0")));
    }

    #[test]
    fn test_safe_next_path() {
        assert_eq!(safe_next_path("/"), "/");
        assert_eq!(safe_next_path("/diag/status"), "/diag/status");
        assert_eq!(safe_next_path("https://evil.example"), "/");
        assert_eq!(safe_next_path("//evil.example"), "/");
        assert_eq!(safe_next_path("/\\evil.example"), "/");
        assert_eq!(safe_next_path(""), "/");
    }

    #[test]
    fn test_safe_next_path_rejects_hidden_characters() {
        assert_eq!(safe_next_path("/\t/evil.example"), "/");
        assert_eq!(safe_next_path("/\n/evil.example"), "/");
        assert_eq!(safe_next_path("/\r\n/evil.example"), "/");
        assert_eq!(safe_next_path("/ok\r\nSet-Cookie: x=1"), "/");
        assert_eq!(safe_next_path("/a b"), "/");
        assert_eq!(safe_next_path("/path\\..\\evil"), "/");
        assert_eq!(safe_next_path("/sessions?name=dev"), "/sessions?name=dev");
    }

    #[test]
    fn test_mobile_redirect() {
        let r = mobile_entry_redirect();
        assert_eq!(r.location, "/?compact=1");
        assert_eq!(r.status, 307);
        assert_eq!(r.cache_control, "no-store");
    }

    #[test]
    fn test_client_errors_are_400() {
        let out = ErrorOutcome::from(&BridgeError::UnsupportedKey("capslock".into()));
        assert_eq!(out.status, 400);
        assert_eq!(out.error, "unsupported_key");
    }
}
