use std::path::{Path, PathBuf};

const DEFAULT_SYSTEM_ROOT: &str = r"C:\Windows";
const ENTRY_EXE: &str = "wsl.exe";

/// Host family, as far as executable resolution cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPlatform {
    Windows,
    Other,
}

impl HostPlatform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Other
        }
    }
}

/// Resolve the WSL entry executable for this host.
///
/// Order: the configured path if it exists on disk, then
/// `%SystemRoot%\System32\wsl.exe`, then the configured value as a bare name.
pub fn resolve_entry_executable(configured: &str) -> PathBuf {
    let system_root = std::env::var("SystemRoot").ok();
    resolve_with(
        configured,
        HostPlatform::current(),
        system_root.as_deref(),
        |path| path.exists(),
    )
}

/// Resolution with the host facts passed in
pub fn resolve_with(
    configured: &str,
    host: HostPlatform,
    system_root: Option<&str>,
    exists: impl Fn(&Path) -> bool,
) -> PathBuf {
    if host == HostPlatform::Other {
        return PathBuf::from(configured);
    }

    let explicit = Path::new(configured);
    if exists(explicit) {
        return explicit.to_path_buf();
    }

    let candidate = Path::new(system_root.unwrap_or(DEFAULT_SYSTEM_ROOT))
        .join("System32")
        .join(ENTRY_EXE);
    if exists(&candidate) {
        tracing::debug!("Using system WSL entry point {:?}", candidate);
        return candidate;
    }

    PathBuf::from(configured)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefers_explicit_path() {
        let got = resolve_with(
            r"C:\Tools\wsl.exe",
            HostPlatform::Windows,
            Some(r"C:\Windows"),
            |_| true,
        );
        assert_eq!(got, PathBuf::from(r"C:\Tools\wsl.exe"));
    }

    #[test]
    fn test_falls_back_to_system32() {
        let got = resolve_with("wsl", HostPlatform::Windows, Some(r"C:\Windows"), |path| {
            let s = path.to_string_lossy();
            s.ends_with("System32\\wsl.exe") || s.ends_with("System32/wsl.exe")
        });
        let normalized = got.to_string_lossy().replace('/', "\\").to_lowercase();
        assert!(normalized.ends_with("windows\\system32\\wsl.exe"), "{normalized}");
    }

    #[test]
    fn test_bare_name_when_nothing_exists() {
        let got = resolve_with("wsl", HostPlatform::Windows, None, |_| false);
        assert_eq!(got, PathBuf::from("wsl"));
    }

    #[test]
    fn test_non_windows_skips_probing() {
        let got = resolve_with("wsl", HostPlatform::Other, None, |_| {
            panic!("should not probe the filesystem")
        });
        assert_eq!(got, PathBuf::from("wsl"));
    }
}
