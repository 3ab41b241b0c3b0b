use crate::error::{IctlError, Result};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const CONFIG_DIR: &str = ".interactive";
pub const PREFERENCES_FILE: &str = "config.yaml";
pub const SESSION_FILE: &str = "session_cookies.json";

pub const CONFIG_DIR_ENV: &str = "INTERACTIVE_CONFIG_DIR";
pub const HOSTNAME_ENV: &str = "INTERACTIVE_HOSTNAME";
pub const API_KEY_ENV: &str = "INTERACTIVE_API_KEY";

pub const DEFAULT_HOSTNAME: &str = "https://api.interactive.dev";

// ---------------------------------------------------------------------------
// Config directory
// ---------------------------------------------------------------------------

/// Resolve the per-user config directory.
///
/// `INTERACTIVE_CONFIG_DIR` wins when set and non-blank; otherwise
/// `<home>/.interactive`.
pub fn config_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
        if !dir.to_string_lossy().trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = home::home_dir().ok_or(IctlError::HomeNotFound)?;
    Ok(home.join(CONFIG_DIR))
}

pub fn preferences_path(dir: &Path) -> PathBuf {
    dir.join(PREFERENCES_FILE)
}

pub fn session_path(dir: &Path) -> PathBuf {
    dir.join(SESSION_FILE)
}

// ---------------------------------------------------------------------------
// API base URL
// ---------------------------------------------------------------------------

/// Base URL from `INTERACTIVE_HOSTNAME`, falling back to the public API.
pub fn api_base_url() -> String {
    let raw = std::env::var(HOSTNAME_ENV).unwrap_or_default();
    normalize_base_url(&raw)
}

/// Prefix `https://` when no scheme is given and drop trailing slashes.
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return DEFAULT_HOSTNAME.to_string();
    }
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    with_scheme.trim_end_matches('/').to_string()
}
