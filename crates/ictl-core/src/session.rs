use crate::error::Result;
use crate::io;
use crate::paths;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_cookie_path")]
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
}

fn default_cookie_path() -> String {
    "/".to_string()
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Cookie {
            name: name.into(),
            value: value.into(),
            domain: String::new(),
            path: default_cookie_path(),
            secure: true,
            http_only: true,
            expires: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|exp| exp <= now)
    }

    /// `name=value` pair as sent in a `Cookie` request header.
    pub fn header_pair(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionFile {
    #[serde(default)]
    cookies: Vec<Cookie>,
    saved_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// SessionStore
// ---------------------------------------------------------------------------

/// Persists login cookies in `<config_dir>/session_cookies.json`.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(config_dir: &Path) -> Self {
        SessionStore {
            path: paths::session_path(config_dir),
        }
    }

    /// Stored cookies that have not expired. No file means no cookies.
    pub fn load(&self) -> Result<Vec<Cookie>> {
        let Some(content) = io::read_optional(&self.path)? else {
            return Ok(Vec::new());
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        let file: SessionFile = serde_json::from_str(&content)?;
        let now = Utc::now();
        Ok(file
            .cookies
            .into_iter()
            .filter(|c| !c.is_expired(now))
            .collect())
    }

    pub fn save(&self, cookies: &[Cookie]) -> Result<()> {
        let file = SessionFile {
            cookies: cookies.to_vec(),
            saved_at: Utc::now(),
        };
        let content = serde_json::to_string_pretty(&file)?;
        io::atomic_write(&self.path, content.as_bytes())
    }

    /// Delete the session file. Returns false if there was none.
    pub fn clear(&self) -> Result<bool> {
        io::remove_if_exists(&self.path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn store() -> (SessionStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());
        (store, dir)
    }

    #[test]
    fn load_without_file_is_empty() {
        let (store, _dir) = store();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let (store, _dir) = store();
        let mut cookie = Cookie::new("session", "abc123");
        cookie.domain = "api.interactive.dev".into();
        store.save(&[cookie.clone()]).unwrap();
        assert_eq!(store.load().unwrap(), vec![cookie]);
    }

    #[test]
    fn file_carries_rfc3339_saved_at() {
        let (store, _dir) = store();
        store.save(&[Cookie::new("session", "abc")]).unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        let saved_at = raw["saved_at"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(saved_at).is_ok());
        assert_eq!(raw["cookies"][0]["httpOnly"], serde_json::json!(true));
    }

    #[test]
    fn expired_cookies_are_dropped() {
        let (store, _dir) = store();
        let mut stale = Cookie::new("old", "1");
        stale.expires = Some(Utc::now() - Duration::hours(1));
        let mut fresh = Cookie::new("new", "2");
        fresh.expires = Some(Utc::now() + Duration::hours(1));
        store.save(&[stale, fresh.clone()]).unwrap();
        assert_eq!(store.load().unwrap(), vec![fresh]);
    }

    #[test]
    fn clear_removes_file() {
        let (store, _dir) = store();
        store.save(&[Cookie::new("session", "abc")]).unwrap();
        assert!(store.clear().unwrap());
        assert!(store.load().unwrap().is_empty());
        assert!(!store.clear().unwrap());
    }
}
