use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Client configuration loaded from environment variables.
///
/// All fields have defaults suitable for a backend running locally.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// REST backend base URL.
    pub api_base_url: String,
    /// Persisted client storage file. `None` keeps storage in memory.
    pub storage_path: Option<PathBuf>,
    /// Token written into storage at start-up, if set.
    pub auth_token: Option<String>,
    /// Per-request timeout. `None` disables it.
    pub request_timeout: Option<Duration>,
    /// Avatar shown for professionals without a usable photo.
    pub default_avatar_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".into(),
            storage_path: Some(PathBuf::from(".rdv-storage.json")),
            auth_token: None,
            request_timeout: Some(Duration::from_secs(30)),
            default_avatar_url: "/images/default-avatar.png".into(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                      |
    /// |------------------------|------------------------------|
    /// | `API_BASE_URL`         | `http://localhost:8080`      |
    /// | `STORAGE_PATH`         | `.rdv-storage.json`          |
    /// | `AUTH_TOKEN`           | unset                        |
    /// | `REQUEST_TIMEOUT_SECS` | `30` (`0` disables)          |
    /// | `DEFAULT_AVATAR_URL`   | `/images/default-avatar.png` |
    ///
    /// An empty `STORAGE_PATH` keeps storage in memory.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable
    /// source.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_base_url = lookup("API_BASE_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.api_base_url);

        let storage_path = match lookup("STORAGE_PATH") {
            Some(raw) if raw.trim().is_empty() => None,
            Some(raw) => Some(PathBuf::from(raw.trim())),
            None => defaults.storage_path,
        };

        let auth_token = lookup("AUTH_TOKEN")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let request_timeout = match lookup("REQUEST_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    AppError::Config(format!(
                        "REQUEST_TIMEOUT_SECS must be a whole number of seconds, got '{raw}'"
                    ))
                })?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => defaults.request_timeout,
        };

        let default_avatar_url = lookup("DEFAULT_AVATAR_URL")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.default_avatar_url);

        Ok(Self {
            api_base_url,
            storage_path,
            auth_token,
            request_timeout,
            default_avatar_url,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
