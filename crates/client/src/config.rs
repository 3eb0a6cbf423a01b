// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the helpdesk API client.
#[derive(Debug, Clone, clap::Args)]
pub struct ClientConfig {
    /// Base URL of the helpdesk REST API.
    #[arg(long, default_value = "http://localhost:8080/api", env = "TISK_API_URL")]
    pub api_url: String,

    /// Per-request timeout in milliseconds.
    #[arg(long, default_value_t = 10000, env = "TISK_TIMEOUT_MS")]
    pub timeout_ms: u64,

    /// Directory holding the persisted session. Defaults to the XDG state dir.
    #[arg(long, env = "TISK_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Location of the login surface; forced logouts redirect here.
    #[arg(long, default_value = "/login", env = "TISK_LOGIN_PATH")]
    pub login_path: String,

    /// Delay before the fallback redirect after a forced logout, in milliseconds.
    #[arg(long, default_value_t = 100, env = "TISK_LOGOUT_REDIRECT_MS")]
    pub logout_redirect_ms: u64,
}

impl ClientConfig {
    /// Config pointing at `api_url` with every other field at its default.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            timeout_ms: 10000,
            state_dir: None,
            login_path: "/login".to_owned(),
            logout_redirect_ms: 100,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn logout_redirect_delay(&self) -> Duration {
        Duration::from_millis(self.logout_redirect_ms)
    }

    /// Resolve the state directory.
    ///
    /// Uses `--state-dir`, then `$XDG_STATE_HOME/tisk`, then
    /// `$HOME/.local/state/tisk`, then `.tisk`.
    pub fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(|| default_state_dir(|k| std::env::var(k).ok()))
    }

    /// Path of the persisted session file.
    pub fn session_path(&self) -> PathBuf {
        self.state_dir().join("session.json")
    }
}

fn default_state_dir(env: impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(xdg) = env("XDG_STATE_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(xdg).join("tisk");
    }
    if let Some(home) = env("HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(home).join(".local/state/tisk");
    }
    PathBuf::from(".tisk")
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
