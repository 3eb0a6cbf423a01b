// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session termination: clear credentials, broadcast, redirect to login.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::credential::CredentialStore;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoutReason {
    /// The user asked to log out.
    UserRequested,
    /// The refresh exchange failed (network error or rejected token).
    RefreshFailed,
    /// A refresh was needed but no refresh token was stored.
    MissingRefreshToken,
}

impl std::fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UserRequested => f.write_str("user_requested"),
            Self::RefreshFailed => f.write_str("refresh_failed"),
            Self::MissingRefreshToken => f.write_str("missing_refresh_token"),
        }
    }
}

/// Process-wide session signals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Credentials were cleared; observers should reset their own state.
    LoggedOut { reason: LogoutReason },
}

/// "Navigate to path" primitive of the host application.
pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;

    fn navigate(&self, path: &str);
}

/// Navigator that only tracks location and history.
#[derive(Debug)]
pub struct MemoryNavigator {
    inner: Mutex<NavState>,
}

#[derive(Debug)]
struct NavState {
    current: String,
    history: Vec<String>,
}

impl MemoryNavigator {
    pub fn new(start: impl Into<String>) -> Self {
        Self { inner: Mutex::new(NavState { current: start.into(), history: Vec::new() }) }
    }

    /// Paths navigated to, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.inner.lock().history.clone()
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for MemoryNavigator {
    fn current_path(&self) -> String {
        self.inner.lock().current.clone()
    }

    fn navigate(&self, path: &str) {
        let mut nav = self.inner.lock();
        nav.current = path.to_owned();
        nav.history.push(path.to_owned());
        debug!(path, "navigated");
    }
}

/// The one place a session ends.
#[derive(Clone)]
pub struct SessionTerminator {
    credentials: CredentialStore,
    event_tx: broadcast::Sender<SessionEvent>,
    navigator: Arc<dyn Navigator>,
    login_path: String,
    redirect_delay: Duration,
}

impl SessionTerminator {
    pub fn new(
        credentials: CredentialStore,
        event_tx: broadcast::Sender<SessionEvent>,
        navigator: Arc<dyn Navigator>,
        login_path: impl Into<String>,
        redirect_delay: Duration,
    ) -> Self {
        Self { credentials, event_tx, navigator, login_path: login_path.into(), redirect_delay }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Clear credentials, broadcast [`SessionEvent::LoggedOut`] and schedule a
    /// fallback redirect to the login path.
    pub fn terminate(&self, reason: LogoutReason) {
        if let Err(e) = self.credentials.clear() {
            warn!(%reason, err = %e, "failed to clear credentials on logout");
        }
        let _ = self.event_tx.send(SessionEvent::LoggedOut { reason });
        info!(%reason, "session terminated");

        if self.navigator.current_path() == self.login_path {
            return;
        }
        let navigator = Arc::clone(&self.navigator);
        let login_path = self.login_path.clone();
        let delay = self.redirect_delay;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    redirect_to_login(navigator.as_ref(), &login_path);
                });
            }
            // No runtime to defer on; redirect now.
            Err(_) => redirect_to_login(navigator.as_ref(), &login_path),
        }
    }
}

fn redirect_to_login(navigator: &dyn Navigator, login_path: &str) {
    if navigator.current_path() != login_path {
        navigator.navigate(login_path);
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
