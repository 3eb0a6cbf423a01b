// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for unit tests: an in-process fake backend and helpers.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::{Method, StatusCode};
use serde_json::json;
use tokio::sync::Notify;

use crate::error::ClientError;
use crate::model::{User, UserRole, UserStatus};
use crate::storage::KeyValueStore;
use crate::transport::{ApiRequest, ApiResponse, Transport};

pub fn sample_user(email: &str) -> User {
    User {
        id: uuid::Uuid::new_v4(),
        email: email.to_owned(),
        login: Some("jdoe".to_owned()),
        first_name: "Jane".to_owned(),
        last_name: "Doe".to_owned(),
        phone_number: None,
        department: Some("IT".to_owned()),
        position: None,
        role: UserRole::Support,
        status: UserStatus::Active,
        created_at: Some("2026-01-05T09:30:00".to_owned()),
        updated_at: None,
        last_login_at: None,
    }
}

/// Poll `cond` every few milliseconds until it holds or two seconds pass.
pub async fn wait_until(cond: impl Fn() -> bool) -> bool {
    for _ in 0..400 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}

/// Store whose writes always fail; reads see nothing.
#[derive(Debug, Default)]
pub struct FailingStore;

impl KeyValueStore for FailingStore {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn apply(&self, _set: &[(&str, &str)], _remove: &[&str]) -> Result<(), ClientError> {
        Err(ClientError::Storage("disk full".into()))
    }
}

/// How the fake backend answers `/auth/refresh`.
#[derive(Debug, Clone)]
pub enum RefreshMode {
    /// Issue this new pair.
    Issue { access: String, refresh: String },
    /// Issue this pair but keep rejecting it, as if revoked right away.
    IssueRevoked { access: String, refresh: String },
    /// Reject the refresh token with 401.
    Reject,
    /// Fail at the transport level.
    Offline,
}

/// In-process backend.
///
/// Every path other than the auth endpoints answers 200 with the path and the
/// presented token when the bearer matches the currently valid access token,
/// and 401 otherwise. `/tickets/missing` is always 404.
pub struct FakeBackend {
    valid_access: Mutex<String>,
    refresh_mode: Mutex<RefreshMode>,
    /// When set, `/auth/refresh` waits for a notification before answering.
    refresh_gate: Option<Arc<Notify>>,
    pub refresh_calls: AtomicU32,
    /// (method, path, bearer) of every request seen, in order.
    pub seen: Mutex<Vec<(Method, String, Option<String>)>>,
    pub me: User,
}

impl FakeBackend {
    pub fn new(valid_access: &str, refresh_mode: RefreshMode) -> Self {
        Self {
            valid_access: Mutex::new(valid_access.to_owned()),
            refresh_mode: Mutex::new(refresh_mode),
            refresh_gate: None,
            refresh_calls: AtomicU32::new(0),
            seen: Mutex::new(Vec::new()),
            me: sample_user("me@example.com"),
        }
    }

    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.refresh_gate = Some(gate);
        self
    }

    pub fn set_valid_access(&self, token: &str) {
        *self.valid_access.lock() = token.to_owned();
    }

    pub fn set_refresh_mode(&self, mode: RefreshMode) {
        *self.refresh_mode.lock() = mode;
    }

    pub fn refresh_count(&self) -> u32 {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn count_path(&self, path: &str) -> usize {
        self.seen.lock().iter().filter(|(_, p, _)| p == path).count()
    }

    fn unauthorized(&self) -> ApiResponse {
        ApiResponse::new(
            StatusCode::UNAUTHORIZED,
            json!({ "message": "Invalid or expired token", "details": "uri=/api" }).to_string(),
        )
    }

    fn refresh(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        let mode = self.refresh_mode.lock().clone();
        match mode {
            RefreshMode::Offline => Err(ClientError::Transport("connection refused".into())),
            RefreshMode::Reject => Ok(self.unauthorized()),
            RefreshMode::Issue { ref access, ref refresh }
            | RefreshMode::IssueRevoked { ref access, ref refresh } => {
                let presented = request.body.as_ref().and_then(|b| b["refreshToken"].as_str());
                if presented.is_none() {
                    return Ok(ApiResponse::new(StatusCode::BAD_REQUEST, "{}"));
                }
                if matches!(mode, RefreshMode::Issue { .. }) {
                    self.set_valid_access(access);
                }
                let body = json!({
                    "accessToken": access,
                    "refreshToken": refresh,
                    "tokenType": "Bearer",
                    "expiresIn": 900000,
                    "user": self.me,
                });
                Ok(ApiResponse::new(StatusCode::OK, body.to_string()))
            }
        }
    }

    fn login(&self, request: &ApiRequest) -> ApiResponse {
        let password = request.body.as_ref().and_then(|b| b["password"].as_str());
        if password != Some("correct-horse") {
            return ApiResponse::new(
                StatusCode::UNAUTHORIZED,
                json!({ "message": "Invalid credentials" }).to_string(),
            );
        }
        let access = "login-access".to_owned();
        self.set_valid_access(&access);
        let body = json!({
            "accessToken": access,
            "refreshToken": "login-refresh",
            "tokenType": "Bearer",
            "expiresIn": 900000,
            "user": self.me,
        });
        ApiResponse::new(StatusCode::OK, body.to_string())
    }
}

#[async_trait::async_trait]
impl Transport for FakeBackend {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        let bearer = request.bearer().map(str::to_owned);
        self.seen.lock().push((request.method.clone(), request.path.clone(), bearer.clone()));
        tokio::task::yield_now().await;

        match request.path.as_str() {
            "/auth/refresh" => {
                self.refresh_calls.fetch_add(1, Ordering::SeqCst);
                if let Some(ref gate) = self.refresh_gate {
                    gate.notified().await;
                }
                self.refresh(request)
            }
            "/auth/login" | "/auth/register" => Ok(self.login(request)),
            path => {
                let valid = self.valid_access.lock().clone();
                if bearer.as_deref() != Some(valid.as_str()) {
                    return Ok(self.unauthorized());
                }
                if path == "/tickets/missing" {
                    return Ok(ApiResponse::new(
                        StatusCode::NOT_FOUND,
                        json!({ "message": "Ticket not found" }).to_string(),
                    ));
                }
                if path == "/users/me" {
                    return Ok(ApiResponse::new(StatusCode::OK, serde_json::to_string(&self.me)?));
                }
                let body = json!({ "path": path, "token": valid });
                Ok(ApiResponse::new(StatusCode::OK, body.to_string()))
            }
        }
    }
}
