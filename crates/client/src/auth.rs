// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Login, registration and the rest of the session lifecycle.

use tracing::{debug, info, warn};

use crate::client::ApiClient;
use crate::error::ClientError;
use crate::model::{AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest, User};
use crate::session::LogoutReason;
use crate::transport::ApiRequest;

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const CHANGE_PASSWORD_PATH: &str = "/auth/change-password";
pub const ME_PATH: &str = "/users/me";

/// Snapshot of the local session.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    pub user: Option<User>,
    pub authenticated: bool,
}

#[derive(Debug, Clone)]
pub struct AuthService {
    client: ApiClient,
}

impl AuthService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<User, ClientError> {
        let request = ApiRequest::post(LOGIN_PATH).json(request)?.without_refresh();
        let user = self.establish(request).await?;
        info!(user_id = %user.id, "logged in");
        Ok(user)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<User, ClientError> {
        let request = ApiRequest::post(REGISTER_PATH).json(request)?.without_refresh();
        let user = self.establish(request).await?;
        info!(user_id = %user.id, "registered");
        Ok(user)
    }

    /// Send a credential-establishing request and persist the session it
    /// returns. Falls back to `/users/me` when the response omits the user.
    async fn establish(&self, request: ApiRequest) -> Result<User, ClientError> {
        let auth: AuthResponse = self.client.execute(request).await?.json()?;
        let credentials = self.client.credentials();
        credentials.save_session(&auth)?;
        match auth.user {
            Some(user) => Ok(user),
            None => {
                let user = self.current_user().await?;
                credentials.save_user(&user)?;
                Ok(user)
            }
        }
    }

    /// Revalidate a persisted session.
    ///
    /// Returns `None` without touching the network when no pair is stored.
    /// If the backend refuses the session, local credentials are dropped
    /// quietly; any forced logout has already been broadcast by then.
    pub async fn restore(&self) -> Option<User> {
        let credentials = self.client.credentials();
        if credentials.pair().is_none() {
            debug!("no stored session");
            return None;
        }
        match self.current_user().await {
            Ok(user) => {
                if let Err(e) = credentials.save_user(&user) {
                    warn!(err = %e, "failed to cache restored user");
                }
                info!(user_id = %user.id, "session restored");
                Some(user)
            }
            Err(e) => {
                warn!(err = %e, "stored session rejected");
                if let Err(e) = credentials.clear() {
                    warn!(err = %e, "failed to clear stored session");
                }
                None
            }
        }
    }

    pub async fn current_user(&self) -> Result<User, ClientError> {
        self.client.get(ME_PATH).await
    }

    /// Replace the cached user, e.g. after a profile edit.
    pub fn update_user(&self, user: &User) -> Result<(), ClientError> {
        self.client.credentials().save_user(user)
    }

    pub async fn change_password(&self, request: &ChangePasswordRequest) -> Result<(), ClientError> {
        self.client.execute(ApiRequest::post(CHANGE_PASSWORD_PATH).json(request)?).await?;
        Ok(())
    }

    pub fn logout(&self) {
        self.client.terminator().terminate(LogoutReason::UserRequested);
    }

    pub fn state(&self) -> AuthState {
        let credentials = self.client.credentials();
        AuthState { user: credentials.user(), authenticated: credentials.pair().is_some() }
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
