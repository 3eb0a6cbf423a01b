// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential store: access/refresh token pair plus the cached user record.
//!
//! A thin facade over a [`KeyValueStore`]. No validation and no expiry
//! tracking; token validity is discovered from 401 responses.

use std::sync::Arc;

use tracing::warn;

use crate::error::ClientError;
use crate::model::{AuthResponse, CredentialPair, User};
use crate::storage::KeyValueStore;

pub const ACCESS_TOKEN_KEY: &str = "tisk.access_token";
pub const REFRESH_TOKEN_KEY: &str = "tisk.refresh_token";
pub const USER_KEY: &str = "tisk.user";

/// Shared handle to the session's durable credentials.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn access_token(&self) -> Option<String> {
        self.store.get(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.store.get(REFRESH_TOKEN_KEY)
    }

    /// The stored pair, only when both halves are present.
    pub fn pair(&self) -> Option<CredentialPair> {
        Some(CredentialPair { access_token: self.access_token()?, refresh_token: self.refresh_token()? })
    }

    pub fn save_pair(&self, pair: &CredentialPair) -> Result<(), ClientError> {
        self.store.set(&[
            (ACCESS_TOKEN_KEY, pair.access_token.as_str()),
            (REFRESH_TOKEN_KEY, pair.refresh_token.as_str()),
        ])
    }

    /// Cached user, or `None` if absent or unreadable.
    pub fn user(&self) -> Option<User> {
        let raw = self.store.get(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(err = %e, "ignoring unreadable cached user");
                None
            }
        }
    }

    pub fn save_user(&self, user: &User) -> Result<(), ClientError> {
        let json = serde_json::to_string(user)
            .map_err(|e| ClientError::Storage(format!("failed to encode user: {e}")))?;
        self.store.set(&[(USER_KEY, json.as_str())])
    }

    /// Persist a login/registration response: token pair and user in one commit.
    ///
    /// A response without a user drops the cached one in the same commit.
    pub fn save_session(&self, auth: &AuthResponse) -> Result<(), ClientError> {
        let user_json = auth
            .user
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| ClientError::Storage(format!("failed to encode user: {e}")))?;
        let mut entries = vec![
            (ACCESS_TOKEN_KEY, auth.access_token.as_str()),
            (REFRESH_TOKEN_KEY, auth.refresh_token.as_str()),
        ];
        match user_json {
            Some(ref json) => {
                entries.push((USER_KEY, json.as_str()));
                self.store.set(&entries)
            }
            // Never leave a previous account's user next to the new pair.
            None => self.store.apply(&entries, &[USER_KEY]),
        }
    }

    /// Remove the pair and the cached user together.
    pub fn clear(&self) -> Result<(), ClientError> {
        self.store.remove(&[ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY])
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("has_access_token", &self.access_token().is_some())
            .field("has_refresh_token", &self.refresh_token().is_some())
            .finish()
    }
}

#[cfg(test)]
#[path = "credential_tests.rs"]
mod tests;
