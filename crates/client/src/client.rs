// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated request pipeline.
//!
//! Every request picks up the stored access token. A 401 on an eligible
//! request is handed to the [`RefreshCoordinator`] and, if a fresh token comes
//! back, replayed exactly once. Everything else passes through.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::config::ClientConfig;
use crate::credential::CredentialStore;
use crate::error::ClientError;
use crate::model::{AuthResponse, CredentialPair, RefreshTokenRequest};
use crate::refresh::{Recovery, RefreshCoordinator};
use crate::session::{Navigator, SessionEvent, SessionTerminator};
use crate::storage::KeyValueStore;
use crate::transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};

pub const REFRESH_PATH: &str = "/auth/refresh";

/// Cheaply cloneable handle; clones share one refresh coordinator.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    credentials: CredentialStore,
    coordinator: RefreshCoordinator,
    terminator: SessionTerminator,
}

impl ApiClient {
    /// Build a client talking to `config.api_url` over HTTP.
    ///
    /// Returns the client and a receiver for [`SessionEvent`]s; more receivers
    /// can be had from [`ApiClient::subscribe`].
    pub fn new(
        config: &ClientConfig,
        store: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
    ) -> (Self, broadcast::Receiver<SessionEvent>) {
        let transport = Arc::new(ReqwestTransport::new(config.api_url.as_str(), config.timeout()));
        Self::with_transport(transport, config, store, navigator)
    }

    pub fn with_transport(
        transport: Arc<dyn Transport>,
        config: &ClientConfig,
        store: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
    ) -> (Self, broadcast::Receiver<SessionEvent>) {
        let credentials = CredentialStore::new(store);
        let (event_tx, event_rx) = broadcast::channel(16);
        let terminator = SessionTerminator::new(
            credentials.clone(),
            event_tx,
            navigator,
            config.login_path.as_str(),
            config.logout_redirect_delay(),
        );
        let coordinator = RefreshCoordinator::new(credentials.clone(), terminator.clone());
        let inner = Inner { transport, credentials, coordinator, terminator };
        (Self { inner: Arc::new(inner) }, event_rx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.terminator.subscribe()
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.inner.credentials
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.inner.coordinator
    }

    pub fn terminator(&self) -> &SessionTerminator {
        &self.inner.terminator
    }

    /// Send `request`, recovering from an expired access token.
    ///
    /// Returns the response for any 2xx status and [`ClientError::Status`]
    /// otherwise. A 401 on a request that is neither retried nor marked
    /// [`ApiRequest::without_refresh`] triggers (or waits on) a refresh and
    /// one replay with the new token.
    pub async fn execute(&self, mut request: ApiRequest) -> Result<ApiResponse, ClientError> {
        if let Some(token) = self.inner.credentials.access_token() {
            request.set_bearer(&token)?;
        }

        let unauthorized = match self.dispatch(&request).await {
            Err(e) if e.is_unauthorized() && request.is_recoverable() => e,
            other => return other,
        };

        request.mark_retried();
        match self.inner.coordinator.recover(unauthorized, |rt| self.exchange(rt)).await {
            Recovery::Replay(token) => {
                request.set_bearer(&token)?;
                debug!(method = %request.method, path = %request.path, "replaying with refreshed token");
                self.dispatch(&request).await
            }
            Recovery::Reject(e) => Err(e),
        }
    }

    async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        debug!(method = %request.method, path = %request.path, "sending request");
        let response = self.inner.transport.send(request).await?;
        if response.status.is_success() {
            return Ok(response);
        }
        debug!(method = %request.method, path = %request.path, status = %response.status, "request failed");
        Err(ClientError::from_response(response.status, &request.method, &request.path, &response.body))
    }

    /// `POST /auth/refresh`. Never itself eligible for recovery.
    async fn exchange(&self, refresh_token: String) -> Result<CredentialPair, ClientError> {
        let mut request =
            ApiRequest::post(REFRESH_PATH).json(&RefreshTokenRequest { refresh_token })?.without_refresh();
        if let Some(token) = self.inner.credentials.access_token() {
            request.set_bearer(&token)?;
        }
        let auth: AuthResponse = self.dispatch(&request).await?.json()?;
        Ok(auth.credentials())
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.execute(ApiRequest::get(path)).await?.json()
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ClientError> {
        let request = query.iter().fold(ApiRequest::get(path), |req, (k, v)| req.query(*k, *v));
        self.execute(request).await?.json()
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(ApiRequest::post(path).json(body)?).await?.json()
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(ApiRequest::put(path).json(body)?).await?.json()
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(ApiRequest::patch(path).json(body)?).await?.json()
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.execute(ApiRequest::delete(path)).await?.json()
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("credentials", &self.inner.credentials)
            .field("refreshing", &self.inner.coordinator.is_refreshing())
            .finish()
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
