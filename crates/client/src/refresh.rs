// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-flight access token refresh.
//!
//! The first request to see an eligible 401 leads a refresh cycle and runs the
//! exchange. Every other 401 that arrives while the cycle is open parks on a
//! oneshot and is woken, in arrival order, with either the new access token
//! or the refresh error. A cycle always ends with the flag cleared and the
//! waiter queue empty, including when the leading future is dropped.

use std::future::Future;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::credential::CredentialStore;
use crate::error::ClientError;
use crate::model::CredentialPair;
use crate::session::{LogoutReason, SessionTerminator};

type Waiter = oneshot::Sender<Result<String, ClientError>>;

#[derive(Default)]
struct CycleState {
    refreshing: bool,
    waiters: Vec<Waiter>,
}

/// What a request that hit a 401 should do next.
#[derive(Debug)]
pub enum Recovery {
    /// Replay the request with this access token.
    Replay(String),
    /// Give up and surface this error.
    Reject(ClientError),
}

/// Coordinates refresh cycles for one client instance.
pub struct RefreshCoordinator {
    state: Mutex<CycleState>,
    credentials: CredentialStore,
    terminator: SessionTerminator,
}

enum Entry<'a> {
    Lead(Cycle<'a>),
    Wait(oneshot::Receiver<Result<String, ClientError>>),
}

impl RefreshCoordinator {
    pub fn new(credentials: CredentialStore, terminator: SessionTerminator) -> Self {
        Self { state: Mutex::new(CycleState::default()), credentials, terminator }
    }

    pub fn is_refreshing(&self) -> bool {
        self.state.lock().refreshing
    }

    /// Number of requests parked on the open cycle.
    pub fn parked(&self) -> usize {
        self.state.lock().waiters.len()
    }

    /// Recover from a 401.
    ///
    /// `exchange` receives the stored refresh token and performs the refresh
    /// call; it runs at most once per cycle, only on the leading request.
    /// `original` is the 401 error, returned to a parked request if its cycle
    /// is abandoned without an outcome.
    pub async fn recover<F, Fut>(&self, original: ClientError, exchange: F) -> Recovery
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<CredentialPair, ClientError>>,
    {
        match self.enter() {
            Entry::Wait(rx) => {
                debug!("parked behind in-flight token refresh");
                match rx.await {
                    Ok(Ok(token)) => Recovery::Replay(token),
                    Ok(Err(e)) => Recovery::Reject(e),
                    Err(_) => Recovery::Reject(original),
                }
            }
            Entry::Lead(cycle) => self.lead(cycle, exchange).await,
        }
    }

    /// Check-then-set of the refresh flag, or park. Never awaits.
    fn enter(&self) -> Entry<'_> {
        let mut state = self.state.lock();
        if state.refreshing {
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            Entry::Wait(rx)
        } else {
            state.refreshing = true;
            Entry::Lead(Cycle { coordinator: self, finished: false })
        }
    }

    async fn lead<F, Fut>(&self, cycle: Cycle<'_>, exchange: F) -> Recovery
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<CredentialPair, ClientError>>,
    {
        let Some(refresh_token) = self.credentials.refresh_token() else {
            let err = ClientError::MissingRefreshToken;
            self.terminator.terminate(LogoutReason::MissingRefreshToken);
            let rejected = cycle.finish(Err(err.clone()));
            warn!(rejected, "access token rejected and no refresh token stored");
            return Recovery::Reject(err);
        };

        debug!("access token rejected, refreshing");
        let refreshed = match exchange(refresh_token).await {
            Ok(pair) => self.credentials.save_pair(&pair).map(|()| pair),
            Err(e) => Err(e),
        };

        match refreshed {
            Ok(pair) => {
                let replayed = cycle.finish(Ok(pair.access_token.clone()));
                info!(replayed, "access token refreshed");
                Recovery::Replay(pair.access_token)
            }
            Err(e) => {
                self.terminator.terminate(LogoutReason::RefreshFailed);
                let rejected = cycle.finish(Err(e.clone()));
                warn!(rejected, err = %e, "token refresh failed");
                Recovery::Reject(e)
            }
        }
    }

    fn reset(&self) -> Vec<Waiter> {
        let mut state = self.state.lock();
        state.refreshing = false;
        std::mem::take(&mut state.waiters)
    }
}

/// An open refresh cycle. Closing it, explicitly or by drop, clears the flag
/// and drains the queue.
struct Cycle<'a> {
    coordinator: &'a RefreshCoordinator,
    finished: bool,
}

impl Cycle<'_> {
    /// Close the cycle and wake every waiter in FIFO order. Returns how many
    /// waiters were woken.
    fn finish(mut self, outcome: Result<String, ClientError>) -> usize {
        self.finished = true;
        let waiters = self.coordinator.reset();
        let count = waiters.len();
        for waiter in waiters {
            // A dropped receiver means the parked caller went away.
            let _ = waiter.send(outcome.clone());
        }
        count
    }
}

impl Drop for Cycle<'_> {
    fn drop(&mut self) {
        if !self.finished {
            // Dropping the senders rejects parked requests with their own 401.
            let abandoned = self.coordinator.reset();
            warn!(parked = abandoned.len(), "refresh cycle abandoned before completion");
        }
    }
}

#[cfg(test)]
#[path = "refresh_tests.rs"]
mod tests;
