// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use reqwest::{Method, StatusCode};
use serde::Deserialize;

/// Errors surfaced by the API client.
///
/// `Clone` because a single refresh failure is delivered to every request
/// parked on that refresh cycle.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    /// Connection, timeout or body read failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-2xx status.
    #[error("{method} {path} failed with {status}: {message}")]
    Status { status: StatusCode, method: Method, path: String, message: String },

    /// A refresh was needed but no refresh token is stored.
    #[error("no refresh token stored")]
    MissingRefreshToken,

    /// The response body was not the expected JSON.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The request could not be built (URL, header value, body).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Durable storage read/write failure.
    #[error("storage error: {0}")]
    Storage(String),
}

impl ClientError {
    /// HTTP status of the failed response, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// Build a [`ClientError::Status`] from a response, pulling the message
    /// out of the backend's error envelope when present.
    pub fn from_response(status: StatusCode, method: &Method, path: &str, body: &[u8]) -> Self {
        let message = serde_json::from_slice::<ErrorDetails>(body)
            .ok()
            .and_then(|d| d.message)
            .filter(|m| !m.is_empty())
            .or_else(|| {
                let text = String::from_utf8_lossy(body).trim().to_owned();
                (!text.is_empty()).then_some(text)
            })
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown status").to_owned());
        Self::Status { status, method: method.clone(), path: path.to_owned(), message }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

/// Error envelope returned by the helpdesk backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorDetails {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
