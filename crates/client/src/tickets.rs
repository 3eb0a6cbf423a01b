// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ticket endpoints.

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::client::ApiClient;
use crate::error::ClientError;
use crate::transport::ApiRequest;

pub const TICKETS_PATH: &str = "/tickets";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    #[default]
    Open,
    InProgress,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    VeryHigh,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TicketStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TicketPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketRequest {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub status: TicketStatus,
    pub priority: TicketPriority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter_id: Option<Uuid>,
}

/// Partial update; absent fields are left untouched by the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTicketRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TicketPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter_id: Option<Uuid>,
}

/// List endpoints answer with either a bare array or a page wrapping it in
/// `content`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Page { content: Vec<T> },
    Items(Vec<T>),
}

impl<T> Listing<T> {
    fn into_items(self) -> Vec<T> {
        match self {
            Self::Page { content } => content,
            Self::Items(items) => items,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TicketService {
    client: ApiClient,
}

impl TicketService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<Ticket>, ClientError> {
        self.list_with(&[]).await
    }

    /// List with backend filters and paging, e.g. `[("status", "OPEN"), ("page", "1")]`.
    pub async fn list_with(&self, params: &[(&str, &str)]) -> Result<Vec<Ticket>, ClientError> {
        let listing: Listing<Ticket> = self.client.get_with_query(TICKETS_PATH, params).await?;
        let tickets = listing.into_items();
        debug!(count = tickets.len(), "listed tickets");
        Ok(tickets)
    }

    /// Tickets reported by or assigned to the logged-in user.
    pub async fn mine(&self) -> Result<Vec<Ticket>, ClientError> {
        let listing: Listing<Ticket> = self.client.get(&format!("{TICKETS_PATH}/my")).await?;
        Ok(listing.into_items())
    }

    pub async fn get(&self, id: Uuid) -> Result<Ticket, ClientError> {
        self.client.get(&format!("{TICKETS_PATH}/{id}")).await
    }

    pub async fn create(&self, request: &CreateTicketRequest) -> Result<Ticket, ClientError> {
        self.client.post(TICKETS_PATH, request).await
    }

    pub async fn update(&self, id: Uuid, request: &UpdateTicketRequest) -> Result<Ticket, ClientError> {
        self.client.patch(&format!("{TICKETS_PATH}/{id}"), request).await
    }

    pub async fn assign(&self, id: Uuid, assignee_id: Uuid) -> Result<Ticket, ClientError> {
        let request = ApiRequest::patch(format!("{TICKETS_PATH}/{id}/assign"))
            .query("assigneeId", assignee_id.to_string());
        self.client.execute(request).await?.json()
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ClientError> {
        self.client.execute(ApiRequest::delete(format!("{TICKETS_PATH}/{id}"))).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tickets_tests.rs"]
mod tests;
