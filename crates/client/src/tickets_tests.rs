// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use super::*;
use crate::config::ClientConfig;
use crate::model::CredentialPair;
use crate::session::MemoryNavigator;
use crate::storage::MemoryStore;

const TICKET_ID: &str = "0b6f3c3e-5d0a-4f55-9a57-3f3c8a1d2e10";
const ASSIGNEE_ID: &str = "9d1e4c2a-8b7f-4a63-b5d0-1c2e3f4a5b6c";

fn ticket_json(title: &str, status: &str) -> Value {
    json!({
        "id": TICKET_ID,
        "title": title,
        "description": "Paper jam on floor 3",
        "status": status,
        "priority": "HIGH",
        "createdAt": "2026-04-02T10:15:00",
    })
}

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("authorization").and_then(|v| v.to_str().ok()) == Some("Bearer tok")
}

async fn backend() -> anyhow::Result<SocketAddr> {
    let app = Router::new()
        .route(
            "/api/tickets",
            get(|headers: HeaderMap, Query(params): Query<HashMap<String, String>>| async move {
                if !authorized(&headers) {
                    return StatusCode::UNAUTHORIZED.into_response();
                }
                let status = params.get("status").cloned().unwrap_or_else(|| "OPEN".to_owned());
                Json(json!({ "content": [ticket_json("Printer", &status)], "totalElements": 1 }))
                    .into_response()
            })
            .post(|Json(body): Json<Value>| async move {
                (StatusCode::CREATED, Json(ticket_json(body["title"].as_str().unwrap_or(""), "OPEN")))
            }),
        )
        .route("/api/tickets/my", get(|| async { Json(json!([ticket_json("Mine", "IN_PROGRESS")])) }))
        .route(
            "/api/tickets/{id}",
            get(|Path(id): Path<String>| async move {
                if id == TICKET_ID {
                    Json(ticket_json("Printer", "OPEN")).into_response()
                } else {
                    (StatusCode::NOT_FOUND, Json(json!({ "message": "Ticket not found" }))).into_response()
                }
            })
            .patch(|Json(body): Json<Value>| async move {
                let status = body["status"].as_str().unwrap_or("OPEN").to_owned();
                Json(ticket_json("Printer", &status))
            })
            .delete(|| async { StatusCode::NO_CONTENT }),
        )
        .route(
            "/api/tickets/{id}/assign",
            patch(|Query(params): Query<HashMap<String, String>>| async move {
                let response: Response = if params.get("assigneeId").map(String::as_str) == Some(ASSIGNEE_ID) {
                    Json(ticket_json("Printer", "IN_PROGRESS")).into_response()
                } else {
                    StatusCode::BAD_REQUEST.into_response()
                };
                response
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    Ok(addr)
}

async fn service() -> anyhow::Result<TicketService> {
    let addr = backend().await?;
    let config = ClientConfig::new(format!("http://{addr}/api"));
    let (client, _events) =
        ApiClient::new(&config, Arc::new(MemoryStore::new()), Arc::new(MemoryNavigator::default()));
    client.credentials().save_pair(&CredentialPair {
        access_token: "tok".into(),
        refresh_token: "ref".into(),
    })?;
    Ok(TicketService::new(client))
}

#[tokio::test]
async fn list_unwraps_page_content() -> anyhow::Result<()> {
    let tickets = service().await?;

    let all = tickets.list().await?;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].title, "Printer");
    assert_eq!(all[0].priority, Some(TicketPriority::High));

    let closed = tickets.list_with(&[("status", "CLOSED"), ("page", "0")]).await?;
    assert_eq!(closed[0].status, TicketStatus::Closed);
    Ok(())
}

#[tokio::test]
async fn mine_accepts_bare_array() -> anyhow::Result<()> {
    let tickets = service().await?;

    let mine = tickets.mine().await?;

    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].status, TicketStatus::InProgress);
    Ok(())
}

#[tokio::test]
async fn crud_round_trip() -> anyhow::Result<()> {
    let tickets = service().await?;
    let id: Uuid = TICKET_ID.parse()?;

    let created = tickets
        .create(&CreateTicketRequest {
            title: "Projector".into(),
            description: "No signal".into(),
            status: TicketStatus::Open,
            priority: TicketPriority::Medium,
            reporter_id: None,
        })
        .await?;
    assert_eq!(created.title, "Projector");

    assert_eq!(tickets.get(id).await?.id, id);

    let update = UpdateTicketRequest { status: Some(TicketStatus::Closed), ..Default::default() };
    assert_eq!(tickets.update(id, &update).await?.status, TicketStatus::Closed);

    tickets.delete(id).await?;
    Ok(())
}

#[tokio::test]
async fn assign_sends_assignee_as_query() -> anyhow::Result<()> {
    let tickets = service().await?;

    let assigned = tickets.assign(TICKET_ID.parse()?, ASSIGNEE_ID.parse()?).await?;

    assert_eq!(assigned.status, TicketStatus::InProgress);
    Ok(())
}

#[tokio::test]
async fn unknown_ticket_is_not_found() -> anyhow::Result<()> {
    let tickets = service().await?;

    let err = tickets.get(Uuid::new_v4()).await.err();

    assert_eq!(err.and_then(|e| e.status()), Some(StatusCode::NOT_FOUND));
    Ok(())
}

#[test]
fn update_omits_absent_fields() -> anyhow::Result<()> {
    let update = UpdateTicketRequest { title: Some("Renamed".into()), ..Default::default() };
    assert_eq!(serde_json::to_value(&update)?, json!({ "title": "Renamed" }));
    Ok(())
}
