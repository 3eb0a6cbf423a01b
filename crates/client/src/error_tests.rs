// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    envelope = {
        br#"{"timestamp":"2026-01-01T10:00:00","message":"Invalid credentials","details":"uri=/api/auth/login"}"#,
        "Invalid credentials"
    },
    plain_text = { b"upstream exploded", "upstream exploded" },
    empty_message = { br#"{"message":""}"#, "{\"message\":\"\"}" },
    empty_body = { b"", "Unauthorized" },
)]
fn from_response_message(body: &[u8], expected: &str) {
    let err = ClientError::from_response(StatusCode::UNAUTHORIZED, &Method::POST, "/auth/login", body);
    match err {
        ClientError::Status { message, status, path, .. } => {
            assert_eq!(message, expected);
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(path, "/auth/login");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[test]
fn unauthorized_predicate() {
    let unauthorized = ClientError::from_response(StatusCode::UNAUTHORIZED, &Method::GET, "/x", b"");
    let forbidden = ClientError::from_response(StatusCode::FORBIDDEN, &Method::GET, "/x", b"");
    assert!(unauthorized.is_unauthorized());
    assert!(!forbidden.is_unauthorized());
    assert_eq!(forbidden.status(), Some(StatusCode::FORBIDDEN));
    assert!(!ClientError::MissingRefreshToken.is_unauthorized());
    assert_eq!(ClientError::Transport("reset".into()).status(), None);
}

#[test]
fn display_includes_request_line() {
    let err = ClientError::from_response(
        StatusCode::NOT_FOUND,
        &Method::GET,
        "/tickets/42",
        br#"{"message":"Ticket not found"}"#,
    );
    assert_eq!(err.to_string(), "GET /tickets/42 failed with 404 Not Found: Ticket not found");
}
