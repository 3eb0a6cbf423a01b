// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::model::CredentialPair;
use crate::storage::MemoryStore;
use crate::test_support::sample_user;

fn terminator_at(
    path: &str,
    delay: Duration,
) -> anyhow::Result<(SessionTerminator, CredentialStore, Arc<MemoryNavigator>, broadcast::Receiver<SessionEvent>)>
{
    let credentials = CredentialStore::new(Arc::new(MemoryStore::new()));
    credentials.save_pair(&CredentialPair {
        access_token: "acc".into(),
        refresh_token: "ref".into(),
    })?;
    credentials.save_user(&sample_user("admin@example.com"))?;
    let navigator = Arc::new(MemoryNavigator::new(path));
    let (event_tx, event_rx) = broadcast::channel(16);
    let terminator =
        SessionTerminator::new(credentials.clone(), event_tx, navigator.clone(), "/login", delay);
    Ok((terminator, credentials, navigator, event_rx))
}

#[tokio::test]
async fn terminate_clears_broadcasts_and_redirects() -> anyhow::Result<()> {
    let (terminator, credentials, navigator, mut rx) =
        terminator_at("/tickets", Duration::from_millis(10))?;

    terminator.terminate(LogoutReason::RefreshFailed);

    assert_eq!(credentials.pair(), None);
    assert_eq!(credentials.user(), None);
    assert_eq!(rx.try_recv()?, SessionEvent::LoggedOut { reason: LogoutReason::RefreshFailed });

    // Redirect is deferred so observers react first.
    assert_eq!(navigator.current_path(), "/tickets");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(navigator.current_path(), "/login");
    assert_eq!(navigator.history(), vec!["/login".to_owned()]);
    Ok(())
}

#[tokio::test]
async fn no_redirect_when_already_on_login() -> anyhow::Result<()> {
    let (terminator, _credentials, navigator, mut rx) = terminator_at("/login", Duration::ZERO)?;

    terminator.terminate(LogoutReason::UserRequested);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(navigator.history().is_empty());
    assert_eq!(rx.try_recv()?, SessionEvent::LoggedOut { reason: LogoutReason::UserRequested });
    Ok(())
}

#[tokio::test]
async fn observer_navigation_to_login_suppresses_fallback() -> anyhow::Result<()> {
    let (terminator, _credentials, navigator, _rx) =
        terminator_at("/users", Duration::from_millis(30))?;

    terminator.terminate(LogoutReason::MissingRefreshToken);
    // An observer reacting to the signal gets there first.
    navigator.navigate("/login");
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(navigator.history(), vec!["/login".to_owned()]);
    Ok(())
}

#[test]
fn terminate_without_runtime_redirects_immediately() -> anyhow::Result<()> {
    let (terminator, _credentials, navigator, _rx) =
        terminator_at("/statistics", Duration::from_secs(60))?;

    terminator.terminate(LogoutReason::UserRequested);
    assert_eq!(navigator.current_path(), "/login");
    Ok(())
}

#[test]
fn logout_event_serializes_tagged() -> anyhow::Result<()> {
    let event = SessionEvent::LoggedOut { reason: LogoutReason::RefreshFailed };
    assert_eq!(
        serde_json::to_value(&event)?,
        serde_json::json!({ "event": "logged_out", "reason": "refresh_failed" })
    );
    Ok(())
}
