// Token refresh scheduling tests against a mock token endpoint
// Author: kelexine (https://github.com/kelexine)

use contact_relay::oauth::{
    ClientIdentity, CredentialStore, RefreshOutcome, RefreshScheduler, TokenEndpoint, TokenState,
};
use mockito::Matcher;
use std::time::Duration;

fn identity(token_uri: String) -> ClientIdentity {
    ClientIdentity {
        auth_uri: "https://accounts.google.com/o/oauth2/auth".to_string(),
        token_uri,
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
    }
}

fn scheduler(server: &mockito::ServerGuard, threshold: u32) -> (RefreshScheduler, CredentialStore) {
    let identity = identity(format!("{}/token", server.url()));
    let store = CredentialStore::new(identity.clone());
    let endpoint = TokenEndpoint::new(identity, Duration::from_secs(5)).unwrap();
    (RefreshScheduler::new(store.clone(), endpoint, threshold), store)
}

fn refresh_body(refresh_token: &str) -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
        Matcher::UrlEncoded("refresh_token".into(), refresh_token.into()),
        Matcher::UrlEncoded("client_id".into(), "client".into()),
    ])
}

#[tokio::test]
async fn test_idle_before_authorization() {
    let server = mockito::Server::new_async().await;
    let (mut scheduler, _) = scheduler(&server, 3);

    assert_eq!(scheduler.tick(1_000).await, RefreshOutcome::Idle);
}

#[tokio::test]
async fn test_no_request_before_ttl() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/token")
        .expect(0)
        .create_async()
        .await;

    let (mut scheduler, store) = scheduler(&server, 3);
    store
        .set_tokens(TokenState::issued("ya29.old".into(), "1//0r".into(), 3600, 1_000))
        .await;

    assert_eq!(scheduler.tick(1_000).await, RefreshOutcome::Fresh);
    assert_eq!(scheduler.tick(4_599).await, RefreshOutcome::Fresh);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_provisioned_token_refreshes_on_first_tick() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/token")
        .match_body(refresh_body("1//0provisioned"))
        .with_status(200)
        .with_body(r#"{"access_token":"ya29.fresh","expires_in":3599,"token_type":"Bearer"}"#)
        .expect(1)
        .create_async()
        .await;

    let (mut scheduler, store) = scheduler(&server, 3);
    store
        .set_tokens(TokenState::from_refresh_token("1//0provisioned"))
        .await;

    assert_eq!(scheduler.tick(1_000).await, RefreshOutcome::Refreshed);
    mock.assert_async().await;

    let tokens = store.tokens().await.unwrap();
    assert_eq!(tokens.access_token, "ya29.fresh");
    assert_eq!(tokens.refresh_token, "1//0provisioned");
    assert_eq!(tokens.issued_at, 1_000);
    assert_eq!(tokens.ttl_seconds, 3599);
    assert_eq!(store.access_token(1_001).await.as_deref(), Some("ya29.fresh"));

    // Not due again until a full lifetime has passed
    assert_eq!(scheduler.tick(4_598).await, RefreshOutcome::Fresh);
}

#[tokio::test]
async fn test_rotated_refresh_token_is_kept() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/token")
        .match_body(refresh_body("1//0old"))
        .with_status(200)
        .with_body(r#"{"access_token":"ya29.new","refresh_token":"1//0rotated","expires_in":3600}"#)
        .create_async()
        .await;

    let (mut scheduler, store) = scheduler(&server, 3);
    store
        .set_tokens(TokenState::issued("ya29.old".into(), "1//0old".into(), 60, 0))
        .await;

    assert_eq!(scheduler.tick(60).await, RefreshOutcome::Refreshed);
    assert_eq!(store.tokens().await.unwrap().refresh_token, "1//0rotated");
}

#[tokio::test]
async fn test_failures_counted_until_recovery() {
    let mut server = mockito::Server::new_async().await;
    let failing = server
        .mock("POST", "/token")
        .with_status(400)
        .with_body(r#"{"error":"invalid_grant"}"#)
        .expect(3)
        .create_async()
        .await;

    let (mut scheduler, store) = scheduler(&server, 2);
    store
        .set_tokens(TokenState::issued("ya29.old".into(), "1//0r".into(), 60, 0))
        .await;

    assert_eq!(scheduler.tick(60).await, RefreshOutcome::Failed(1));
    assert_eq!(scheduler.tick(61).await, RefreshOutcome::Failed(2));
    assert_eq!(scheduler.tick(62).await, RefreshOutcome::Failed(3));
    assert_eq!(scheduler.consecutive_failures(), 3);
    failing.assert_async().await;

    // The stale token is left in place, not served
    assert!(store.access_token(62).await.is_none());
    assert!(store.has_refresh_token().await);

    failing.remove_async().await;
    server
        .mock("POST", "/token")
        .with_status(200)
        .with_body(r#"{"access_token":"ya29.back","expires_in":3600}"#)
        .create_async()
        .await;

    assert_eq!(scheduler.tick(63).await, RefreshOutcome::Refreshed);
    assert_eq!(scheduler.consecutive_failures(), 0);
    assert_eq!(store.access_token(64).await.as_deref(), Some("ya29.back"));
}
