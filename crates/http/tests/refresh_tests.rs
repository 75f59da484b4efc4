//! Token refresh behaviour of the Nutrilabel HTTP client

use futures::future::join_all;
use nutrilabel_http::{
    ClientError, FileCookieStore, FileTokenStore, Location, MemoryTokenStore, NutriClient,
    TokenStore,
};
use reqwest::Method;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PRODUCT_PATH: &str = "/products/1";

fn product_envelope() -> serde_json::Value {
    json!({
        "isSuccess": true,
        "result": { "productId": 1, "productName": "Oat Bar", "energy": 250.0 }
    })
}

fn token_envelope(token: &str) -> serde_json::Value {
    json!({ "isSuccess": true, "result": token })
}

/// Product endpoint accepting only `Bearer tok2`; everything else gets 401
async fn mount_product_endpoint(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(PRODUCT_PATH))
        .and(header("authorization", "Bearer tok2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(product_envelope()))
        .with_priority(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(PRODUCT_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .mount(server)
        .await;
}

fn client_for(server: &MockServer, token: &str) -> (NutriClient, Arc<MemoryTokenStore>) {
    let store = Arc::new(MemoryTokenStore::with_token(token));
    let client = NutriClient::builder()
        .base_url(server.uri())
        .token_store(store.clone())
        .build()
        .unwrap();
    (client, store)
}

async fn count_requests(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|request| request.url.path() == request_path)
        .count()
}

async fn count_with_bearer(server: &MockServer, request_path: &str, token: &str) -> usize {
    let expected = format!("Bearer {token}");
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|request| request.url.path() == request_path)
        .filter(|request| {
            request
                .headers
                .get("authorization")
                .and_then(|value| value.to_str().ok())
                == Some(expected.as_str())
        })
        .count()
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..300 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn test_valid_token_needs_no_refresh() {
    let server = MockServer::start().await;
    mount_product_endpoint(&server).await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_envelope("tok3")))
        .expect(0)
        .mount(&server)
        .await;

    let (client, store) = client_for(&server, "tok2");

    let product = client.get_product_detail(1).await.unwrap();
    assert_eq!(product.product_name, "Oat Bar");
    assert_eq!(store.load().unwrap().as_deref(), Some("tok2"));
    assert_eq!(count_with_bearer(&server, PRODUCT_PATH, "tok2").await, 1);
}

#[tokio::test]
async fn test_concurrent_rejections_share_one_refresh() {
    let server = MockServer::start().await;
    mount_product_endpoint(&server).await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_envelope("tok2"))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = client_for(&server, "tok1");

    let results = join_all((0..5).map(|_| client.get_product_detail(1))).await;

    for result in results {
        assert_eq!(result.unwrap().product_id, 1);
    }
    assert_eq!(count_requests(&server, "/token").await, 1);
    assert_eq!(count_with_bearer(&server, PRODUCT_PATH, "tok2").await, 5);
    assert_eq!(store.load().unwrap().as_deref(), Some("tok2"));
    assert!(!client.is_refreshing());
    assert_eq!(client.refresh_gate().queued(), 0);
}

#[tokio::test]
async fn test_request_queued_behind_inflight_refresh() {
    let server = MockServer::start().await;
    mount_product_endpoint(&server).await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_envelope("tok2"))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = client_for(&server, "tok1");

    // A is rejected first and leads the refresh
    let a = tokio::spawn({
        let client = client.clone();
        async move { client.get_product_detail(1).await }
    });
    wait_until(|| client.is_refreshing()).await;

    // B is rejected while A's refresh is in flight and waits for it
    let b = tokio::spawn({
        let client = client.clone();
        async move { client.get_product_detail(1).await }
    });
    wait_until(|| client.refresh_gate().queued() == 1).await;
    assert_eq!(count_requests(&server, "/token").await, 1);

    assert!(a.await.unwrap().is_ok());
    assert!(b.await.unwrap().is_ok());

    assert_eq!(store.load().unwrap().as_deref(), Some("tok2"));
    assert_eq!(count_with_bearer(&server, PRODUCT_PATH, "tok2").await, 2);
    assert!(!client.is_refreshing());
}

#[tokio::test]
async fn test_refresh_call_uses_no_bearer_header() {
    let server = MockServer::start().await;
    mount_product_endpoint(&server).await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_envelope("tok2")))
        .mount(&server)
        .await;

    let (client, _store) = client_for(&server, "tok1");
    client.get_product_detail(1).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let refresh = requests
        .iter()
        .find(|request| request.url.path() == "/token")
        .unwrap();
    assert!(!refresh.headers.contains_key("authorization"));
    assert!(refresh.body.is_empty());
}

#[tokio::test]
async fn test_refresh_failure_fails_every_waiter_and_resets() {
    let server = MockServer::start().await;
    mount_product_endpoint(&server).await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_string("refresh backend down")
                .set_delay(Duration::from_millis(200)),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_envelope("tok2")))
        .with_priority(2)
        .mount(&server)
        .await;

    let (client, store) = client_for(&server, "tok1");

    let results = join_all((0..3).map(|_| client.get_product_detail(1))).await;

    for result in results {
        match result {
            Err(err @ ClientError::RefreshFailed(_)) => {
                assert_eq!(err.status().map(|s| s.as_u16()), Some(500));
            }
            other => panic!("expected refresh failure, got {other:?}"),
        }
    }
    assert!(!client.is_refreshing());
    assert!(!client.auth_store().show_login_modal());
    assert_eq!(store.load().unwrap().as_deref(), Some("tok1"));

    // the next rejection starts its own refresh instead of stalling
    let product = client.get_product_detail(1).await.unwrap();
    assert_eq!(product.product_id, 1);
    assert_eq!(count_requests(&server, "/token").await, 2);
}

#[tokio::test]
async fn test_unauthorized_refresh_raises_login_prompt() {
    let server = MockServer::start().await;
    mount_product_endpoint(&server).await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("session expired"))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _store) = client_for(&server, "tok1");
    let mut prompt = client.auth_store().subscribe();

    let err = client.get_product_detail(1).await.unwrap_err();

    assert!(matches!(err, ClientError::RefreshFailed(_)));
    assert!(err.is_unauthorized());
    assert!(client.auth_store().show_login_modal());
    assert!(prompt.has_changed().unwrap());
    assert!(*prompt.borrow_and_update());
}

#[tokio::test]
async fn test_refresh_rejected_by_envelope() {
    let server = MockServer::start().await;
    mount_product_endpoint(&server).await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "isSuccess": false,
            "message": "refresh token revoked"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = client_for(&server, "tok1");

    match client.get_product_detail(1).await {
        Err(ClientError::RefreshFailed(cause)) => {
            assert!(
                matches!(cause.as_ref(), ClientError::RefreshRejected(message) if message == "refresh token revoked")
            );
        }
        other => panic!("expected refresh failure, got {other:?}"),
    }
    assert_eq!(store.load().unwrap().as_deref(), Some("tok1"));
    assert!(!client.auth_store().show_login_modal());
}

#[tokio::test]
async fn test_retried_request_is_not_refreshed_again() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PRODUCT_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("still expired"))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_envelope("tok2")))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _store) = client_for(&server, "tok1");

    let err = client.get_product_detail(1).await.unwrap_err();
    assert!(matches!(err, ClientError::AuthenticationFailed(ref message) if message == "still expired"));
    assert_eq!(count_with_bearer(&server, PRODUCT_PATH, "tok2").await, 1);
    assert!(!client.is_refreshing());
}

#[tokio::test]
async fn test_login_page_never_refreshes() {
    let server = MockServer::start().await;
    mount_product_endpoint(&server).await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_envelope("tok2")))
        .expect(0)
        .mount(&server)
        .await;

    let location = Location::parse("https://app.example.com/login").unwrap();
    let client = NutriClient::builder()
        .base_url(server.uri())
        .token_store(Arc::new(MemoryTokenStore::with_token("tok1")))
        .location(location)
        .build()
        .unwrap();

    let err = client.get_product_detail(1).await.unwrap_err();
    assert!(matches!(err, ClientError::AuthenticationFailed(_)));
    assert!(!client.auth_store().show_login_modal());
}

#[tokio::test]
async fn test_enroll_page_prompts_login_instead_of_refreshing() {
    let server = MockServer::start().await;
    mount_product_endpoint(&server).await;
    Mock::given(method("GET"))
        .and(path("/products/500"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_envelope("tok2")))
        .expect(0)
        .mount(&server)
        .await;

    let (client, _store) = client_for(&server, "tok1");
    client.location().navigate_to_path("/enroll");

    // other failures pass through without touching the prompt
    let err = client.get_product_detail(500).await.unwrap_err();
    assert!(matches!(err, ClientError::ServerError { status: 500, .. }));
    assert!(!client.auth_store().show_login_modal());

    let err = client.get_product_detail(1).await.unwrap_err();
    assert!(matches!(err, ClientError::AuthenticationFailed(_)));
    assert!(client.auth_store().show_login_modal());
}

#[tokio::test]
async fn test_token_handed_over_in_address() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PRODUCT_PATH))
        .and(header("authorization", "Bearer from-url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(product_envelope()))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::with_token("stale"));
    let location =
        Location::parse("https://app.example.com/search?access_token=from-url&page=2").unwrap();
    let client = NutriClient::builder()
        .base_url(server.uri())
        .token_store(store.clone())
        .location(location.clone())
        .build()
        .unwrap();

    client.get_product_detail(1).await.unwrap();

    assert_eq!(store.load().unwrap().as_deref(), Some("from-url"));
    assert_eq!(location.href(), "https://app.example.com/search?page=2");
}

#[tokio::test]
async fn test_hung_refresh_times_out() {
    let server = MockServer::start().await;
    mount_product_endpoint(&server).await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_envelope("tok2"))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::with_token("tok1"));
    let client = NutriClient::builder()
        .base_url(server.uri())
        .token_store(store)
        .refresh_timeout(Duration::from_millis(100))
        .build()
        .unwrap();

    let results = join_all((0..2).map(|_| client.get_product_detail(1))).await;

    for result in results {
        match result {
            Err(ClientError::RefreshFailed(cause)) => {
                assert!(matches!(cause.as_ref(), ClientError::RefreshTimeout(_)));
            }
            other => panic!("expected refresh timeout, got {other:?}"),
        }
    }
    assert!(!client.is_refreshing());
}

#[tokio::test]
async fn test_cancelled_refresh_releases_waiters() {
    let server = MockServer::start().await;
    mount_product_endpoint(&server).await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_envelope("tok2"))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let (client, _store) = client_for(&server, "tok1");

    let leader = tokio::spawn({
        let client = client.clone();
        async move { client.get_product_detail(1).await }
    });
    wait_until(|| client.is_refreshing()).await;

    let waiter = tokio::spawn({
        let client = client.clone();
        async move { client.get_product_detail(1).await }
    });
    wait_until(|| client.refresh_gate().queued() == 1).await;

    leader.abort();

    match waiter.await.unwrap() {
        Err(ClientError::RefreshFailed(cause)) => {
            assert!(matches!(cause.as_ref(), ClientError::RefreshAbandoned));
        }
        other => panic!("expected abandoned refresh, got {other:?}"),
    }
    assert!(!client.is_refreshing());
}

#[tokio::test]
async fn test_new_client_refreshes_with_stored_session_cookie() {
    let server = MockServer::start().await;
    mount_product_endpoint(&server).await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "refresh=abc; Path=/; Max-Age=3600")
                .set_body_json(token_envelope("tok1")),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header("cookie", "refresh=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_envelope("tok2")))
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let dir = tempfile::TempDir::new().unwrap();
    let build_client = || {
        NutriClient::builder()
            .base_url(server.uri())
            .token_store(Arc::new(FileTokenStore::new(dir.path())))
            .cookie_provider(Arc::new(FileCookieStore::open(dir.path()).unwrap()))
            .build()
            .unwrap()
    };

    // first process: log in, keep the token and the session cookie
    let first = build_client();
    let token: String = first
        .execute_envelope(first.request(Method::POST, "/auth/login"))
        .await
        .unwrap();
    first.set_access_token(&token).unwrap();
    drop(first);

    // second process: the stale token is refreshed with the stored cookie
    let second = build_client();
    let product = second.get_product_detail(1).await.unwrap();
    assert_eq!(product.product_id, 1);
    assert!(!second.auth_store().show_login_modal());
    assert_eq!(second.token_store().load().unwrap().as_deref(), Some("tok2"));
    assert_eq!(count_requests(&server, "/token").await, 1);
}
