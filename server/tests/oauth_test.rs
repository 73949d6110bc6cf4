//! HTTP tests for the OAuth callback route.

mod helpers;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::http::{header, StatusCode};
use http_body_util::BodyExt;

use vkbot_server::config::{AuthResponse, Config};
use vkbot_server::message::{registry, AuthVk};
use vkbot_server::middleware::Chain;

use helpers::{get, test_router, CannedClient, MemoryRepo};

const TOKEN_BODY: &[u8] =
    br#"{"access_token":"T","user_id":66748,"expires_in":43200,"email":"e@x.com"}"#;

fn oauth_router(cfg: Config, client: Arc<CannedClient>, repo: Arc<MemoryRepo>) -> axum::Router {
    let auth = AuthVk::new(cfg.vk_oauth.clone(), client, repo, Vec::new());
    test_router(cfg, registry(vec![Arc::new(auth)]), Chain::new(vec![]))
}

#[tokio::test]
async fn successful_callback_creates_user_sets_cookie_and_redirects() {
    let cfg = Config::default_for_test();
    let client = Arc::new(CannedClient::new(TOKEN_BODY));
    let repo = Arc::new(MemoryRepo::default());
    let router = oauth_router(cfg, client.clone(), repo.clone());

    let response = get(&router, "/vk_auth?code=777").await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "https://host.domain/?args"
    );
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cookie.starts_with("token=T"));

    assert_eq!(repo.creates.load(Ordering::SeqCst), 1);
    let requested = client.urls.lock().unwrap();
    assert!(requested[0].contains("code=777"));
}

#[tokio::test]
async fn ack_mode_answers_in_place_instead_of_redirecting() {
    let mut cfg = Config::default_for_test();
    cfg.vk_oauth.on_success = AuthResponse::Ack;
    let router = oauth_router(
        cfg,
        Arc::new(CannedClient::new(TOKEN_BODY)),
        Arc::new(MemoryRepo::default()),
    );

    let response = get(&router, "/vk_auth?code=777").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn non_default_route_segment_still_reaches_the_handler() {
    let mut cfg = Config::default_for_test();
    cfg.vk_oauth.path = "oauth_vk".into();
    let repo = Arc::new(MemoryRepo::default());
    let router = oauth_router(cfg, Arc::new(CannedClient::new(TOKEN_BODY)), repo.clone());

    let response = get(&router, "/oauth_vk?code=777").await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(repo.creates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn path_prefix_is_honoured_when_matching_the_route() {
    let mut cfg = Config::default_for_test();
    cfg.path_prefix = "/myza/".into();
    let repo = Arc::new(MemoryRepo::default());
    let router = oauth_router(cfg, Arc::new(CannedClient::new(TOKEN_BODY)), repo.clone());

    let response = get(&router, "/myza/vk_auth?code=777").await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(repo.creates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn callback_without_code_is_an_internal_error() {
    let client = Arc::new(CannedClient::new(TOKEN_BODY));
    let router = oauth_router(
        Config::default_for_test(),
        client.clone(),
        Arc::new(MemoryRepo::default()),
    );

    let response = get(&router, "/vk_auth?state=xyz").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(client.urls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn token_endpoint_failure_creates_nothing() {
    let repo = Arc::new(MemoryRepo::default());
    let router = oauth_router(
        Config::default_for_test(),
        Arc::new(CannedClient::failing()),
        repo.clone(),
    );

    let response = get(&router, "/vk_auth?code=777").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(repo.creates.load(Ordering::SeqCst), 0);
}
