//! HTTP boundary tests
//!
//! Drives the real route table and admission middleware through actix's
//! test service, backed by the in-memory store and cache.

mod common;

use std::sync::Arc;
use std::time::Duration;

use actix_web::http::{StatusCode, header};
use actix_web::test::{self, TestRequest};
use actix_web::{App, web};
use serde_json::{Value, json};

use common::memory_service;
use linkgate::api::{AdmissionMiddleware, configure_routes};
use linkgate::config::{BucketConfig, LimiterConfig, ServerConfig};
use linkgate::services::{AdmissionGate, AppContext, HttpSettings, LinkService};

// =============================================================================
// Test Setup
// =============================================================================

fn limiter(api_capacity: u32) -> LimiterConfig {
    LimiterConfig {
        global: BucketConfig {
            capacity: 1_000,
            refill_per_second: 1_000,
        },
        api: BucketConfig {
            capacity: api_capacity,
            refill_per_second: 1,
        },
        sweep_interval_secs: 60,
    }
}

fn context(links: Arc<LinkService>, api_capacity: u32, permanent_redirect: bool) -> AppContext {
    let server = ServerConfig {
        public_base_url: "https://s.example".into(),
        permanent_redirect,
        ..ServerConfig::default()
    };
    AppContext::new(
        links,
        Arc::new(AdmissionGate::from_config(&limiter(api_capacity))),
        HttpSettings::from_config(&server),
    )
}

macro_rules! app {
    ($ctx:expr) => {
        test::init_service(
            App::new()
                .wrap(AdmissionMiddleware)
                .app_data(web::Data::new($ctx))
                .configure(configure_routes),
        )
        .await
    };
}

fn shorten(body: Value) -> TestRequest {
    TestRequest::post().uri("/api/shorten").set_json(body)
}

// =============================================================================
// POST /api/shorten
// =============================================================================

#[actix_web::test]
async fn test_shorten_creates_then_reuses() {
    let (links, _, _) = memory_service();
    let app = app!(context(links, 100, false));

    let resp = test::call_service(&app, shorten(json!({"url": "https://example.com/a"})).to_request()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let first: Value = test::read_body_json(resp).await;
    assert_eq!(first["code"], 0);
    let code = first["data"]["code"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 7);
    assert_eq!(first["data"]["short_url"], format!("https://s.example/{}", code));
    assert_eq!(first["data"]["target"], "https://example.com/a");
    assert!(first["data"]["expires_at"].is_null());

    let resp = test::call_service(&app, shorten(json!({"url": "https://example.com/a"})).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let second: Value = test::read_body_json(resp).await;
    assert_eq!(second["data"]["code"], code.as_str());
}

#[actix_web::test]
async fn test_shorten_with_ttl_reports_expiry() {
    let (links, _, _) = memory_service();
    let app = app!(context(links, 100, false));

    let resp = test::call_service(
        &app,
        shorten(json!({"url": "https://ttl.example", "ttl_seconds": 600})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["data"]["expires_at"].is_string());
}

#[actix_web::test]
async fn test_shorten_rejects_invalid_url() {
    let (links, store, _) = memory_service();
    let app = app!(context(links, 100, false));

    for url in ["", "ftp://files.example/x", "not a url", "javascript:alert(1)"] {
        let resp = test::call_service(&app, shorten(json!({ "url": url })).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{:?}", url);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], 3002, "{:?}", url);
    }
    assert_eq!(store.inserts(), 0);
}

#[actix_web::test]
async fn test_shorten_rejects_bad_input() {
    let (links, _, _) = memory_service();
    let app = app!(context(links, 100, false));

    // 非法 custom_code
    let resp = test::call_service(
        &app,
        shorten(json!({"url": "https://a.example", "custom_code": "bad!"})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 1000);

    // ttl_seconds = 0
    let resp = test::call_service(
        &app,
        shorten(json!({"url": "https://a.example", "ttl_seconds": 0})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // 请求体不是合法 JSON
    let req = TestRequest::post()
        .uri("/api/shorten")
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 1000);
}

#[actix_web::test]
async fn test_shorten_alias_conflict() {
    let (links, _, _) = memory_service();
    let app = app!(context(links, 100, false));

    let resp = test::call_service(
        &app,
        shorten(json!({"url": "https://a.example", "custom_code": "mySite1"})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = test::call_service(
        &app,
        shorten(json!({"url": "https://b.example", "custom_code": "mySite1"})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 3001);
}

// =============================================================================
// GET /{code}
// =============================================================================

async fn create_code(links: &LinkService, url: &str) -> String {
    links
        .create(linkgate::services::CreateRequest {
            target: url.to_string(),
            ..Default::default()
        })
        .await
        .unwrap()
        .link
        .code
}

#[actix_web::test]
async fn test_redirect_found() {
    let (links, _, _) = memory_service();
    let code = create_code(&links, "https://example.com/target").await;
    let app = app!(context(links, 100, false));

    let req = TestRequest::get().uri(&format!("/{}", code)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        resp.headers().get(header::LOCATION).unwrap(),
        "https://example.com/target"
    );

    let req = TestRequest::default()
        .method(actix_web::http::Method::HEAD)
        .uri(&format!("/{}", code))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
}

#[actix_web::test]
async fn test_redirect_permanent_when_configured() {
    let (links, _, _) = memory_service();
    let code = create_code(&links, "https://example.com/p").await;
    let app = app!(context(links, 100, true));

    let req = TestRequest::get().uri(&format!("/{}", code)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
}

#[actix_web::test]
async fn test_redirect_failures_are_plain_404() {
    let (links, _, _) = memory_service();
    let expiring = links
        .create(linkgate::services::CreateRequest {
            target: "https://brief.example".into(),
            ttl_seconds: Some(1),
            ..Default::default()
        })
        .await
        .unwrap()
        .link
        .code;
    let app = app!(context(links, 100, false));

    tokio::time::sleep(Duration::from_millis(1_200)).await;

    for path in ["/Nope123".to_string(), "/bad!".to_string(), format!("/{}", expiring)] {
        let resp = test::call_service(&app, TestRequest::get().uri(&path).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", path);
        assert!(resp.headers().get(header::LOCATION).is_none());
        let body = test::read_body(resp).await;
        assert_eq!(body.as_ref(), b"Not Found");
    }
}

// =============================================================================
// GET /api/stats/{code}
// =============================================================================

#[actix_web::test]
async fn test_stats_window() {
    let (links, _, _) = memory_service();
    let code = create_code(&links, "https://stats.example").await;
    let app = app!(context(links, 100, false));

    let req = TestRequest::get().uri(&format!("/api/stats/{}", code)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["code"], code.as_str());
    assert_eq!(body["data"]["total_access"], 0);
    assert_eq!(body["data"]["daily"].as_array().unwrap().len(), 30);

    let req = TestRequest::get().uri("/api/stats/Nope123").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 3000);
}

// =============================================================================
// 准入限流
// =============================================================================

#[actix_web::test]
async fn test_api_bucket_rejects_burst() {
    let (links, _, _) = memory_service();
    let code = create_code(&links, "https://limited.example").await;
    let app = app!(context(links, 2, false));

    let stats = |ip: &str| {
        TestRequest::get()
            .uri(&format!("/api/stats/{}", code))
            .insert_header(("x-forwarded-for", ip.to_string()))
            .to_request()
    };

    let statuses = [
        test::call_service(&app, stats("203.0.113.7")).await.status(),
        test::call_service(&app, stats("203.0.113.7")).await.status(),
        test::call_service(&app, stats("203.0.113.7")).await.status(),
    ];
    assert_eq!(
        statuses,
        [StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]
    );

    let resp = test::call_service(&app, stats("203.0.113.7")).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 2004);

    // 其他客户端不受影响
    let resp = test::call_service(&app, stats("198.51.100.1")).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // 重定向同样消耗 API 桶，健康检查只走全局桶
    let req = TestRequest::get()
        .uri(&format!("/{}", code))
        .insert_header(("x-forwarded-for", "203.0.113.7"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

    let req = TestRequest::get()
        .uri("/health")
        .insert_header(("x-forwarded-for", "203.0.113.7"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_redirect_burst_is_limited() {
    let (links, _, _) = memory_service();
    let code = create_code(&links, "https://hot.example").await;
    let app = app!(context(links, 1, false));

    let mut statuses = Vec::new();
    for _ in 0..5 {
        let req = TestRequest::get()
            .uri(&format!("/{}", code))
            .insert_header(("x-forwarded-for", "192.0.2.44"))
            .to_request();
        statuses.push(test::call_service(&app, req).await.status());
    }
    assert_eq!(statuses[0], StatusCode::FOUND);
    assert!(
        statuses[1..]
            .iter()
            .all(|s| *s == StatusCode::TOO_MANY_REQUESTS),
        "{:?}",
        statuses
    );

    let resp = test::call_service(
        &app,
        TestRequest::default()
            .method(actix_web::http::Method::HEAD)
            .uri(&format!("/{}", code))
            .insert_header(("x-forwarded-for", "192.0.2.44"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
}

// =============================================================================
// GET /health
// =============================================================================

#[actix_web::test]
async fn test_health() {
    let (links, _, _) = memory_service();
    let app = app!(context(links, 100, false));

    let resp = test::call_service(&app, TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["storage_backend"], "counting");
    assert_eq!(body["data"]["cache_backend"], "memory");
}
