use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    extract::connect_info::MockConnectInfo,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use text_summarizer::{
    api::routes::create_router,
    config::Config,
    error::{AppError, Result},
    scraper::ArticleExtractor,
    store::{self, SummaryStore},
    summarizer::FrequencySummarizer,
    AppState,
};

struct FakeExtractor;

#[async_trait]
impl ArticleExtractor for FakeExtractor {
    async fn extract(&self, url: &str) -> Result<String> {
        match url {
            "https://news.example/rust" => Ok("Rust is fast. Rust is safe. Cats sleep a lot.".to_string()),
            "https://news.example/empty" => Ok(String::new()),
            "https://news.example/slow" => {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok("Too late.".to_string())
            }
            _ => Err(AppError::SourceFetch(format!("{} returned 404 Not Found", url))),
        }
    }
}

async fn test_state() -> AppState {
    test_state_with(Config::default()).await
}

async fn test_state_with(config: Config) -> AppState {
    let pool = store::connect("sqlite::memory:").await.unwrap();
    let store = SummaryStore::new(pool);
    store.init().await.unwrap();

    AppState::new(
        config,
        store,
        Arc::new(FakeExtractor),
        Arc::new(FrequencySummarizer::english()),
    )
}

fn app_for(state: AppState, client: [u8; 4]) -> Router {
    create_router(state).layer(MockConnectInfo(SocketAddr::from((client, 40000))))
}

async fn test_app() -> Router {
    app_for(test_state().await, [10, 0, 0, 1])
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn root_returns_welcome_message() {
    let app = test_app().await;
    let (status, body) = send(&app, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Welcome to the Text Summarizer API!");
}

#[tokio::test]
async fn summarize_text_picks_sentences_in_order() {
    let app = test_app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/summarize",
        Some(json!({"text": "A. B. C. D. E.", "sentences_count": 2})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let summary = body["summary"].as_str().unwrap();
    let sentences: Vec<&str> = summary.split(' ').collect();
    assert_eq!(sentences.len(), 2);

    let original = ["A.", "B.", "C.", "D.", "E."];
    let first = original.iter().position(|s| *s == sentences[0]).unwrap();
    let second = original.iter().position(|s| *s == sentences[1]).unwrap();
    assert!(first < second);
}

#[tokio::test]
async fn summarize_without_input_is_bad_request() {
    let app = test_app().await;
    let (status, body) = send(&app, Method::POST, "/summarize", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("No text or URL provided"));
}

#[tokio::test]
async fn summarize_rejects_non_positive_sentence_count() {
    let app = test_app().await;
    let (status, _) = send(
        &app,
        Method::POST,
        "/summarize",
        Some(json!({"text": "One. Two.", "sentences_count": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn summarize_rejects_negative_sentence_count() {
    let app = test_app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/summarize",
        Some(json!({"text": "One. Two.", "sentences_count": -1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("sentences_count"));
}

#[tokio::test]
async fn slow_source_times_out_as_fetch_failure() {
    let config = Config {
        summarize_timeout: Duration::from_millis(50),
        ..Config::default()
    };
    let app = app_for(test_state_with(config).await, [10, 0, 0, 1]);

    let (status, body) = send(
        &app,
        Method::POST,
        "/summarize",
        Some(json!({"url": "https://news.example/slow"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().starts_with("Failed to process URL"));

    let (_, body) = send(&app, Method::GET, "/history", None).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn summarize_url_uses_extracted_text() {
    let app = test_app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/summarize",
        Some(json!({"text": "Ignored.", "url": "https://news.example/rust", "sentences_count": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"], "Rust is fast. Rust is safe. Cats sleep a lot.");
}

#[tokio::test]
async fn summarize_url_failure_is_bad_request() {
    let app = test_app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/summarize",
        Some(json!({"url": "https://news.example/missing"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().starts_with("Failed to process URL"));

    let (status, body) = send(
        &app,
        Method::POST,
        "/summarize",
        Some(json!({"url": "https://news.example/empty"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("No valid text"));
}

#[tokio::test]
async fn history_lists_newest_first_and_filters() {
    let app = test_app().await;
    for text in ["Apples are red.", "Bananas are yellow.", "Green apples are sour."] {
        let (status, _) = send(&app, Method::POST, "/summarize", Some(json!({"text": text}))).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(&app, Method::GET, "/history", None).await;
    assert_eq!(status, StatusCode::OK);
    let records = body.as_array().unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["summary_text"], "Green apples are sour.");
    assert!(records[0]["id"].is_i64());
    assert!(records[0]["created_at"].is_string());

    let (_, body) = send(&app, Method::GET, "/history?search=APPLES", None).await;
    let texts: Vec<_> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["summary_text"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(texts, vec!["Green apples are sour.", "Apples are red."]);

    let (_, body) = send(&app, Method::GET, "/history?limit=1&offset=1", None).await;
    let records = body.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["summary_text"], "Bananas are yellow.");
}

#[tokio::test]
async fn delete_history_entries() {
    let app = test_app().await;
    send(&app, Method::POST, "/summarize", Some(json!({"text": "Keep this."}))).await;
    send(&app, Method::POST, "/summarize", Some(json!({"text": "Drop this."}))).await;

    let (_, body) = send(&app, Method::GET, "/history", None).await;
    let id = body[0]["id"].as_i64().unwrap();

    let (status, body) = send(&app, Method::DELETE, &format!("/history/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("deleted"));

    let (status, body) = send(&app, Method::DELETE, &format!("/history/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].as_str().unwrap().contains("not found"));

    let (status, _) = send(&app, Method::DELETE, "/history", None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, Method::GET, "/history", None).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn delete_unknown_id_is_not_found() {
    let app = test_app().await;
    let (status, _) = send(&app, Method::DELETE, "/history/424242", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sixteenth_request_is_rate_limited() {
    let app = test_app().await;
    for i in 0..15 {
        let (status, _) = send(
            &app,
            Method::POST,
            "/summarize",
            Some(json!({"text": format!("Request number {}.", i)})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "request {} should be admitted", i + 1);
    }

    let request = Request::builder()
        .method(Method::POST)
        .uri("/summarize")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"text": "One too many."}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));

    // The welcome route is not limited.
    let (status, _) = send(&app, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn rate_limits_are_per_client() {
    let state = test_state().await;
    let first = app_for(state.clone(), [10, 0, 0, 1]);
    let second = app_for(state, [10, 0, 0, 2]);

    for _ in 0..15 {
        let (status, _) = send(&first, Method::GET, "/history", None).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _) = send(&first, Method::GET, "/history", None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    let (status, _) = send(&second, Method::GET, "/history", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn cors_allows_configured_origin_only() {
    let app = test_app().await;

    let preflight = |origin: &'static str| {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/summarize")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap()
    };

    let response = app.clone().oneshot(preflight("http://localhost:3000")).await.unwrap();
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:3000"
    );

    let response = app.clone().oneshot(preflight("http://evil.example")).await.unwrap();
    assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}
