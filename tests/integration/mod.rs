//! Integration tests for the visitor counter.
//!
//! These drive the full router against a real SQLite file in a temporary
//! directory.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use futures::future::join_all;
use pretty_assertions::assert_eq;
use serde_json::Value;
use tower::ServiceExt;

use visitor_counter::api::{create_router, AppState};
use visitor_counter::config::{Config, StoreBackend};
use visitor_counter::counter::CounterService;
use visitor_counter::store::{open_store, CounterStore, SqliteStore};

fn sqlite_app(path: &Path) -> (Router, SqliteStore) {
    let store = SqliteStore::open(path).expect("open sqlite store");
    let shared: Arc<dyn CounterStore> = Arc::new(store.clone());
    let counter = CounterService::new(shared, "site_visits", Duration::from_secs(5));
    (create_router(AppState::new(counter), "/"), store)
}

async fn post_count(app: Router) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// A fresh database starts the counter at one.
#[tokio::test]
async fn test_first_visit_counts_one() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _store) = sqlite_app(&dir.path().join("visits.db"));

    let (status, body) = post_count(app).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
}

/// A counter seeded at 41 answers 42.
#[tokio::test]
async fn test_seeded_counter_answers_next_value() {
    let dir = tempfile::tempdir().unwrap();
    let (app, store) = sqlite_app(&dir.path().join("visits.db"));
    store.seed("site_visits", 41).unwrap();

    let (_, body) = post_count(app).await;

    assert_eq!(body["count"], 42);
}

/// Preflights in between POSTs never move the counter.
#[tokio::test]
async fn test_preflight_does_not_increment() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _store) = sqlite_app(&dir.path().join("visits.db"));

    post_count(app.clone()).await;
    for _ in 0..5 {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let (_, body) = post_count(app).await;
    assert_eq!(body["count"], 2);
}

/// N concurrent POSTs from base B return exactly B+1..=B+N.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_posts_return_distinct_consecutive_counts() {
    let dir = tempfile::tempdir().unwrap();
    let (app, store) = sqlite_app(&dir.path().join("visits.db"));
    store.seed("site_visits", 1000).unwrap();

    let requests = (0..64).map(|_| {
        let app = app.clone();
        tokio::spawn(async move { post_count(app).await })
    });

    let mut counts: Vec<u64> = join_all(requests)
        .await
        .into_iter()
        .map(|result| {
            let (status, body) = result.unwrap();
            assert_eq!(status, StatusCode::OK);
            body["count"].as_u64().unwrap()
        })
        .collect();
    counts.sort_unstable();

    assert_eq!(counts, (1001..=1064).collect::<Vec<u64>>());
}

/// Counts persist across a store reopen.
#[tokio::test]
async fn test_count_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("visits.db");

    {
        let (app, _store) = sqlite_app(&path);
        post_count(app.clone()).await;
        post_count(app).await;
    }

    let (app, _store) = sqlite_app(&path);
    let (_, body) = post_count(app).await;
    assert_eq!(body["count"], 3);
}

/// The configured backend is what the router ends up using.
#[tokio::test]
async fn test_open_store_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        store_backend: StoreBackend::Sqlite,
        database_path: dir.path().join("configured.db"),
        counter_name: "landing_page".to_string(),
        ..Config::default()
    };
    config.validate().unwrap();

    let store = open_store(&config).unwrap();
    let counter = CounterService::from_config(store, &config);
    assert_eq!(counter.key(), "landing_page");

    let app = create_router(AppState::new(counter), &config.endpoint_path);
    let (status, body) = post_count(app).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
}
