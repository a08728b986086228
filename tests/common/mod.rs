#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use viewcrate::{
    config::Settings,
    logging::{LogConfig, LogRegistry, LogSubscriber},
    sample::{self, AppState, migration::Migrator},
};

pub const BASE: &str = "/api/sample";

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect("sqlite::memory:").await?;

    Migrator::up(&db, None).await?;

    Ok(db)
}

/// State for `db`. The log sinks can only be reconfigured while the returned
/// subscriber is alive.
pub fn test_state(db: DatabaseConnection, log: &LogConfig) -> (AppState, LogSubscriber) {
    let (logs, subscriber) = LogRegistry::build(log).expect("Failed to build log sinks");
    let settings = Settings::from_lookup(|_| None).expect("Default settings are valid");
    let state = AppState {
        db,
        logs: Arc::new(logs),
        settings: Arc::new(settings),
    };
    (state, subscriber)
}

pub async fn setup_test_app() -> Router {
    let db = setup_test_db()
        .await
        .expect("Failed to setup test database");
    let (state, _) = test_state(db, &LogConfig::default());
    sample::router(state)
}

/// Send one request, returning the status and the decoded JSON body
/// (`Value::Null` when the body is empty).
pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

pub fn url(path: &str) -> String {
    format!("{BASE}{path}")
}

pub async fn create_company(app: &Router, name: &str) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        &url("/user/company"),
        Some(serde_json::json!({ "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
}

pub async fn create_position(
    app: &Router,
    company_id: i64,
    name: &str,
    level: i32,
    higher_id: Option<i64>,
) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        &url("/user/position"),
        Some(serde_json::json!({
            "name": name,
            "level": level,
            "company_id": company_id,
            "higher_id": higher_id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
}

pub async fn create_user(app: &Router, username: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        &url("/user/user"),
        Some(serde_json::json!({
            "username": username,
            "password": "secret",
            "password_again": "secret",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["uid"].as_str().unwrap().to_string()
}
