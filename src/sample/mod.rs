//! A small HR service built from view sets: users, companies with their
//! positions, and a logger configuration endpoint.

pub mod company;
pub mod entities;
pub mod migration;
pub mod position;
pub mod schemas;
pub mod system_config;
pub mod user;

use axum::{
    Json, Router,
    extract::FromRef,
    routing::get,
};
use sea_orm::DatabaseConnection;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use utoipa_scalar::{Scalar, Servable};

use crate::{config::Settings, logging::LogRegistry, openapi, router::ApiRouter};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub logs: Arc<LogRegistry>,
    pub settings: Arc<Settings>,
}

/// Every route of the service under the configured base url, with the
/// OpenAPI document at `{base}/openapi.json` and its interactive viewer at
/// `{base}/docs`.
pub fn router(state: AppState) -> Router {
    let base = state.settings.base_url.clone();

    let mut api = ApiRouter::new(base.clone());

    let mut users = ApiRouter::new("/user");
    user::viewset().register(&mut users);
    company::viewset().register(&mut users);
    position::viewset().register(&mut users);
    api.include(users);

    let mut system = ApiRouter::new("/system_config");
    system_config::viewset().register(&mut system);
    api.include(system);

    let (routes, table) = api.finish();
    let doc = openapi::document("viewcrate", env!("CARGO_PKG_VERSION"), &table);
    tracing::info!(routes = table.len(), base = %base, "routes compiled");

    let health = if base.is_empty() { "/".to_string() } else { base.clone() };
    routes
        .merge(Scalar::with_url(format!("{base}/docs"), doc.clone()))
        .route(&health, get(|| async { Json(json!({ "message": "Service success!" })) }))
        .route(
            &format!("{base}/openapi.json"),
            get(move || async move { Json(doc) }),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
