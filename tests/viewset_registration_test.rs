use axum::{
    Json,
    http::{Method, StatusCode},
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use utoipa::ToSchema;

use viewcrate::{
    Action, ApiRouter, ViewSet, Views,
    sample::{
        entities::{company, user},
        schemas::{CompanyCreate, CompanySchema, CompanyUpdate},
    },
    schema::InputSchema,
    validation::Validatable,
    viewset::{AttributeError, Operation},
};

mod common;
use common::{send, setup_test_db};

type State = DatabaseConnection;

fn company_viewset() -> ViewSet<State> {
    ViewSet::new("CompanyViewSet")
        .model::<company::Entity, company::ActiveModel>()
        .schema::<CompanySchema>()
        .pk::<i32>("id")
        .views(
            Views::new()
                .all()
                .create::<CompanyCreate>()
                .get()
                .update::<CompanyUpdate>()
                .delete(),
        )
}

fn paths(router: &ApiRouter<State>) -> Vec<(String, Vec<Method>)> {
    router
        .routes()
        .iter()
        .map(|route| (route.path.clone(), route.methods.clone()))
        .collect()
}

async fn ping() -> Json<Value> {
    Json(json!({ "pong": true }))
}

#[test]
fn test_full_declaration_synthesizes_five_routes() {
    let mut router = ApiRouter::new("/user");
    let viewset = company_viewset();
    viewset.register(&mut router);

    assert!(viewset.is_registered());
    assert!(!viewset.transponder().unwrap().is_manual());
    assert_eq!(
        paths(&router),
        vec![
            ("/company".to_string(), vec![Method::POST]),
            ("/company/all".to_string(), vec![Method::GET]),
            ("/company/{pk}".to_string(), vec![Method::GET]),
            ("/company/{pk}".to_string(), vec![Method::PATCH]),
            ("/company/{pk}".to_string(), vec![Method::DELETE]),
        ]
    );
    assert!(router.routes().iter().all(|route| route.synthesized));
    assert!(router.routes().iter().all(|route| route.integer_pk));
}

#[test]
fn test_static_paths_sort_before_parameters() {
    let mut router = ApiRouter::new("");
    company_viewset()
        .action(Action::get("zeta", "/zeta", ping))
        .register(&mut router);

    let all = router.routes().iter().position(|r| r.path == "/company/all").unwrap();
    let zeta = router.routes().iter().position(|r| r.path == "/company/zeta").unwrap();
    let pk = router.routes().iter().position(|r| r.path == "/company/{pk}").unwrap();
    assert!(all < zeta && zeta < pk);
}

#[test]
fn test_manual_viewset_registers_only_explicit_actions() {
    let mut router = ApiRouter::new("/system_config");
    let viewset = ViewSet::<State>::new("LoggerViewSet")
        .action(Action::get("get_config", "", ping))
        .action(Action::post("set_config", "", ping));
    viewset.register(&mut router);

    let transponder = viewset.transponder().unwrap();
    assert!(transponder.is_manual());
    assert_eq!(transponder.segment(), "logger");
    assert!(transponder.model().is_err());
    assert_eq!(
        paths(&router),
        vec![
            ("/logger".to_string(), vec![Method::GET]),
            ("/logger".to_string(), vec![Method::POST]),
        ]
    );
    assert!(router.routes().iter().all(|route| !route.integer_pk));
}

#[test]
fn test_incomplete_declaration_degrades_to_manual() {
    let viewset = ViewSet::<State>::new("CompanyViewSet")
        .model::<company::Entity, company::ActiveModel>()
        .schema::<CompanySchema>()
        .views(Views::new().all())
        .action(Action::get("ping", "/ping", ping));
    assert_eq!(viewset.validate().unwrap_err(), AttributeError::Missing("pk_type"));

    let mut router = ApiRouter::new("");
    viewset.register(&mut router);
    assert!(viewset.transponder().unwrap().is_manual());
    assert_eq!(paths(&router), vec![("/company/ping".to_string(), vec![Method::GET])]);
}

#[test]
fn test_create_without_input_schema_is_rejected() {
    let viewset = company_viewset().views(Views::new().all().with("create", None));
    assert_eq!(
        viewset.validate().unwrap_err(),
        AttributeError::MissingInput(Operation::Create)
    );

    let viewset = company_viewset().views(Views::new().with("list", None));
    assert_eq!(
        viewset.validate().unwrap_err(),
        AttributeError::UnknownOperation("list".to_string())
    );

    let viewset = company_viewset().views(
        Views::new().with("update", Some(InputSchema::partial::<CompanyUpdate>())),
    );
    assert!(viewset.validate().is_ok());
}

#[test]
fn test_second_registration_is_a_noop() {
    let viewset = company_viewset();
    let mut router = ApiRouter::new("/user");
    viewset.register(&mut router);
    let first = viewset.transponder().unwrap().clone();

    viewset.register(&mut router);
    assert_eq!(router.routes().len(), 5);
    assert!(viewset.transponder().unwrap().ptr_eq(&first));

    let mut other = ApiRouter::new("/other");
    viewset.register(&mut other);
    assert!(other.routes().is_empty());
}

#[test]
fn test_explicit_action_replaces_synthesized_operation() {
    let mut router = ApiRouter::new("");
    company_viewset()
        .action(Action::get("get", "/{pk}", ping).summary("Explicit get"))
        .register(&mut router);

    let gets: Vec<_> = router
        .routes()
        .iter()
        .filter(|route| route.name == "get")
        .collect();
    assert_eq!(gets.len(), 1);
    assert!(!gets[0].synthesized);
    assert_eq!(gets[0].summary, "Explicit get");
    assert_eq!(router.routes().len(), 5);
}

#[test]
fn test_default_summary_and_tags() {
    let mut router = ApiRouter::new("");
    company_viewset()
        .action(Action::patch("add_users", "/{pk}/add_users", ping))
        .action(Action::get("export", "/export", ping).tags(["reports"]).summary("Export"))
        .register(&mut router);

    let route = |name: &str| {
        router
            .routes()
            .iter()
            .find(|route| route.name == name)
            .unwrap()
            .clone()
    };
    assert_eq!(route("add_users").summary, "Add Users");
    assert_eq!(route("add_users").tags, vec!["CompanyViewSet"]);
    assert_eq!(route("all").summary, "All");
    assert_eq!(route("export").tags, vec!["reports", "CompanyViewSet"]);
    assert_eq!(route("create").status, 201);
    assert!(route("get").responses.contains_key(&404));
}

#[test]
fn test_duplicate_method_and_path_is_skipped() {
    let mut router = ApiRouter::new("");
    company_viewset().register(&mut router);
    ViewSet::<State>::new("CompanyViewSets")
        .action(Action::get("shadow", "/all", ping))
        .action(Action::get("extra", "/extra", ping))
        .register(&mut router);

    assert!(!router.routes().iter().any(|route| route.name == "shadow"));
    assert!(router.routes().iter().any(|route| route.name == "extra"));
}

#[test]
fn test_auto_prefix_can_be_disabled() {
    let mut router = ApiRouter::new("/health");
    ViewSet::<State>::new("HealthViewSet")
        .auto_prefix(false)
        .action(Action::get("ping", "/ping", ping))
        .register(&mut router);

    let (_, routes) = router.finish();
    assert_eq!(routes[0].path, "/health/ping");
}

#[tokio::test]
async fn test_registered_routes_serve_requests() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let mut router = ApiRouter::new("/api");
    company_viewset()
        .action(Action::get("ping", "/ping", ping))
        .register(&mut router);
    let (router, _) = router.finish();
    let app = router.with_state(db);

    let (status, body) = send(&app, "GET", "/api/company/ping", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "pong": true }));

    let (status, body) = send(&app, "POST", "/api/company", Some(json!({ "name": "Acme" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "Acme");

    let (status, body) = send(&app, "GET", "/api/company/all", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[derive(Serialize, Deserialize, ToSchema)]
struct UserRecord {
    uid: String,
    username: String,
    password: String,
    name: Option<String>,
    family_name: Option<String>,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
}

#[derive(Default, Serialize, Deserialize, ToSchema)]
struct UserPatch {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    family_name: Option<String>,
}

impl Validatable for UserPatch {}

fn timestamp(value: &Value) -> DateTime<Utc> {
    serde_json::from_value(value.clone()).unwrap()
}

#[tokio::test]
async fn test_synthesized_update_keeps_other_columns_and_runs_save_hooks() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let stored = user::ActiveModel {
        uid: Set("250100001".to_string()),
        username: Set("jdoe".to_string()),
        password: Set(user::hash_password("250100001", "secret")),
        name: Set(Some("John".to_string())),
        family_name: Set(Some("Doe".to_string())),
        ..Default::default()
    }
    .insert(&db)
    .await
    .unwrap();

    let mut router = ApiRouter::new("");
    ViewSet::<State>::new("UserViewSet")
        .model::<user::Entity, user::ActiveModel>()
        .schema::<UserRecord>()
        .pk::<String>("uid")
        .views(Views::new().get().update::<UserPatch>())
        .register(&mut router);
    let (router, _) = router.finish();
    let app = router.with_state(db);

    tokio::time::sleep(Duration::from_millis(20)).await;
    let (status, body) = send(&app, "PATCH", "/user/250100001", Some(json!({ "name": "X" }))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["name"], "X");
    assert_eq!(body["family_name"], "Doe");
    assert_eq!(body["username"], "jdoe");
    assert_eq!(body["password"], stored.password);
    assert_eq!(timestamp(&body["created_at"]), stored.created_at);
    let modified = timestamp(&body["modified_at"]);
    assert!(modified > stored.modified_at);

    tokio::time::sleep(Duration::from_millis(20)).await;
    let (status, body) = send(&app, "PATCH", "/user/250100001", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "X");
    assert!(timestamp(&body["modified_at"]) > modified);

    let (status, _) = send(&app, "PATCH", "/user/000000000", Some(json!({ "name": "Y" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
