use axum::http::StatusCode;
use serde_json::json;

mod common;
use common::{create_company, create_position, send, setup_test_app, url};

#[tokio::test]
async fn test_get_returns_two_levels_of_lowers() {
    let app = setup_test_app().await;
    let company = create_company(&app, "Acme").await;
    let ceo = create_position(&app, company, "CEO", 1, None).await;
    let cto = create_position(&app, company, "CTO", 2, Some(ceo)).await;
    create_position(&app, company, "Engineer", 3, Some(cto)).await;

    let (status, body) = send(&app, "GET", &url(&format!("/user/position/{ceo}")), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "CEO");
    assert_eq!(body["lowers"][0]["name"], "CTO");
    assert_eq!(body["lowers"][0]["lowers"][0]["name"], "Engineer");
    assert_eq!(body["lowers"][0]["lowers"][0]["higher_id"], cto);
}

#[tokio::test]
async fn test_create_enforces_business_rules() {
    let app = setup_test_app().await;
    let acme = create_company(&app, "Acme").await;
    let other = create_company(&app, "Other").await;
    let ceo = create_position(&app, acme, "CEO", 1, None).await;
    let other_ceo = create_position(&app, other, "CEO", 1, None).await;

    let create = |body: serde_json::Value| send(&app, "POST", "/api/sample/user/position", Some(body));

    // not ranked below the higher position
    let (status, _) = create(json!({ "name": "VP", "level": 1, "company_id": acme, "higher_id": ceo })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // higher position of another company
    let (status, _) = create(json!({ "name": "VP", "level": 2, "company_id": acme, "higher_id": other_ceo })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = create(json!({ "name": "CEO", "level": 2, "company_id": acme })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = create(json!({ "name": "VP", "level": 2, "company_id": 999 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = create(json!({ "name": "VP", "level": 8, "company_id": acme })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = create(json!({ "name": "VP", "level": 2, "company_id": acme, "higher_id": ceo })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["higher_id"], ceo);
}

#[tokio::test]
async fn test_update_rechecks_rank_and_name() {
    let app = setup_test_app().await;
    let company = create_company(&app, "Acme").await;
    let ceo = create_position(&app, company, "CEO", 1, None).await;
    let cto = create_position(&app, company, "CTO", 2, Some(ceo)).await;
    let path = url(&format!("/user/position/{cto}"));

    let (status, _) = send(&app, "PATCH", &path, Some(json!({ "level": 1 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "PATCH", &path, Some(json!({ "name": "CEO" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "PATCH", &path, Some(json!({ "name": "CIO", "level": 3 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "CIO");
    assert_eq!(body["level"], 3);
    assert_eq!(body["higher_id"], ceo);

    let (status, body) = send(&app, "PATCH", &path, Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "CIO");
}

#[tokio::test]
async fn test_update_of_root_position_skips_higher_check() {
    let app = setup_test_app().await;
    let company = create_company(&app, "Acme").await;
    let ceo = create_position(&app, company, "CEO", 1, None).await;

    let (status, body) = send(
        &app,
        "PATCH",
        &url(&format!("/user/position/{ceo}")),
        Some(json!({ "level": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["level"], 2);
    assert_eq!(body["higher_id"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_tree_lists_root_positions() {
    let app = setup_test_app().await;
    let acme = create_company(&app, "Acme").await;
    let other = create_company(&app, "Other").await;
    let ceo = create_position(&app, acme, "CEO", 1, None).await;
    create_position(&app, acme, "CTO", 2, Some(ceo)).await;
    create_position(&app, other, "Boss", 1, None).await;

    let (status, body) = send(&app, "GET", &url("/user/position/tree"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = send(&app, "GET", &url(&format!("/user/position/tree?company_id={acme}")), None).await;
    let roots = body.as_array().unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0]["lowers"][0]["name"], "CTO");
}

#[tokio::test]
async fn test_add_lowers() {
    let app = setup_test_app().await;
    let acme = create_company(&app, "Acme").await;
    let other = create_company(&app, "Other").await;
    let cto = create_position(&app, acme, "CTO", 2, None).await;
    let engineer = create_position(&app, acme, "Engineer", 3, None).await;
    let director = create_position(&app, acme, "Director", 2, None).await;
    let outsider = create_position(&app, other, "Engineer", 3, None).await;
    let path = url(&format!("/user/position/{cto}/add_lowers"));

    let (status, _) = send(&app, "POST", &path, Some(json!({ "lowers": [director] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "POST", &path, Some(json!({ "lowers": [outsider] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        &url("/user/position/999/add_lowers"),
        Some(json!({ "lowers": [engineer] })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "POST", &path, Some(json!({ "lowers": [engineer] }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lowers"][0]["id"], engineer);
}

#[tokio::test]
async fn test_synthesized_all_and_delete() {
    let app = setup_test_app().await;
    let company = create_company(&app, "Acme").await;
    let ceo = create_position(&app, company, "CEO", 1, None).await;

    let (status, body) = send(&app, "GET", &url("/user/position/all"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = send(&app, "DELETE", &url(&format!("/user/position/{ceo}")), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "CEO");

    let (status, body) = send(&app, "GET", &url(&format!("/user/position/{ceo}")), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], format!("Position with ID '{ceo}' not found"));
}
