//! Default handlers for the operations declared in `views`.

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
};
use sea_orm::DatabaseConnection;
use serde_json::Value;
use std::collections::HashSet;

use super::{
    action::Action,
    transponder::{ModelBinding, Transponder},
    views::Operation,
};
use crate::errors::ApiError;

/// One action per declared operation that no explicit action already covers
pub(crate) fn actions<S>(model: &ModelBinding, explicit: &HashSet<&str>) -> Vec<Action<S>>
where
    S: Clone + Send + Sync + 'static,
    DatabaseConnection: FromRef<S>,
{
    model
        .operations()
        .filter(|(operation, _)| !explicit.contains(operation.name()))
        .map(|(operation, input)| {
            let table = model.store().table();
            let schema = model.schema().doc().clone();
            let action = match operation {
                Operation::All => Action::get("all", "/all", all)
                    .description(format!("Query all {table}"))
                    .response_schema(schema.into_list()),
                Operation::Create => {
                    let action = Action::post("create", "", create)
                        .description(format!("Create {table}"))
                        .status(201)
                        .response_schema(schema);
                    match input {
                        Some(input) => action.request_schema(input.doc().clone()),
                        None => action,
                    }
                }
                Operation::Get => Action::get("get", "/{pk}", get)
                    .description(format!("Query {table} by primary key"))
                    .response_schema(schema)
                    .not_found(),
                Operation::Update => {
                    let action = Action::patch("update", "/{pk}", update)
                        .description(format!("Partially update {table}"))
                        .response_schema(schema)
                        .not_found();
                    match input {
                        Some(input) => action.request_schema(input.doc().clone()),
                        None => action,
                    }
                }
                Operation::Delete => Action::delete("delete", "/{pk}", delete)
                    .description(format!("Delete {table}, returning the deleted record"))
                    .response_schema(schema)
                    .not_found(),
            };
            action.synthesized()
        })
        .collect()
}

async fn all(
    view: Transponder,
    State(db): State<DatabaseConnection>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let model = view.model()?;
    let entities = model.store().all(&db).await?;
    Ok(Json(model.schema().from_entities(entities)?))
}

async fn create(
    view: Transponder,
    State(db): State<DatabaseConnection>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let model = view.model()?;
    let fields = model.input(Operation::Create)?.parse(body)?;
    let entity = model.store().create(&db, fields).await?;
    tracing::debug!(viewset = view.name(), "created record");
    Ok((StatusCode::CREATED, Json(model.schema().from_entity(entity)?)))
}

async fn get(
    view: Transponder,
    State(db): State<DatabaseConnection>,
    Path(pk): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let model = view.model()?;
    let key = model.pk_type().parse(&pk)?;
    let entity = model
        .store()
        .get(&db, &key)
        .await
        .map_err(|err| view.lookup_error(err, &pk))?;
    Ok(Json(model.schema().from_entity(entity)?))
}

/// Fields absent from the body, or left at their default, keep their stored
/// value. Concurrent updates of the same record are last-writer-wins.
async fn update(
    view: Transponder,
    State(db): State<DatabaseConnection>,
    Path(pk): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let model = view.model()?;
    let key = model.pk_type().parse(&pk)?;
    model
        .store()
        .get(&db, &key)
        .await
        .map_err(|err| view.lookup_error(err, &pk))?;

    let fields = model.input(Operation::Update)?.parse(body)?;
    model.store().update(&db, &key, fields).await?;

    let entity = model
        .store()
        .get(&db, &key)
        .await
        .map_err(|err| view.lookup_error(err, &pk))?;
    Ok(Json(model.schema().from_entity(entity)?))
}

async fn delete(
    view: Transponder,
    State(db): State<DatabaseConnection>,
    Path(pk): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let model = view.model()?;
    let key = model.pk_type().parse(&pk)?;
    let entity = model
        .store()
        .get(&db, &key)
        .await
        .map_err(|err| view.lookup_error(err, &pk))?;

    let deleted = model.store().delete(&db, &key).await?;
    tracing::debug!(viewset = view.name(), pk = %pk, deleted, "deleted record");
    Ok(Json(model.schema().from_entity(entity)?))
}
