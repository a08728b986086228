//! Users: a manual view set, every route written by hand.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, ModelTrait, QueryFilter, QueryOrder,
};
use std::sync::Arc;

use super::{
    AppState,
    entities::{company, position, user},
    schemas::{CompanySchema, PositionBrief, PositionInUser, UserCreate, UserDetail, UserUpdate},
};
use crate::{
    ApiError,
    config::Settings,
    validation::Validatable,
    viewset::{Action, Transponder, ViewSet},
};

pub fn viewset() -> ViewSet<AppState> {
    ViewSet::new("UserViewSet")
        .action(
            Action::post("create", "", create)
                .description("Create a user")
                .status(201)
                .request::<UserCreate>()
                .response::<UserDetail>(),
        )
        .action(
            Action::get("all", "/all", all)
                .description("Query all users")
                .response_list::<UserDetail>(),
        )
        .action(
            Action::get("get", "/{pk}", get)
                .description("Query a user")
                .response::<UserDetail>()
                .not_found(),
        )
        .action(
            Action::patch("update", "/{pk}", update)
                .description("Update a user")
                .request::<UserUpdate>()
                .response::<UserDetail>()
                .not_found(),
        )
        .action(
            Action::delete("delete", "/{pk}", delete)
                .description("Delete a user")
                .response::<UserDetail>()
                .not_found(),
        )
}

async fn position_in_user(
    db: &DatabaseConnection,
    model: position::Model,
) -> Result<PositionInUser, DbErr> {
    let higher = match model.higher_id {
        Some(id) => position::Entity::find_by_id(id).one(db).await?,
        None => None,
    };
    let lowers = position::Entity::find()
        .filter(position::Column::HigherId.eq(model.id))
        .order_by_asc(position::Column::Id)
        .all(db)
        .await?;
    Ok(PositionInUser {
        id: model.id,
        name: model.name,
        level: model.level,
        higher: higher.map(PositionBrief::from),
        lowers: lowers.into_iter().map(PositionBrief::from).collect(),
    })
}

/// The user with their company and position
pub(super) async fn detail(db: &DatabaseConnection, model: user::Model) -> Result<UserDetail, DbErr> {
    let company = model.find_related(company::Entity).one(db).await?;
    let position = match model.find_related(position::Entity).one(db).await? {
        Some(position) => Some(position_in_user(db, position).await?),
        None => None,
    };
    Ok(UserDetail::new(model, company.map(CompanySchema::from), position))
}

async fn find(view: &Transponder, db: &DatabaseConnection, uid: &str) -> Result<user::Model, ApiError> {
    user::Entity::find_by_id(uid.to_string())
        .one(db)
        .await?
        .ok_or_else(|| view.not_found(uid))
}

/// Next free uid: local `YYMM` followed by a five digit sequence, one past
/// the highest sequence issued this month. Deleted uids are never reissued.
async fn next_uid(db: &DatabaseConnection, settings: &Settings) -> Result<String, DbErr> {
    let prefix = Utc::now()
        .with_timezone(&settings.local_offset)
        .format("%y%m")
        .to_string();
    let last = user::Entity::find()
        .filter(user::Column::Uid.starts_with(&prefix))
        .order_by_desc(user::Column::Uid)
        .one(db)
        .await?;
    let sequence = last
        .and_then(|last| last.uid.get(prefix.len()..)?.parse::<u32>().ok())
        .unwrap_or(0);
    Ok(format!("{prefix}{:05}", sequence + 1))
}

async fn create(
    State(db): State<DatabaseConnection>,
    State(settings): State<Arc<Settings>>,
    Json(body): Json<UserCreate>,
) -> Result<(StatusCode, Json<UserDetail>), ApiError> {
    body.validate()?;
    let uid = next_uid(&db, &settings).await?;
    let model = user::ActiveModel {
        password: Set(user::hash_password(&uid, &body.password)),
        uid: Set(uid),
        username: Set(body.username),
        name: Set(body.name),
        family_name: Set(body.family_name),
        user_number: Set(body.user_number),
        ..Default::default()
    }
    .insert(&db)
    .await?;

    tracing::info!(uid = %model.uid, "created user");
    Ok((StatusCode::CREATED, Json(detail(&db, model).await?)))
}

async fn all(
    State(db): State<DatabaseConnection>,
) -> Result<([(&'static str, &'static str); 1], Json<Vec<UserDetail>>), ApiError> {
    let models = user::Entity::find()
        .order_by_asc(user::Column::Uid)
        .all(&db)
        .await?;
    let mut users = Vec::with_capacity(models.len());
    for model in models {
        users.push(detail(&db, model).await?);
    }
    Ok(([("No-Cache", "no_cache")], Json(users)))
}

async fn get(
    view: Transponder,
    State(db): State<DatabaseConnection>,
    Path(uid): Path<String>,
) -> Result<Json<UserDetail>, ApiError> {
    let model = find(&view, &db, &uid).await?;
    Ok(Json(detail(&db, model).await?))
}

/// Fields left out of the body keep their stored value.
async fn update(
    view: Transponder,
    State(db): State<DatabaseConnection>,
    Path(uid): Path<String>,
    Json(body): Json<UserUpdate>,
) -> Result<Json<UserDetail>, ApiError> {
    body.validate()?;
    let mut active = find(&view, &db, &uid).await?.into_active_model();
    if let Some(name) = body.name {
        active.name = Set(Some(name));
    }
    if let Some(username) = body.username {
        active.username = Set(username);
    }
    if let Some(password) = body.password {
        active.password = Set(user::hash_password(&uid, &password));
    }
    let model = active.update(&db).await?;
    Ok(Json(detail(&db, model).await?))
}

async fn delete(
    view: Transponder,
    State(db): State<DatabaseConnection>,
    Path(uid): Path<String>,
) -> Result<Json<UserDetail>, ApiError> {
    let model = find(&view, &db, &uid).await?;
    let deleted = detail(&db, model.clone()).await?;
    model.delete(&db).await?;
    tracing::info!(uid = %uid, "deleted user");
    Ok(Json(deleted))
}
