//! Positions: `all` and `delete` are synthesized, the rest carry business
//! rules and are written by hand.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, sea_query::Expr,
};

use super::{
    AppState,
    entities::{company, position},
    schemas::{
        AddLowers, PositionBranch, PositionCreate, PositionSchema, PositionTree, PositionUpdate,
        TreeQuery,
    },
};
use crate::{
    ApiError,
    validation::Validatable,
    viewset::{Action, Transponder, ViewSet, Views},
};

pub fn viewset() -> ViewSet<AppState> {
    ViewSet::new("PositionViewSet")
        .model::<position::Entity, position::ActiveModel>()
        .schema::<PositionSchema>()
        .pk::<i32>("id")
        .page_size(10)
        .views(Views::new().all().delete())
        .action(
            Action::post("create", "", create)
                .description("Create a position in a company. Level 1 is the highest.")
                .status(201)
                .request::<PositionCreate>()
                .response::<PositionSchema>(),
        )
        .action(
            Action::patch("update", "/{pk}", update)
                .request::<PositionUpdate>()
                .response::<PositionTree>()
                .not_found(),
        )
        .action(
            Action::get("get", "/{pk}", get)
                .response::<PositionTree>()
                .not_found(),
        )
        .action(
            Action::get("tree", "/tree", tree)
                .description("Root positions with their lower positions")
                .response_list::<PositionTree>(),
        )
        .action(
            Action::post("add_lowers", "/{pk}/add_lowers", add_lowers)
                .request::<AddLowers>()
                .response::<PositionTree>()
                .not_found(),
        )
}

async fn lowers_of(db: &DatabaseConnection, id: i32) -> Result<Vec<position::Model>, DbErr> {
    position::Entity::find()
        .filter(position::Column::HigherId.eq(id))
        .order_by_asc(position::Column::Id)
        .all(db)
        .await
}

/// The position with two levels of lower positions
async fn position_tree(db: &DatabaseConnection, model: position::Model) -> Result<PositionTree, DbErr> {
    let mut branches = Vec::new();
    for lower in lowers_of(db, model.id).await? {
        let leaves = lowers_of(db, lower.id).await?;
        branches.push(PositionBranch::new(
            lower,
            leaves.into_iter().map(PositionSchema::from).collect(),
        ));
    }
    Ok(PositionTree::new(model, branches))
}

async fn find(view: &Transponder, db: &DatabaseConnection, pk: i32) -> Result<position::Model, ApiError> {
    position::Entity::find_by_id(pk)
        .one(db)
        .await?
        .ok_or_else(|| view.not_found(&pk.to_string()))
}

/// Check that `higher_id` names another position of the company ranked above `level`.
async fn check_higher(
    db: &DatabaseConnection,
    company_id: i32,
    higher_id: i32,
    level: i32,
    exclude: Option<i32>,
) -> Result<(), ApiError> {
    let mut query = position::Entity::find()
        .filter(position::Column::Id.eq(higher_id))
        .filter(position::Column::CompanyId.eq(company_id));
    if let Some(id) = exclude {
        query = query.filter(position::Column::Id.ne(id));
    }
    let higher = query
        .one(db)
        .await?
        .ok_or_else(|| ApiError::bad_request("Higher position does not exist in this company"))?;
    if level <= higher.level {
        return Err(ApiError::bad_request(
            "Position level must be lower than its higher position",
        ));
    }
    Ok(())
}

async fn name_taken(
    db: &DatabaseConnection,
    company_id: i32,
    name: &str,
    exclude: Option<i32>,
) -> Result<bool, DbErr> {
    let mut query = position::Entity::find()
        .filter(position::Column::CompanyId.eq(company_id))
        .filter(position::Column::Name.eq(name));
    if let Some(id) = exclude {
        query = query.filter(position::Column::Id.ne(id));
    }
    Ok(query.count(db).await? > 0)
}

async fn create(
    State(db): State<DatabaseConnection>,
    Json(body): Json<PositionCreate>,
) -> Result<(StatusCode, Json<PositionSchema>), ApiError> {
    body.validate()?;
    if company::Entity::find_by_id(body.company_id).one(&db).await?.is_none() {
        return Err(ApiError::bad_request("Company does not exist"));
    }
    if let Some(higher_id) = body.higher_id {
        check_higher(&db, body.company_id, higher_id, body.level, None).await?;
    }
    if name_taken(&db, body.company_id, &body.name, None).await? {
        return Err(ApiError::bad_request(
            "Position name already exists in this company",
        ));
    }

    let model = position::ActiveModel {
        name: Set(body.name),
        level: Set(body.level),
        company_id: Set(body.company_id),
        higher_id: Set(body.higher_id),
        ..Default::default()
    }
    .insert(&db)
    .await?;
    Ok((StatusCode::CREATED, Json(model.into())))
}

/// When the level or the higher position changes, the resolved pair must
/// still rank this position below its higher position.
async fn update(
    view: Transponder,
    State(db): State<DatabaseConnection>,
    Path(pk): Path<i32>,
    Json(body): Json<PositionUpdate>,
) -> Result<Json<PositionTree>, ApiError> {
    body.validate()?;
    let current = find(&view, &db, pk).await?;

    if let Some(name) = &body.name {
        if name_taken(&db, current.company_id, name, Some(pk)).await? {
            return Err(ApiError::bad_request(
                "Position name is used by another position of this company",
            ));
        }
    }

    let mut active = current.clone().into_active_model();
    if body.level.is_some() || body.higher_id.is_some() {
        let level = body.level.unwrap_or(current.level);
        let higher_id = body.higher_id.or(current.higher_id);
        if let Some(higher_id) = higher_id {
            check_higher(&db, current.company_id, higher_id, level, Some(pk)).await?;
        }
        active.level = Set(level);
        active.higher_id = Set(higher_id);
    }
    if let Some(name) = body.name {
        active.name = Set(name);
    }

    let model = if active.is_changed() {
        active.update(&db).await?
    } else {
        current
    };
    Ok(Json(position_tree(&db, model).await?))
}

async fn get(
    view: Transponder,
    State(db): State<DatabaseConnection>,
    Path(pk): Path<i32>,
) -> Result<Json<PositionTree>, ApiError> {
    let model = find(&view, &db, pk).await?;
    Ok(Json(position_tree(&db, model).await?))
}

async fn tree(
    State(db): State<DatabaseConnection>,
    Query(query): Query<TreeQuery>,
) -> Result<Json<Vec<PositionTree>>, ApiError> {
    let mut roots = position::Entity::find()
        .filter(position::Column::HigherId.is_null())
        .order_by_asc(position::Column::Id);
    if let Some(company_id) = query.company_id {
        roots = roots.filter(position::Column::CompanyId.eq(company_id));
    }
    if let Some(level) = query.level {
        roots = roots.filter(position::Column::Level.eq(level));
    }

    let mut trees = Vec::new();
    for root in roots.all(&db).await? {
        trees.push(position_tree(&db, root).await?);
    }
    Ok(Json(trees))
}

async fn add_lowers(
    view: Transponder,
    State(db): State<DatabaseConnection>,
    Path(pk): Path<i32>,
    Json(body): Json<AddLowers>,
) -> Result<Json<PositionTree>, ApiError> {
    let current = find(&view, &db, pk).await?;

    let found = position::Entity::find()
        .filter(position::Column::Id.is_in(body.lowers.iter().copied()))
        .filter(position::Column::CompanyId.eq(current.company_id))
        .count(&db)
        .await?;
    if found != body.lowers.len() as u64 {
        return Err(ApiError::bad_request("Some positions do not exist in this company"));
    }

    let outranking = position::Entity::find()
        .filter(position::Column::Id.is_in(body.lowers.iter().copied()))
        .filter(position::Column::Level.lte(current.level))
        .count(&db)
        .await?;
    if outranking > 0 {
        return Err(ApiError::bad_request(
            "Lower positions must have a lower level than this position",
        ));
    }

    position::Entity::update_many()
        .col_expr(position::Column::HigherId, Expr::value(pk))
        .filter(position::Column::Id.is_in(body.lowers.iter().copied()))
        .exec(&db)
        .await?;
    Ok(Json(position_tree(&db, current).await?))
}
