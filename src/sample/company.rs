//! Companies: standard operations synthesized from the view set declaration,
//! plus two hand-written routes.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use std::collections::{BTreeSet, HashSet};

use super::{
    AppState,
    entities::{company, position, user},
    schemas::{
        CompanyAddUser, CompanyCreate, CompanyIncludeUsers, CompanyQuery, CompanySchema,
        CompanyUpdate, PositionBrief, UserIncludePosition,
    },
};
use crate::{
    ApiError,
    schema::SchemaRef,
    viewset::{Action, Transponder, ViewSet, Views},
};

pub fn viewset() -> ViewSet<AppState> {
    ViewSet::new("CompanyViewSet")
        .model::<company::Entity, company::ActiveModel>()
        .schema::<CompanySchema>()
        .pk::<i32>("id")
        .page_size(10)
        .views(
            Views::new()
                .all()
                .create::<CompanyCreate>()
                .get()
                .update::<CompanyUpdate>()
                .delete(),
        )
        .action(
            Action::get(
                "query_company_include_users",
                "/query_company_include_users",
                query_company_include_users,
            )
            .description("Query companies with their users, optionally a single company")
            .response_list::<CompanyIncludeUsers>(),
        )
        .action(
            Action::patch("add_users", "/{pk}/add_users", add_users)
                .description("Assign users and their positions to a company")
                .request_schema(SchemaRef::list_of::<CompanyAddUser>())
                .response::<CompanySchema>()
                .not_found(),
        )
}

async fn query_company_include_users(
    State(db): State<DatabaseConnection>,
    Query(query): Query<CompanyQuery>,
) -> Result<Json<Vec<CompanyIncludeUsers>>, ApiError> {
    let mut companies = company::Entity::find().order_by_asc(company::Column::Id);
    if let Some(id) = query.company_id {
        companies = companies.filter(company::Column::Id.eq(id));
    }

    let mut result = Vec::new();
    for company in companies.all(&db).await? {
        let members = user::Entity::find()
            .filter(user::Column::CompanyId.eq(company.id))
            .order_by_asc(user::Column::Uid)
            .find_also_related(position::Entity)
            .all(&db)
            .await?;
        result.push(CompanyIncludeUsers {
            id: company.id,
            name: company.name,
            users: members
                .into_iter()
                .map(|(member, position)| {
                    UserIncludePosition::new(member, position.map(PositionBrief::from))
                })
                .collect(),
        });
    }
    Ok(Json(result))
}

async fn add_users(
    view: Transponder,
    State(db): State<DatabaseConnection>,
    Path(pk): Path<i32>,
    Json(users): Json<Vec<CompanyAddUser>>,
) -> Result<Json<CompanySchema>, ApiError> {
    let company = company::Entity::find_by_id(pk)
        .one(&db)
        .await?
        .ok_or_else(|| view.not_found(&pk.to_string()))?;

    let mut uids = HashSet::new();
    for entry in &users {
        if !uids.insert(entry.uid.clone()) {
            return Err(ApiError::bad_request(format!("Duplicate user uid '{}'", entry.uid)));
        }
    }

    let positions: BTreeSet<i32> = users.iter().map(|entry| entry.position_id).collect();
    let found = position::Entity::find()
        .filter(position::Column::Id.is_in(positions.iter().copied()))
        .filter(position::Column::CompanyId.eq(pk))
        .count(&db)
        .await?;
    if found != positions.len() as u64 {
        return Err(ApiError::bad_request("Some positions do not exist in this company"));
    }

    let found = user::Entity::find()
        .filter(user::Column::Uid.is_in(uids.iter().cloned()))
        .count(&db)
        .await?;
    if found != uids.len() as u64 {
        return Err(ApiError::bad_request("Some users do not exist"));
    }

    let assigned = uids.len();
    let txn = db.begin().await?;
    for entry in users {
        if let Some(member) = user::Entity::find_by_id(entry.uid).one(&txn).await? {
            let mut member = member.into_active_model();
            member.company_id = Set(Some(pk));
            member.position_id = Set(Some(entry.position_id));
            member.update(&txn).await?;
        }
    }
    txn.commit().await?;

    tracing::info!(company = pk, users = assigned, "assigned users to company");
    Ok(Json(company.into()))
}
