use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Highest and lowest position level; 1 is the top of a company.
pub const LEVELS: std::ops::RangeInclusive<i32> = 1..=7;

#[derive(Clone, Debug, Default, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "user_position")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub level: i32,
    pub company_id: i32,
    pub higher_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::company::Entity",
        from = "Column::CompanyId",
        to = "super::company::Column::Id",
        on_delete = "Cascade"
    )]
    Company,
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::HigherId",
        to = "Column::Id",
        on_delete = "SetNull"
    )]
    Higher,
    #[sea_orm(has_many = "super::user::Entity")]
    Users,
}

impl Related<super::company::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Company.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
