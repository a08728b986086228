use chrono::{DateTime, Utc};
use regex::Regex;
use sea_orm::{ActiveValue::Set, entity::prelude::*};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static CJK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\p{Han}").expect("valid regex"));

#[derive(Clone, Debug, Default, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "user_user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub uid: String,
    pub user_number: Option<i32>,
    pub username: String,
    /// SHA-256 hex digest, see [`hash_password`]
    pub password: String,
    pub name: Option<String>,
    pub family_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub company_id: Option<i32>,
    pub position_id: Option<i32>,
}

impl Model {
    /// Display name: CJK names read family name first, others given name
    /// first; users without either fall back to their username.
    #[must_use]
    pub fn full_name(&self) -> String {
        let name = self.name.as_deref().unwrap_or_default();
        let family_name = self.family_name.as_deref().unwrap_or_default();
        if name.is_empty() && family_name.is_empty() {
            return self.username.clone();
        }
        if CJK.is_match(name) || CJK.is_match(family_name) {
            format!("{family_name}{name}").trim().to_string()
        } else {
            format!("{name} {family_name}").trim().to_string()
        }
    }
}

/// Salted digest stored in the `password` column
#[must_use]
pub fn hash_password(uid: &str, password: &str) -> String {
    use sha2::{Digest, Sha256};

    let digest = Sha256::new()
        .chain_update(uid.as_bytes())
        .chain_update(b":")
        .chain_update(password.as_bytes())
        .finalize();
    format!("{digest:x}")
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::company::Entity",
        from = "Column::CompanyId",
        to = "super::company::Column::Id",
        on_delete = "SetNull"
    )]
    Company,
    #[sea_orm(
        belongs_to = "super::position::Entity",
        from = "Column::PositionId",
        to = "super::position::Column::Id",
        on_delete = "SetNull"
    )]
    Position,
}

impl Related<super::company::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Company.def()
    }
}

impl Related<super::position::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Position.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = Utc::now();
        if insert {
            self.created_at = Set(now);
        }
        self.modified_at = Set(now);
        Ok(self)
    }
}
