//! Persistence behind synthesized handlers.
//!
//! `EntityStore` is the object-safe seam between generated routes and the
//! database: records cross it as JSON objects keyed by column name, primary
//! keys as JSON scalars. `SeaOrmStore` implements it for any Sea-ORM entity
//! whose model round-trips through serde and has a `Default`.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, DatabaseConnection, DbErr, EntityName, EntityTrait,
    IdenStatic, IntoActiveModel, Iterable, ModelTrait, PrimaryKeyToColumn, PrimaryKeyTrait,
    QueryOrder,
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::marker::PhantomData;

use crate::schema::Fields;

type PkValue<E> = <<E as EntityTrait>::PrimaryKey as PrimaryKeyTrait>::ValueType;

#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Table the store reads and writes
    fn table(&self) -> &str;

    /// Fetch one record; `DbErr::RecordNotFound` when absent.
    async fn get(&self, db: &DatabaseConnection, pk: &Value) -> Result<Value, DbErr>;

    /// Every record, in primary key order
    async fn all(&self, db: &DatabaseConnection) -> Result<Vec<Value>, DbErr>;

    /// Insert a record built from `fields`; unknown keys are ignored and
    /// missing columns are left to the database.
    async fn create(&self, db: &DatabaseConnection, fields: Fields) -> Result<Value, DbErr>;

    /// Overwrite the columns named in `fields`, returning the number of rows
    /// changed. Primary key columns are never written.
    async fn update(&self, db: &DatabaseConnection, pk: &Value, fields: Fields)
    -> Result<u64, DbErr>;

    /// Delete by primary key, returning the number of rows removed
    async fn delete(&self, db: &DatabaseConnection, pk: &Value) -> Result<u64, DbErr>;
}

pub struct SeaOrmStore<E, A> {
    table: String,
    _entity: PhantomData<fn() -> (E, A)>,
}

impl<E, A> SeaOrmStore<E, A>
where
    E: EntityTrait,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: E::default().table_name().to_string(),
            _entity: PhantomData,
        }
    }
}

impl<E, A> Default for SeaOrmStore<E, A>
where
    E: EntityTrait,
{
    fn default() -> Self {
        Self::new()
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, DbErr> {
    serde_json::to_value(value).map_err(|err| DbErr::Json(err.to_string()))
}

fn from_json<T: DeserializeOwned>(value: Value) -> Result<T, DbErr> {
    serde_json::from_value(value).map_err(|err| DbErr::Json(err.to_string()))
}

fn parse_pk<E>(pk: &Value) -> Result<PkValue<E>, DbErr>
where
    E: EntityTrait,
    PkValue<E>: DeserializeOwned,
{
    serde_json::from_value(pk.clone())
        .map_err(|err| DbErr::Type(format!("invalid primary key {pk}: {err}")))
}

fn is_primary_key<E: EntityTrait>(column: E::Column) -> bool {
    E::PrimaryKey::iter().any(|key| key.into_column().as_str() == column.as_str())
}

/// Copy every entry of `fields` that names a column into `record`, returning
/// the columns that were written.
fn merge_columns<E: EntityTrait>(
    record: &mut Value,
    fields: &Fields,
    include_primary_key: bool,
) -> Vec<E::Column> {
    let Some(object) = record.as_object_mut() else {
        return Vec::new();
    };
    E::Column::iter()
        .filter(|column| include_primary_key || !is_primary_key::<E>(*column))
        .filter_map(|column| {
            let value = fields.get(column.as_str())?;
            object.insert(column.as_str().to_string(), value.clone());
            Some(column)
        })
        .collect()
}

#[async_trait]
impl<E, A> EntityStore for SeaOrmStore<E, A>
where
    E: EntityTrait,
    E::Model: Serialize + DeserializeOwned + Default + IntoActiveModel<A> + Sync,
    A: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + Sync,
    PkValue<E>: DeserializeOwned + Send,
{
    fn table(&self) -> &str {
        &self.table
    }

    async fn get(&self, db: &DatabaseConnection, pk: &Value) -> Result<Value, DbErr> {
        let model = E::find_by_id(parse_pk::<E>(pk)?)
            .one(db)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("{} not found", self.table)))?;
        to_json(&model)
    }

    async fn all(&self, db: &DatabaseConnection) -> Result<Vec<Value>, DbErr> {
        let mut query = E::find();
        for key in E::PrimaryKey::iter() {
            query = query.order_by_asc(key.into_column());
        }
        query.all(db).await?.iter().map(to_json).collect()
    }

    async fn create(&self, db: &DatabaseConnection, fields: Fields) -> Result<Value, DbErr> {
        let mut record = to_json(&E::Model::default())?;
        let written = merge_columns::<E>(&mut record, &fields, true);
        let model: E::Model = from_json(record)?;

        let mut active = A::new();
        for column in written {
            active.set(column, model.get(column));
        }
        to_json(&active.insert(db).await?)
    }

    async fn update(
        &self,
        db: &DatabaseConnection,
        pk: &Value,
        fields: Fields,
    ) -> Result<u64, DbErr> {
        let Some(existing) = E::find_by_id(parse_pk::<E>(pk)?).one(db).await? else {
            return Ok(0);
        };

        let mut record = to_json(&existing)?;
        let written = merge_columns::<E>(&mut record, &fields, false);
        let patched: E::Model = from_json(record)?;

        // `before_save` runs on every update, including one that writes no column.
        let mut active = existing.into_active_model();
        for column in written {
            active.set(column, patched.get(column));
        }
        active.update(db).await?;
        Ok(1)
    }

    async fn delete(&self, db: &DatabaseConnection, pk: &Value) -> Result<u64, DbErr> {
        let result = E::delete_by_id(parse_pk::<E>(pk)?).exec(db).await?;
        Ok(result.rows_affected)
    }
}
