//! Schema of the sample service

use sea_orm_migration::prelude::*;

use super::entities::{company, position, user};

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(CreateCompanyTable),
            Box::new(CreatePositionTable),
            Box::new(CreateUserTable),
        ]
    }
}

pub struct CreateCompanyTable;

impl MigrationName for CreateCompanyTable {
    fn name(&self) -> &'static str {
        "m20220101_000001_create_company_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateCompanyTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = Table::create()
            .table(company::Entity)
            .if_not_exists()
            .col(
                ColumnDef::new(company::Column::Id)
                    .integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new(company::Column::Name).string_len(32).not_null())
            .to_owned();

        manager.create_table(table).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(company::Entity).to_owned())
            .await
    }
}

pub struct CreatePositionTable;

impl MigrationName for CreatePositionTable {
    fn name(&self) -> &'static str {
        "m20220101_000002_create_position_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreatePositionTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = Table::create()
            .table(position::Entity)
            .if_not_exists()
            .col(
                ColumnDef::new(position::Column::Id)
                    .integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new(position::Column::Name).string_len(32).not_null())
            .col(ColumnDef::new(position::Column::Level).integer().not_null())
            .col(ColumnDef::new(position::Column::CompanyId).integer().not_null())
            .col(ColumnDef::new(position::Column::HigherId).integer().null())
            .foreign_key(
                ForeignKey::create()
                    .name("fk_position_company")
                    .from(position::Entity, position::Column::CompanyId)
                    .to(company::Entity, company::Column::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_position_higher")
                    .from(position::Entity, position::Column::HigherId)
                    .to(position::Entity, position::Column::Id)
                    .on_delete(ForeignKeyAction::SetNull),
            )
            .to_owned();

        manager.create_table(table).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(position::Entity).to_owned())
            .await
    }
}

pub struct CreateUserTable;

impl MigrationName for CreateUserTable {
    fn name(&self) -> &'static str {
        "m20220101_000003_create_user_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateUserTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = Table::create()
            .table(user::Entity)
            .if_not_exists()
            .col(
                ColumnDef::new(user::Column::Uid)
                    .string_len(10)
                    .not_null()
                    .primary_key(),
            )
            .col(ColumnDef::new(user::Column::UserNumber).integer().null())
            .col(ColumnDef::new(user::Column::Username).string_len(32).not_null())
            .col(ColumnDef::new(user::Column::Password).string_len(64).not_null())
            .col(ColumnDef::new(user::Column::Name).string_len(32).null())
            .col(ColumnDef::new(user::Column::FamilyName).string_len(32).null())
            .col(
                ColumnDef::new(user::Column::CreatedAt)
                    .timestamp_with_time_zone()
                    .not_null(),
            )
            .col(
                ColumnDef::new(user::Column::ModifiedAt)
                    .timestamp_with_time_zone()
                    .not_null(),
            )
            .col(ColumnDef::new(user::Column::CompanyId).integer().null())
            .col(ColumnDef::new(user::Column::PositionId).integer().null())
            .foreign_key(
                ForeignKey::create()
                    .name("fk_user_company")
                    .from(user::Entity, user::Column::CompanyId)
                    .to(company::Entity, company::Column::Id)
                    .on_delete(ForeignKeyAction::SetNull),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_user_position")
                    .from(user::Entity, user::Column::PositionId)
                    .to(position::Entity, position::Column::Id)
                    .on_delete(ForeignKeyAction::SetNull),
            )
            .to_owned();

        manager.create_table(table).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(user::Entity).to_owned())
            .await
    }
}
