//! Create `organization` table (tenant root).
//!
//! Email uniqueness among live rows is enforced by a partial index in the index migration.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Organization::Table)
                    .if_not_exists()
                    .col(uuid(Organization::Id).primary_key())
                    .col(string_len(Organization::OrganizationName, 255))
                    .col(string_len(Organization::Email, 255))
                    .col(string_len_null(Organization::ContactNumber, 64))
                    .col(text_null(Organization::Description))
                    .col(uuid_null(Organization::PrimaryAdmin))
                    .col(uuid_null(Organization::CreatedBy))
                    .col(timestamp_with_time_zone(Organization::CreatedAt))
                    .col(timestamp_with_time_zone(Organization::UpdatedAt))
                    .col(timestamp_with_time_zone_null(Organization::DeletedAt))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Organization::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Organization {
    Table,
    Id,
    OrganizationName,
    Email,
    ContactNumber,
    Description,
    PrimaryAdmin,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}
