//! Create `department` table with FK to `organization`.
//!
//! `head_of_department` references a user but carries no FK because `user` is created later
//! and itself references departments.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Department::Table)
                    .if_not_exists()
                    .col(uuid(Department::Id).primary_key())
                    .col(string_len(Department::Name, 128))
                    .col(uuid(Department::OrganizationId))
                    .col(uuid_null(Department::HeadOfDepartment))
                    .col(text_null(Department::Description))
                    .col(string_len(Department::Status, 32).default("active"))
                    .col(uuid_null(Department::CreatedBy))
                    .col(timestamp_with_time_zone(Department::CreatedAt))
                    .col(timestamp_with_time_zone(Department::UpdatedAt))
                    .col(timestamp_with_time_zone_null(Department::DeletedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_department_organization")
                            .from(Department::Table, Department::OrganizationId)
                            .to(Organization::Table, Organization::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Department::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Department {
    Table,
    Id,
    Name,
    OrganizationId,
    HeadOfDepartment,
    Description,
    Status,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum Organization { Table, Id }
