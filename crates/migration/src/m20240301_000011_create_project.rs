//! Create `project` table; slug and code are globally unique.
//! `task_seq` is the per-project counter behind task refIds.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Project::Table)
                    .if_not_exists()
                    .col(uuid(Project::Id).primary_key())
                    .col(string_len(Project::Title, 255))
                    .col(text_null(Project::Description))
                    .col(string_len(Project::Slug, 255).unique_key())
                    .col(string_len(Project::Code, 16).unique_key())
                    .col(boolean(Project::Active).default(true))
                    .col(string_len_null(Project::Logo, 512))
                    .col(string_len_null(Project::Timezone, 64))
                    .col(big_integer(Project::TaskSeq).default(0))
                    .col(uuid_null(Project::CreatedBy))
                    .col(uuid_null(Project::UpdatedBy))
                    .col(timestamp_with_time_zone(Project::CreatedAt))
                    .col(timestamp_with_time_zone(Project::UpdatedAt))
                    .col(timestamp_with_time_zone_null(Project::DeletedAt))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Project::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Project {
    Table,
    Id,
    Title,
    Description,
    Slug,
    Code,
    Active,
    Logo,
    Timezone,
    TaskSeq,
    CreatedBy,
    UpdatedBy,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}
