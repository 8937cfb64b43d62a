//! Create `task` table with FK to `project`. `ref_id` is `<PROJECT_CODE>-<n>`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Task::Table)
                    .if_not_exists()
                    .col(uuid(Task::Id).primary_key())
                    .col(string_len(Task::Title, 255))
                    .col(string_len(Task::RefId, 64).unique_key())
                    .col(text_null(Task::Description))
                    .col(string_len(Task::Status, 16).default("TODO"))
                    .col(string_len(Task::Priority, 16).default("LOW"))
                    .col(timestamp_with_time_zone(Task::DueDate))
                    .col(uuid(Task::ProjectId))
                    .col(uuid_null(Task::CreatedBy))
                    .col(uuid_null(Task::UpdatedBy))
                    .col(boolean(Task::IsSubTask).default(false))
                    .col(timestamp_with_time_zone(Task::CreatedAt))
                    .col(timestamp_with_time_zone(Task::UpdatedAt))
                    .col(timestamp_with_time_zone_null(Task::CompletedAt))
                    .col(timestamp_with_time_zone_null(Task::DeletedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_project")
                            .from(Task::Table, Task::ProjectId)
                            .to(Project::Table, Project::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Task::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Task {
    Table,
    Id,
    Title,
    RefId,
    Description,
    Status,
    Priority,
    DueDate,
    ProjectId,
    CreatedBy,
    UpdatedBy,
    IsSubTask,
    CreatedAt,
    UpdatedAt,
    CompletedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum Project { Table, Id }
