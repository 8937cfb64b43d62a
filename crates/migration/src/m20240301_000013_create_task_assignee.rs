use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TaskAssignee::Table)
                    .if_not_exists()
                    .col(uuid(TaskAssignee::Id).primary_key())
                    .col(uuid(TaskAssignee::TaskId))
                    .col(uuid(TaskAssignee::UserId))
                    .col(timestamp_with_time_zone(TaskAssignee::AssignedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_assignee_task")
                            .from(TaskAssignee::Table, TaskAssignee::TaskId)
                            .to(Task::Table, Task::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_assignee_user")
                            .from(TaskAssignee::Table, TaskAssignee::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(TaskAssignee::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum TaskAssignee { Table, Id, TaskId, UserId, AssignedAt }

#[derive(DeriveIden)]
enum Task { Table, Id }

#[derive(DeriveIden)]
enum User { Table, Id }
