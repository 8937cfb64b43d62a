//! Create `group` table: a named team inside a department, led by a manager.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Group::Table)
                    .if_not_exists()
                    .col(uuid(Group::Id).primary_key())
                    .col(string_len(Group::Name, 128))
                    .col(uuid(Group::DepartmentId))
                    .col(uuid(Group::ManagerId))
                    .col(text_null(Group::Description))
                    .col(uuid_null(Group::CreatedBy))
                    .col(timestamp_with_time_zone(Group::CreatedAt))
                    .col(timestamp_with_time_zone(Group::UpdatedAt))
                    .col(timestamp_with_time_zone_null(Group::DeletedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_department")
                            .from(Group::Table, Group::DepartmentId)
                            .to(Department::Table, Department::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_manager")
                            .from(Group::Table, Group::ManagerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Group::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Group {
    Table,
    Id,
    Name,
    DepartmentId,
    ManagerId,
    Description,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum Department { Table, Id }

#[derive(DeriveIden)]
enum User { Table, Id }
