use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Partial and expression indexes sea-query cannot express; live rows only.
const UNIQUE_LIVE_INDEXES: &[(&str, &str)] = &[
    (
        "uniq_organization_email_live",
        r#"CREATE UNIQUE INDEX IF NOT EXISTS uniq_organization_email_live ON "organization" (email) WHERE deleted_at IS NULL"#,
    ),
    (
        "uniq_user_email_live",
        r#"CREATE UNIQUE INDEX IF NOT EXISTS uniq_user_email_live ON "user" (email) WHERE deleted_at IS NULL"#,
    ),
    (
        "uniq_department_org_name_live",
        r#"CREATE UNIQUE INDEX IF NOT EXISTS uniq_department_org_name_live ON "department" (organization_id, lower(name)) WHERE deleted_at IS NULL"#,
    ),
    (
        "uniq_group_name_live",
        r#"CREATE UNIQUE INDEX IF NOT EXISTS uniq_group_name_live ON "group" (name) WHERE deleted_at IS NULL"#,
    ),
    (
        "uniq_role_name_ci",
        r#"CREATE UNIQUE INDEX IF NOT EXISTS uniq_role_name_ci ON "role" (lower(name))"#,
    ),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();
        for (_, sql) in UNIQUE_LIVE_INDEXES {
            conn.execute_unprepared(sql).await?;
        }

        // Users: lookups by organization details
        manager
            .create_index(
                Index::create()
                    .name("idx_user_organization")
                    .table(User::Table)
                    .col(User::OrganizationId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_user_department")
                    .table(User::Table)
                    .col(User::DepartmentId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_user_role")
                    .table(User::Table)
                    .col(User::RoleId)
                    .to_owned(),
            )
            .await?;

        // Links: composite unique pairs
        manager
            .create_index(
                Index::create()
                    .name("uniq_org_location_pair")
                    .table(OrganizationLocation::Table)
                    .col(OrganizationLocation::OrganizationId)
                    .col(OrganizationLocation::LocationId)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("uniq_group_member_pair")
                    .table(GroupMember::Table)
                    .col(GroupMember::GroupId)
                    .col(GroupMember::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("uniq_task_assignee_pair")
                    .table(TaskAssignee::Table)
                    .col(TaskAssignee::TaskId)
                    .col(TaskAssignee::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Activity: history per entity, newest first
        manager
            .create_index(
                Index::create()
                    .name("idx_activity_entity")
                    .table(Activity::Table)
                    .col(Activity::EntityType)
                    .col(Activity::EntityId)
                    .col(Activity::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Tasks: by project and status
        manager
            .create_index(
                Index::create()
                    .name("idx_task_project_status")
                    .table(Task::Table)
                    .col(Task::ProjectId)
                    .col(Task::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();
        for (name, _) in UNIQUE_LIVE_INDEXES {
            conn.execute_unprepared(&format!("DROP INDEX IF EXISTS {}", name)).await?;
        }
        manager
            .drop_index(Index::drop().name("idx_user_organization").table(User::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_user_department").table(User::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_user_role").table(User::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("uniq_org_location_pair").table(OrganizationLocation::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("uniq_group_member_pair").table(GroupMember::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("uniq_task_assignee_pair").table(TaskAssignee::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_activity_entity").table(Activity::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_task_project_status").table(Task::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum User { Table, OrganizationId, DepartmentId, RoleId }

#[derive(DeriveIden)]
enum OrganizationLocation { Table, OrganizationId, LocationId }

#[derive(DeriveIden)]
enum GroupMember { Table, GroupId, UserId }

#[derive(DeriveIden)]
enum TaskAssignee { Table, TaskId, UserId }

#[derive(DeriveIden)]
enum Activity { Table, EntityType, EntityId, CreatedAt }

#[derive(DeriveIden)]
enum Task { Table, ProjectId, Status }
