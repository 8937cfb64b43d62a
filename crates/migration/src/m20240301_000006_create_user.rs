//! Create `user` table with organization details (role, department, organization, location).
//!
//! Stores end-users; includes soft-delete timestamp. Password hashes live in `user_credentials`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(uuid(User::Id).primary_key())
                    .col(string_len(User::FirstName, 128))
                    .col(string_len_null(User::MiddleName, 128))
                    .col(string_len(User::LastName, 128))
                    .col(string_len(User::Email, 255))
                    .col(string_len(User::MobileNumber, 32))
                    .col(string_len(User::Gender, 32))
                    .col(boolean(User::Active).default(true))
                    .col(string_len_null(User::ProfilePic, 512))
                    .col(string_len_null(User::Designation, 128))
                    .col(uuid_null(User::RoleId))
                    .col(uuid_null(User::DepartmentId))
                    .col(uuid_null(User::OrganizationId))
                    .col(uuid_null(User::LocationId))
                    .col(uuid_null(User::ReportingManagerId))
                    .col(string_len(User::PasswordSetting, 32).default("auto-generate"))
                    .col(json_binary(User::Assets))
                    .col(timestamp_with_time_zone(User::CreatedAt))
                    .col(timestamp_with_time_zone(User::UpdatedAt))
                    .col(timestamp_with_time_zone_null(User::DeletedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_role")
                            .from(User::Table, User::RoleId)
                            .to(Role::Table, Role::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_department")
                            .from(User::Table, User::DepartmentId)
                            .to(Department::Table, Department::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_organization")
                            .from(User::Table, User::OrganizationId)
                            .to(Organization::Table, Organization::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_location")
                            .from(User::Table, User::LocationId)
                            .to(Location::Table, Location::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(User::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum User {
    Table,
    Id,
    FirstName,
    MiddleName,
    LastName,
    Email,
    MobileNumber,
    Gender,
    Active,
    ProfilePic,
    Designation,
    RoleId,
    DepartmentId,
    OrganizationId,
    LocationId,
    ReportingManagerId,
    PasswordSetting,
    Assets,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum Role { Table, Id }

#[derive(DeriveIden)]
enum Department { Table, Id }

#[derive(DeriveIden)]
enum Organization { Table, Id }

#[derive(DeriveIden)]
enum Location { Table, Id }
