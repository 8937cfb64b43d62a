//! Migrator registering entity-specific migrations in dependency order.
//! Indexes are applied last.
pub use sea_orm_migration::prelude::*;

mod m20240301_000001_create_organization;
mod m20240301_000002_create_location;
mod m20240301_000003_create_organization_location;
mod m20240301_000004_create_role;
mod m20240301_000005_create_department;
mod m20240301_000006_create_user;
mod m20240301_000007_create_user_credentials;
mod m20240301_000008_create_group;
mod m20240301_000009_create_group_member;
mod m20240301_000010_create_activity;
mod m20240301_000011_create_project;
mod m20240301_000012_create_task;
mod m20240301_000013_create_task_assignee;
mod m20240301_000099_add_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_organization::Migration),
            Box::new(m20240301_000002_create_location::Migration),
            Box::new(m20240301_000003_create_organization_location::Migration),
            Box::new(m20240301_000004_create_role::Migration),
            Box::new(m20240301_000005_create_department::Migration),
            Box::new(m20240301_000006_create_user::Migration),
            Box::new(m20240301_000007_create_user_credentials::Migration),
            Box::new(m20240301_000008_create_group::Migration),
            Box::new(m20240301_000009_create_group_member::Migration),
            Box::new(m20240301_000010_create_activity::Migration),
            Box::new(m20240301_000011_create_project::Migration),
            Box::new(m20240301_000012_create_task::Migration),
            Box::new(m20240301_000013_create_task_assignee::Migration),
            // Indexes should always be applied last
            Box::new(m20240301_000099_add_indexes::Migration),
        ]
    }
}
