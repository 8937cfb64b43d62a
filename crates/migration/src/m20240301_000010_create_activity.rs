//! Create `activity` audit table shared by locations, groups and users.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Activity::Table)
                    .if_not_exists()
                    .col(uuid(Activity::Id).primary_key())
                    .col(string_len(Activity::EntityType, 32))
                    .col(uuid(Activity::EntityId))
                    .col(string_len(Activity::Action, 16))
                    .col(uuid_null(Activity::PerformedBy))
                    .col(json_binary_null(Activity::OldData))
                    .col(json_binary_null(Activity::NewData))
                    .col(json_binary_null(Activity::Changes))
                    .col(string_len_null(Activity::IpAddress, 64))
                    .col(string_len_null(Activity::UserAgent, 512))
                    .col(timestamp_with_time_zone(Activity::CreatedAt))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Activity::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Activity {
    Table,
    Id,
    EntityType,
    EntityId,
    Action,
    PerformedBy,
    OldData,
    NewData,
    Changes,
    IpAddress,
    UserAgent,
    CreatedAt,
}
