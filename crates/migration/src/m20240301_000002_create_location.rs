//! Create `location` table holding postal addresses.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Location::Table)
                    .if_not_exists()
                    .col(uuid(Location::Id).primary_key())
                    .col(string_len(Location::Country, 128))
                    .col(string_len_null(Location::State, 128))
                    .col(string_len(Location::City, 128))
                    .col(string_len(Location::TimeZone, 64))
                    .col(string_len_null(Location::AddressLine, 255))
                    .col(string_len(Location::StreetAddress, 255))
                    .col(string_len(Location::Zip, 32))
                    .col(uuid_null(Location::CreatedBy))
                    .col(timestamp_with_time_zone(Location::CreatedAt))
                    .col(timestamp_with_time_zone(Location::UpdatedAt))
                    .col(timestamp_with_time_zone_null(Location::DeletedAt))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Location::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Location {
    Table,
    Id,
    Country,
    State,
    City,
    TimeZone,
    AddressLine,
    StreetAddress,
    Zip,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}
