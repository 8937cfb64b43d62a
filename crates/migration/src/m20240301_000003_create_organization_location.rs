//! Create `organization_location` link table (organization has many locations).
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OrganizationLocation::Table)
                    .if_not_exists()
                    .col(uuid(OrganizationLocation::Id).primary_key())
                    .col(uuid(OrganizationLocation::OrganizationId))
                    .col(uuid(OrganizationLocation::LocationId))
                    .col(timestamp_with_time_zone(OrganizationLocation::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_org_location_org")
                            .from(OrganizationLocation::Table, OrganizationLocation::OrganizationId)
                            .to(Organization::Table, Organization::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_org_location_location")
                            .from(OrganizationLocation::Table, OrganizationLocation::LocationId)
                            .to(Location::Table, Location::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(OrganizationLocation::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum OrganizationLocation { Table, Id, OrganizationId, LocationId, CreatedAt }

#[derive(DeriveIden)]
enum Organization { Table, Id }

#[derive(DeriveIden)]
enum Location { Table, Id }
