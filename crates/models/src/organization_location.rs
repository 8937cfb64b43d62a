use sea_orm::{entity::prelude::*, ConnectionTrait, DatabaseConnection, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::{location, organization};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "organization_location")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub location_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Organization,
    Location,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Organization => Entity::belongs_to(organization::Entity)
                .from(Column::OrganizationId)
                .to(organization::Column::Id)
                .into(),
            Relation::Location => Entity::belongs_to(location::Entity)
                .from(Column::LocationId)
                .to(location::Column::Id)
                .into(),
        }
    }
}

impl Related<organization::Entity> for Entity {
    fn to() -> RelationDef { Relation::Organization.def() }
}

impl Related<location::Entity> for Entity {
    fn to() -> RelationDef { Relation::Location.def() }
}

impl ActiveModelBehavior for ActiveModel {}

/// Replace the location links of an organization with `location_ids`.
pub async fn replace_for_organization<C>(db: &C, organization_id: Uuid, location_ids: &[Uuid]) -> Result<(), ModelError>
where
    C: ConnectionTrait,
{
    Entity::delete_many()
        .filter(Column::OrganizationId.eq(organization_id))
        .exec(db)
        .await?;
    let mut seen: Vec<Uuid> = Vec::with_capacity(location_ids.len());
    for id in location_ids {
        if seen.contains(id) {
            continue;
        }
        seen.push(*id);
        ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(organization_id),
            location_id: Set(*id),
            created_at: Set(Utc::now().into()),
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

pub async fn location_ids_for(db: &DatabaseConnection, organization_id: Uuid) -> Result<Vec<Uuid>, ModelError> {
    let links = Entity::find()
        .filter(Column::OrganizationId.eq(organization_id))
        .all(db)
        .await?;
    Ok(links.into_iter().map(|l| l.location_id).collect())
}
