use sea_orm::{entity::prelude::*, DatabaseConnection, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::organization_location;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "organization")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_name: String,
    pub email: String,
    pub contact_number: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub primary_admin: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Locations,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Locations => Entity::has_many(organization_location::Entity).into(),
        }
    }
}

impl Related<organization_location::Entity> for Entity {
    fn to() -> RelationDef { Relation::Locations.def() }
}

impl ActiveModelBehavior for ActiveModel {}

/// Organizations that have not been soft-deleted.
pub fn find_live() -> Select<Entity> {
    Entity::find().filter(Column::DeletedAt.is_null())
}

pub async fn find_live_by_id(db: &DatabaseConnection, id: Uuid) -> Result<Option<Model>, ModelError> {
    Ok(find_live().filter(Column::Id.eq(id)).one(db).await?)
}

pub async fn soft_delete(db: &DatabaseConnection, id: Uuid) -> Result<(), ModelError> {
    let mut found: ActiveModel = find_live_by_id(db, id)
        .await?
        .ok_or_else(|| ModelError::NotFound("organization".into()))?
        .into();
    let now = Utc::now();
    found.deleted_at = Set(Some(now.into()));
    found.updated_at = Set(now.into());
    found.update(db).await?;
    Ok(())
}
