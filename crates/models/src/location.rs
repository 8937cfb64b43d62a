use sea_orm::{entity::prelude::*, DatabaseConnection, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "location")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub country: String,
    pub state: Option<String>,
    pub city: String,
    pub time_zone: String,
    pub address_line: Option<String>,
    pub street_address: String,
    pub zip: String,
    pub created_by: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub fn find_live() -> Select<Entity> {
    Entity::find().filter(Column::DeletedAt.is_null())
}

pub async fn find_live_by_id(db: &DatabaseConnection, id: Uuid) -> Result<Option<Model>, ModelError> {
    Ok(find_live().filter(Column::Id.eq(id)).one(db).await?)
}

pub async fn soft_delete(db: &DatabaseConnection, id: Uuid) -> Result<Model, ModelError> {
    let mut found: ActiveModel = find_live_by_id(db, id)
        .await?
        .ok_or_else(|| ModelError::NotFound("location".into()))?
        .into();
    let now = Utc::now();
    found.deleted_at = Set(Some(now.into()));
    found.updated_at = Set(now.into());
    Ok(found.update(db).await?)
}
