use sea_orm::{entity::prelude::*, DatabaseConnection};
use uuid::Uuid;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::{department, group_member};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "group")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub department_id: Uuid,
    pub manager_id: Uuid,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Department,
    Members,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Department => Entity::belongs_to(department::Entity)
                .from(Column::DepartmentId)
                .to(department::Column::Id)
                .into(),
            Relation::Members => Entity::has_many(group_member::Entity).into(),
        }
    }
}

impl Related<group_member::Entity> for Entity {
    fn to() -> RelationDef { Relation::Members.def() }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn find_live() -> Select<Entity> {
    Entity::find().filter(Column::DeletedAt.is_null())
}

pub async fn find_live_by_id(db: &DatabaseConnection, id: Uuid) -> Result<Option<Model>, ModelError> {
    Ok(find_live().filter(Column::Id.eq(id)).one(db).await?)
}
