use sea_orm::{entity::prelude::*, ConnectionTrait, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::{group, user};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "group_member")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Group,
    User,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Group => Entity::belongs_to(group::Entity).from(Column::GroupId).to(group::Column::Id).into(),
            Relation::User => Entity::belongs_to(user::Entity).from(Column::UserId).to(user::Column::Id).into(),
        }
    }
}

impl Related<group::Entity> for Entity {
    fn to() -> RelationDef { Relation::Group.def() }
}

impl ActiveModelBehavior for ActiveModel {}

/// Replace the member list of a group, keeping the first occurrence of duplicates.
pub async fn replace_for_group<C>(db: &C, group_id: Uuid, user_ids: &[Uuid]) -> Result<(), ModelError>
where
    C: ConnectionTrait,
{
    Entity::delete_many().filter(Column::GroupId.eq(group_id)).exec(db).await?;
    let mut seen: Vec<Uuid> = Vec::with_capacity(user_ids.len());
    for id in user_ids {
        if seen.contains(id) {
            continue;
        }
        seen.push(*id);
        ActiveModel {
            id: Set(Uuid::new_v4()),
            group_id: Set(group_id),
            user_id: Set(*id),
            created_at: Set(Utc::now().into()),
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

pub async fn member_ids<C>(db: &C, group_id: Uuid) -> Result<Vec<Uuid>, ModelError>
where
    C: ConnectionTrait,
{
    let rows = Entity::find().filter(Column::GroupId.eq(group_id)).all(db).await?;
    Ok(rows.into_iter().map(|m| m.user_id).collect())
}
