//! Audit trail entries for locations, groups and users.
use sea_orm::entity::prelude::*;
use uuid::Uuid;
use serde::{Deserialize, Serialize};

pub const ENTITY_LOCATION: &str = "location";
pub const ENTITY_GROUP: &str = "group";
pub const ENTITY_USER: &str = "user";

pub const ACTION_CREATE: &str = "CREATE";
pub const ACTION_UPDATE: &str = "UPDATE";
pub const ACTION_DELETE: &str = "DELETE";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activity")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub action: String,
    pub performed_by: Option<Uuid>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub old_data: Option<Json>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub new_data: Option<Json>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub changes: Option<Json>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
