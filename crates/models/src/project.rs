use sea_orm::{entity::prelude::*, sea_query::Expr, ConnectionTrait, DatabaseConnection};
use uuid::Uuid;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::task;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "project")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    #[sea_orm(unique)]
    pub slug: String,
    #[sea_orm(unique)]
    pub code: String,
    pub active: bool,
    pub logo: Option<String>,
    pub timezone: Option<String>,
    /// Last task number handed out; only ever incremented.
    #[serde(skip)]
    pub task_seq: i64,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Tasks,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Tasks => Entity::has_many(task::Entity).into(),
        }
    }
}

impl Related<task::Entity> for Entity {
    fn to() -> RelationDef { Relation::Tasks.def() }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn find_live() -> Select<Entity> {
    Entity::find().filter(Column::DeletedAt.is_null())
}

pub async fn find_live_by_id(db: &DatabaseConnection, id: Uuid) -> Result<Option<Model>, ModelError> {
    Ok(find_live().filter(Column::Id.eq(id)).one(db).await?)
}

/// Bump the task counter and return the updated project, or `None` if it does not exist.
/// The row stays locked until the surrounding transaction ends, so concurrent callers never
/// share a number.
pub async fn next_task_seq<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Model>, ModelError> {
    let rows = Entity::update_many()
        .col_expr(Column::TaskSeq, Expr::col(Column::TaskSeq).add(1))
        .filter(Column::Id.eq(id))
        .exec_with_returning(db)
        .await?;
    Ok(rows.into_iter().next())
}

/// `"Mobile App Revamp!"` -> `"mobile-app-revamp"`
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut dash = false;
    for ch in title.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            dash = false;
        } else if !dash && !slug.is_empty() {
            slug.push('-');
            dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Mobile App -- Revamp! "), "mobile-app-revamp");
        assert_eq!(slugify("Q3/Q4 Roadmap"), "q3-q4-roadmap");
        assert_eq!(slugify("!!!"), "");
    }
}
