//! Batch lookups used to populate references in list and detail views.

use std::collections::HashMap;

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::Serialize;
use uuid::Uuid;

use models::{department, location, organization, role, user};

use crate::errors::ServiceError;

/// Minimal user reference (creator, manager, head of department).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<&user::Model> for UserSummary {
    fn from(u: &user::Model) -> Self {
        Self { id: u.id, first_name: u.first_name.clone(), last_name: u.last_name.clone(), email: u.email.clone() }
    }
}

fn unique(ids: impl IntoIterator<Item = Uuid>) -> Vec<Uuid> {
    let mut out: Vec<Uuid> = Vec::new();
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

/// Live users keyed by id.
pub async fn users(db: &DatabaseConnection, ids: impl IntoIterator<Item = Uuid>) -> Result<HashMap<Uuid, user::Model>, ServiceError> {
    let ids = unique(ids);
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = user::find_live().filter(user::Column::Id.is_in(ids)).all(db).await?;
    Ok(rows.into_iter().map(|u| (u.id, u)).collect())
}

pub async fn user_summaries(db: &DatabaseConnection, ids: impl IntoIterator<Item = Uuid>) -> Result<HashMap<Uuid, UserSummary>, ServiceError> {
    Ok(users(db, ids).await?.iter().map(|(id, u)| (*id, UserSummary::from(u))).collect())
}

pub async fn organizations(db: &DatabaseConnection, ids: impl IntoIterator<Item = Uuid>) -> Result<HashMap<Uuid, organization::Model>, ServiceError> {
    let ids = unique(ids);
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = organization::find_live().filter(organization::Column::Id.is_in(ids)).all(db).await?;
    Ok(rows.into_iter().map(|o| (o.id, o)).collect())
}

pub async fn departments(db: &DatabaseConnection, ids: impl IntoIterator<Item = Uuid>) -> Result<HashMap<Uuid, department::Model>, ServiceError> {
    let ids = unique(ids);
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = department::find_live().filter(department::Column::Id.is_in(ids)).all(db).await?;
    Ok(rows.into_iter().map(|d| (d.id, d)).collect())
}

pub async fn roles(db: &DatabaseConnection, ids: impl IntoIterator<Item = Uuid>) -> Result<HashMap<Uuid, role::Model>, ServiceError> {
    let ids = unique(ids);
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = role::Entity::find().filter(role::Column::Id.is_in(ids)).all(db).await?;
    Ok(rows.into_iter().map(|r| (r.id, r)).collect())
}

pub async fn locations(db: &DatabaseConnection, ids: impl IntoIterator<Item = Uuid>) -> Result<HashMap<Uuid, location::Model>, ServiceError> {
    let ids = unique(ids);
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = location::find_live().filter(location::Column::Id.is_in(ids)).all(db).await?;
    Ok(rows.into_iter().map(|l| (l.id, l)).collect())
}
