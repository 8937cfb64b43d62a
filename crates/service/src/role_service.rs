use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, instrument};
use uuid::Uuid;

use common::types::Paginated;
use common::utils::csv::generate_csv;
use models::role::{self, RolePermissions, PERMISSIONS, SECTIONS};
use models::user;

use crate::errors::ServiceError;
use crate::pagination::{like_pattern, Pagination};
use crate::refs;
use crate::validation::{ilike, lower_eq, FieldErrors};

const NAME_MIN: usize = 3;
pub const SECTION_ALL: &str = "all";

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<Value>,
}

/// `{id, firstName, lastName}` of whoever created the role.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatorRef {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleView {
    #[serde(flatten)]
    pub role: role::Model,
    pub created_by_user: Option<CreatorRef>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleListItem {
    #[serde(flatten)]
    pub role: role::Model,
    pub user_count: u64,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleExportInput {
    pub search_string: Option<String>,
    pub permission_section: Option<String>,
}

/// Every section must be present and hold only known permission values.
fn parse_permissions(raw: &Value, errs: &mut FieldErrors) -> Option<RolePermissions> {
    let Some(obj) = raw.as_object() else {
        errs.add("permissions", "Permissions must be an object");
        return None;
    };
    for section in SECTIONS {
        match obj.get(section).and_then(Value::as_array) {
            None => errs.add(&format!("permissions.{}", section), format!("Permissions for '{}' are required", section)),
            Some(values) => {
                let ok = values.iter().all(|v| v.as_str().map(|s| PERMISSIONS.contains(&s)).unwrap_or(false));
                errs.check(ok, &format!("permissions.{}", section), format!("Allowed values: {}", PERMISSIONS.join(", ")));
            }
        }
    }
    if !errs.is_empty() {
        return None;
    }
    serde_json::from_value::<RolePermissions>(raw.clone()).ok()
}

fn check_input(input: &RoleInput, creating: bool) -> Result<(Option<String>, Option<RolePermissions>), ServiceError> {
    let mut errs = FieldErrors::new();
    let name = input.name.as_deref().map(str::trim).map(String::from);
    match &name {
        Some(n) => errs.check(n.chars().count() >= NAME_MIN, "name", "Role name must be at least 3 characters"),
        None if creating => errs.add("name", "Role name is required"),
        None => {}
    }
    let permissions = match &input.permissions {
        Some(raw) => parse_permissions(raw, &mut errs),
        None => {
            if creating {
                errs.add("permissions", "Permissions are required");
            }
            None
        }
    };
    errs.finish("Role details provided do not meet the required validation criteria")?;
    Ok((name, permissions))
}

/// `None` means no section filter.
pub fn parse_section(raw: Option<&str>) -> Result<Option<&'static str>, ServiceError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) if s.eq_ignore_ascii_case(SECTION_ALL) => Ok(None),
        Some(s) => SECTIONS
            .iter()
            .copied()
            .find(|known| known.eq_ignore_ascii_case(s))
            .map(Some)
            .ok_or_else(|| ServiceError::bad_request("Invalid permission section")),
    }
}

#[instrument(skip(db, input))]
pub async fn create(db: &DatabaseConnection, caller: Uuid, input: RoleInput) -> Result<role::Model, ServiceError> {
    let (name, permissions) = check_input(&input, true)?;
    let name = name.unwrap_or_default();
    ensure_name_free(db, &name, None).await?;
    let now = Utc::now();
    let created = role::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        description: Set(input.description),
        permissions: Set(serde_json::to_value(permissions.unwrap_or_default()).unwrap_or(Value::Null)),
        created_by: Set(Some(caller)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await?;
    info!(role_id = %created.id, "role_created");
    Ok(created)
}

#[instrument(skip(db, input))]
pub async fn update(db: &DatabaseConnection, id: Uuid, input: RoleInput) -> Result<role::Model, ServiceError> {
    let (name, permissions) = check_input(&input, false)?;
    let existing = role::find_by_id(db, id).await?.ok_or_else(|| ServiceError::not_found("Role"))?;
    if let Some(name) = &name {
        ensure_name_free(db, name, Some(id)).await?;
    }
    let mut am: role::ActiveModel = existing.into();
    if let Some(name) = name {
        am.name = Set(name);
    }
    if let Some(description) = input.description {
        am.description = Set(Some(description));
    }
    if let Some(p) = permissions {
        am.permissions = Set(serde_json::to_value(p).unwrap_or(Value::Null));
    }
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(role_id = %id, "role_updated");
    Ok(updated)
}

/// Hard delete; users holding the role lose the reference.
#[instrument(skip(db))]
pub async fn delete(db: &DatabaseConnection, id: Uuid) -> Result<(), ServiceError> {
    if role::find_by_id(db, id).await?.is_none() {
        return Err(ServiceError::not_found("Role"));
    }
    let txn = db.begin().await?;
    user::Entity::update_many()
        .col_expr(user::Column::RoleId, Expr::value(Option::<Uuid>::None))
        .filter(user::Column::RoleId.eq(id))
        .exec(&txn)
        .await?;
    role::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;
    info!(role_id = %id, "role_deleted");
    Ok(())
}

#[instrument(skip(db))]
pub async fn list_all(db: &DatabaseConnection) -> Result<Vec<RoleView>, ServiceError> {
    let rows = role::Entity::find().order_by_desc(role::Column::CreatedAt).all(db).await?;
    with_creators(db, rows).await
}

#[instrument(skip(db))]
pub async fn get(db: &DatabaseConnection, id: Uuid) -> Result<RoleView, ServiceError> {
    let found = role::find_by_id(db, id).await?.ok_or_else(|| ServiceError::not_found("Role"))?;
    let mut views = with_creators(db, vec![found]).await?;
    views.pop().ok_or_else(|| ServiceError::not_found("Role"))
}

/// Search on name; `section` keeps roles whose section is non-empty.
#[instrument(skip(db))]
pub async fn list(db: &DatabaseConnection, page: &Pagination, section: Option<&str>) -> Result<Paginated<RoleListItem>, ServiceError> {
    let section = parse_section(section)?;
    let select = filtered(page.like_pattern(), section);
    let result = page.fetch(db, select).await?;
    let counts = user_counts(db, result.records.iter().map(|r| r.id).collect()).await?;
    Ok(result.map(|r| RoleListItem { user_count: counts.get(&r.id).copied().unwrap_or(0), role: r }))
}

/// CSV with `Role Name`, `Permissions` and `Assigned Users` columns.
#[instrument(skip(db))]
pub async fn export_csv(db: &DatabaseConnection, input: &RoleExportInput) -> Result<String, ServiceError> {
    let section = parse_section(input.permission_section.as_deref())?;
    let pattern = input.search_string.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(like_pattern);
    let rows = filtered(pattern, section).all(db).await?;
    let counts = user_counts(db, rows.iter().map(|r| r.id).collect()).await?;
    let records: Vec<Value> = rows
        .iter()
        .map(|r| {
            json!({
                "roleName": r.name,
                "permissions": r.typed_permissions().summary(),
                "assignedUsers": counts.get(&r.id).copied().unwrap_or(0),
            })
        })
        .collect();
    generate_csv(&records).map_err(|e| ServiceError::Internal(e.to_string()))
}

fn filtered(pattern: Option<String>, section: Option<&'static str>) -> Select<role::Entity> {
    let mut select = role::Entity::find().order_by_desc(role::Column::CreatedAt);
    if let Some(pattern) = pattern {
        select = select.filter(ilike((role::Entity, role::Column::Name), &pattern));
    }
    if let Some(section) = section {
        // `section` comes from the fixed SECTIONS list
        select = select.filter(Expr::cust(format!(
            "jsonb_array_length(COALESCE(\"role\".\"permissions\" -> '{}', '[]'::jsonb)) > 0",
            section
        )));
    }
    select
}

/// Active, live users per role.
async fn user_counts(db: &DatabaseConnection, role_ids: Vec<Uuid>) -> Result<HashMap<Uuid, u64>, ServiceError> {
    if role_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(Option<Uuid>, i64)> = user::find_live()
        .select_only()
        .column(user::Column::RoleId)
        .column_as(Expr::col(user::Column::Id).count(), "count")
        .filter(user::Column::Active.eq(true))
        .filter(user::Column::RoleId.is_in(role_ids))
        .group_by(user::Column::RoleId)
        .into_tuple()
        .all(db)
        .await?;
    Ok(rows.into_iter().filter_map(|(id, n)| id.map(|id| (id, n.max(0) as u64))).collect())
}

async fn with_creators(db: &DatabaseConnection, rows: Vec<role::Model>) -> Result<Vec<RoleView>, ServiceError> {
    let creators = refs::users(db, rows.iter().filter_map(|r| r.created_by)).await?;
    Ok(rows
        .into_iter()
        .map(|r| RoleView {
            created_by_user: r.created_by.and_then(|c| creators.get(&c)).map(|u| CreatorRef {
                id: u.id,
                first_name: u.first_name.clone(),
                last_name: u.last_name.clone(),
            }),
            role: r,
        })
        .collect())
}

async fn ensure_name_free(db: &DatabaseConnection, name: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
    let mut select = role::Entity::find().filter(lower_eq((role::Entity, role::Column::Name), name));
    if let Some(id) = except {
        select = select.filter(role::Column::Id.ne(id));
    }
    if select.one(db).await?.is_some() {
        return Err(ServiceError::bad_request("Role with this name already exists"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perms() -> Value {
        json!({"projects": ["CREATE", "VIEW"], "task": [], "users": ["VIEW"], "settings": []})
    }

    #[test]
    fn create_needs_name_and_all_sections() {
        let input = RoleInput { name: Some("QA".into()), permissions: Some(json!({"projects": []})), ..Default::default() };
        match check_input(&input, true).unwrap_err() {
            ServiceError::Validation { details: Some(d), .. } => {
                assert!(d.get("name").is_some());
                assert!(d.get("permissions.task").is_some());
                assert!(d.get("permissions.projects").is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unknown_permission_value_is_rejected() {
        let mut p = perms();
        p["task"] = json!(["FLY"]);
        let input = RoleInput { name: Some("Tester".into()), permissions: Some(p), ..Default::default() };
        assert!(check_input(&input, true).is_err());
    }

    #[test]
    fn valid_input_parses_typed_permissions() {
        let input = RoleInput { name: Some(" Tester ".into()), permissions: Some(perms()), ..Default::default() };
        let (name, p) = check_input(&input, true).unwrap();
        assert_eq!(name.as_deref(), Some("Tester"));
        assert_eq!(p.unwrap().summary(), "Projects: CREATE, VIEW | Users: VIEW");
    }

    #[test]
    fn permission_section_values() {
        assert_eq!(parse_section(Some("Task")).unwrap(), Some("task"));
        assert_eq!(parse_section(Some("all")).unwrap(), None);
        assert_eq!(parse_section(None).unwrap(), None);
        assert_eq!(parse_section(Some("billing")).unwrap_err().to_string(), "Invalid permission section");
    }
}
