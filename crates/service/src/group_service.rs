use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, instrument};
use uuid::Uuid;

use common::types::Paginated;
use common::utils::csv::generate_csv;
use models::{activity, department, group, group_member, user};

use crate::activity_service::{self, ActivityEntry, AuditContext};
use crate::errors::ServiceError;
use crate::pagination::{like_pattern, Pagination};
use crate::refs::{self, UserSummary};
use crate::user_service::{self, UserView};
use crate::validation::{ilike, parse_id, FieldErrors};

const NAME_MIN: usize = 3;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInput {
    pub name: Option<String>,
    pub department: Option<String>,
    pub manager: Option<String>,
    pub members: Option<Vec<String>>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct MemberFilter {
    pub department_id: Option<Uuid>,
    /// `Some(true)` active members only, `Some(false)` inactive only.
    pub active: Option<bool>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupView {
    #[serde(flatten)]
    pub group: group::Model,
    pub department: Option<department::Model>,
    pub manager: Option<UserSummary>,
    pub members: Vec<UserSummary>,
}

/// Parsed and validated group fields.
#[derive(Debug)]
struct GroupFields {
    name: Option<String>,
    department_id: Option<Uuid>,
    manager_id: Option<Uuid>,
    member_ids: Option<Vec<Uuid>>,
}

fn check_input(input: &GroupInput, creating: bool) -> Result<GroupFields, ServiceError> {
    let mut errs = FieldErrors::new();
    let name = input.name.as_deref().map(str::trim).map(String::from);
    match &name {
        Some(n) => errs.check(n.chars().count() >= NAME_MIN, "name", "Group name must be at least 3 characters"),
        None if creating => errs.add("name", "Group name is required"),
        None => {}
    }

    let mut id_field = |raw: Option<&str>, field: &str, label: &str| -> Option<Uuid> {
        match raw.map(str::trim) {
            Some(s) if !s.is_empty() => match Uuid::parse_str(s) {
                Ok(id) => Some(id),
                Err(_) => {
                    errs.add(field, format!("Invalid {} ID format", label));
                    None
                }
            },
            _ => {
                if creating {
                    errs.add(field, format!("{} is required", label));
                }
                None
            }
        }
    };
    let department_id = id_field(input.department.as_deref(), "department", "Department");
    let manager_id = id_field(input.manager.as_deref(), "manager", "Manager");

    let member_ids = match &input.members {
        Some(list) => {
            let parsed: Vec<Uuid> = list.iter().filter_map(|m| Uuid::parse_str(m.trim()).ok()).collect();
            errs.check(parsed.len() == list.len(), "members", "Invalid member ID format");
            errs.check(!list.is_empty(), "members", "At least one member is required");
            Some(parsed)
        }
        None => {
            if creating {
                errs.add("members", "At least one member is required");
            }
            None
        }
    };

    errs.finish("Group details provided do not meet the required validation criteria")?;
    Ok(GroupFields { name, department_id, manager_id, member_ids })
}

#[instrument(skip(db, ctx, input))]
pub async fn create(db: &DatabaseConnection, ctx: &AuditContext, input: GroupInput) -> Result<GroupView, ServiceError> {
    let fields = check_input(&input, true)?;
    let name = fields.name.unwrap_or_default();
    let (Some(department_id), Some(manager_id)) = (fields.department_id, fields.manager_id) else {
        return Err(ServiceError::validation("Group details provided do not meet the required validation criteria"));
    };
    let member_ids = fields.member_ids.unwrap_or_default();
    ensure_name_free(db, &name, None).await?;
    ensure_references(db, Some(department_id), Some(manager_id), Some(&member_ids)).await?;

    let now = Utc::now();
    let txn = db.begin().await?;
    let created = group::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        department_id: Set(department_id),
        manager_id: Set(manager_id),
        description: Set(input.description),
        created_by: Set(ctx.performed_by),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        deleted_at: Set(None),
    }
    .insert(&txn)
    .await?;
    group_member::replace_for_group(&txn, created.id, &member_ids).await?;
    txn.commit().await?;

    let created_snapshot = snapshot(&created, &member_ids);
    activity_service::record(
        db,
        ctx,
        ActivityEntry {
            entity_type: activity::ENTITY_GROUP,
            entity_id: created.id,
            action: activity::ACTION_CREATE,
            old_data: None,
            new_data: Some(created_snapshot),
            changes: None,
        },
    )
    .await;
    info!(group_id = %created.id, "group_created");
    get(db, created.id).await
}

#[instrument(skip(db, ctx, input))]
pub async fn update(db: &DatabaseConnection, ctx: &AuditContext, id: Uuid, input: GroupInput) -> Result<GroupView, ServiceError> {
    let fields = check_input(&input, false)?;
    let existing = group::find_live_by_id(db, id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Group with identifier '{}' not found", id)))?;
    let old_members = group_member::member_ids(db, id).await?;
    let before = snapshot(&existing, &old_members);

    if let Some(name) = &fields.name {
        ensure_name_free(db, name, Some(id)).await?;
    }
    ensure_references(db, fields.department_id, fields.manager_id, fields.member_ids.as_deref()).await?;

    let mut am: group::ActiveModel = existing.into();
    if let Some(name) = fields.name {
        am.name = Set(name);
    }
    if let Some(department_id) = fields.department_id {
        am.department_id = Set(department_id);
    }
    if let Some(manager_id) = fields.manager_id {
        am.manager_id = Set(manager_id);
    }
    if let Some(description) = input.description {
        am.description = Set(Some(description));
    }
    am.updated_at = Set(Utc::now().into());

    let txn = db.begin().await?;
    let updated = am.update(&txn).await?;
    if let Some(members) = &fields.member_ids {
        group_member::replace_for_group(&txn, id, members).await?;
    }
    txn.commit().await?;

    let members = fields.member_ids.unwrap_or(old_members);
    let after = snapshot(&updated, &members);
    activity_service::record(
        db,
        ctx,
        ActivityEntry {
            entity_type: activity::ENTITY_GROUP,
            entity_id: id,
            action: activity::ACTION_UPDATE,
            changes: activity_service::diff(&before, &after, ("from", "to")),
            old_data: Some(before),
            new_data: Some(after),
        },
    )
    .await;
    info!(group_id = %id, "group_updated");
    get(db, id).await
}

#[instrument(skip(db, ctx))]
pub async fn delete(db: &DatabaseConnection, ctx: &AuditContext, id: Uuid) -> Result<(), ServiceError> {
    let existing = group::find_live_by_id(db, id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Group with identifier '{}' not found", id)))?;
    let members = group_member::member_ids(db, id).await?;
    let before = snapshot(&existing, &members);

    let mut am: group::ActiveModel = existing.into();
    let now = Utc::now();
    am.deleted_at = Set(Some(now.into()));
    am.updated_at = Set(now.into());
    am.update(db).await?;

    activity_service::record(
        db,
        ctx,
        ActivityEntry {
            entity_type: activity::ENTITY_GROUP,
            entity_id: id,
            action: activity::ACTION_DELETE,
            old_data: Some(before),
            new_data: None,
            changes: None,
        },
    )
    .await;
    info!(group_id = %id, "group_deleted");
    Ok(())
}

/// Search on name, optional department filter.
#[instrument(skip(db))]
pub async fn list(db: &DatabaseConnection, page: &Pagination, department_id: Option<Uuid>) -> Result<Paginated<GroupView>, ServiceError> {
    let mut select = group::find_live().order_by_desc(group::Column::CreatedAt);
    if let Some(dept) = department_id {
        select = select.filter(group::Column::DepartmentId.eq(dept));
    }
    if let Some(pattern) = page.like_pattern() {
        select = select.filter(ilike((group::Entity, group::Column::Name), &pattern));
    }
    let result = page.fetch(db, select).await?;
    let records = populate(db, result.records).await?;
    Ok(Paginated { pagination_info: result.pagination_info, records })
}

#[instrument(skip(db))]
pub async fn list_all(db: &DatabaseConnection) -> Result<Vec<GroupView>, ServiceError> {
    let rows = group::find_live().order_by_desc(group::Column::CreatedAt).all(db).await?;
    populate(db, rows).await
}

#[instrument(skip(db))]
pub async fn get(db: &DatabaseConnection, id: Uuid) -> Result<GroupView, ServiceError> {
    let found = group::find_live_by_id(db, id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Group"))?;
    let mut views = populate(db, vec![found]).await?;
    views.pop().ok_or_else(|| ServiceError::not_found("Group"))
}

/// Live members of a group; search on first/last name and email.
#[instrument(skip(db))]
pub async fn members(db: &DatabaseConnection, id: Uuid, page: &Pagination, filter: &MemberFilter) -> Result<Paginated<UserView>, ServiceError> {
    if group::find_live_by_id(db, id).await?.is_none() {
        return Err(ServiceError::not_found("Group"));
    }
    let member_ids = group_member::member_ids(db, id).await?;
    let mut select = user::find_live()
        .filter(user::Column::Id.is_in(member_ids))
        .order_by_desc(user::Column::CreatedAt);
    if let Some(dept) = filter.department_id {
        select = select.filter(user::Column::DepartmentId.eq(dept));
    }
    if let Some(active) = filter.active {
        select = select.filter(user::Column::Active.eq(active));
    }
    if let Some(pattern) = page.like_pattern() {
        select = select.filter(
            Condition::any()
                .add(ilike((user::Entity, user::Column::FirstName), &pattern))
                .add(ilike((user::Entity, user::Column::LastName), &pattern))
                .add(ilike((user::Entity, user::Column::Email), &pattern)),
        );
    }
    let result = page.fetch(db, select).await?;
    let records = user_service::populate(db, result.records).await?;
    Ok(Paginated { pagination_info: result.pagination_info, records })
}

#[instrument(skip(db))]
pub async fn activity(db: &DatabaseConnection, id: Uuid) -> Result<Vec<activity::Model>, ServiceError> {
    activity_service::list_for(db, activity::ENTITY_GROUP, id).await
}

/// CSV of groups matching `search` and `department`.
#[instrument(skip(db))]
pub async fn export_csv(db: &DatabaseConnection, search: Option<&str>, department: Option<&str>) -> Result<String, ServiceError> {
    let mut select = group::find_live().order_by_desc(group::Column::CreatedAt);
    if let Some(s) = search.map(str::trim).filter(|s| !s.is_empty()) {
        select = select.filter(ilike((group::Entity, group::Column::Name), &like_pattern(s)));
    }
    if let Some(raw) = department.map(str::trim).filter(|s| !s.is_empty()) {
        select = select.filter(group::Column::DepartmentId.eq(parse_id(raw, "Department")?));
    }
    let views = populate(db, select.all(db).await?).await?;
    let rows: Vec<Value> = views
        .iter()
        .map(|v| {
            json!({
                "name": v.group.name,
                "department": v.department.as_ref().map(|d| d.name.clone()),
                "manager": v.manager.as_ref().map(|m| format!("{} {}", m.first_name, m.last_name)),
                "members": v.members.iter().map(|m| format!("{} {}", m.first_name, m.last_name)).collect::<Vec<_>>(),
                "description": v.group.description,
                "createdAt": v.group.created_at.to_rfc3339(),
            })
        })
        .collect();
    generate_csv(&rows).map_err(|e| ServiceError::Internal(e.to_string()))
}

async fn populate(db: &DatabaseConnection, rows: Vec<group::Model>) -> Result<Vec<GroupView>, ServiceError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = rows.iter().map(|g| g.id).collect();
    let links = group_member::Entity::find()
        .filter(group_member::Column::GroupId.is_in(ids))
        .all(db)
        .await?;
    let mut members_by_group: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for link in &links {
        members_by_group.entry(link.group_id).or_default().push(link.user_id);
    }

    let departments = refs::departments(db, rows.iter().map(|g| g.department_id)).await?;
    let people = refs::user_summaries(
        db,
        rows.iter().map(|g| g.manager_id).chain(links.iter().map(|l| l.user_id)),
    )
    .await?;

    Ok(rows
        .into_iter()
        .map(|g| {
            let members = members_by_group
                .remove(&g.id)
                .unwrap_or_default()
                .iter()
                .filter_map(|id| people.get(id).cloned())
                .collect();
            GroupView {
                department: departments.get(&g.department_id).cloned(),
                manager: people.get(&g.manager_id).cloned(),
                members,
                group: g,
            }
        })
        .collect())
}

fn snapshot(g: &group::Model, members: &[Uuid]) -> Value {
    let mut value = serde_json::to_value(g).unwrap_or(Value::Null);
    if let Some(obj) = value.as_object_mut() {
        obj.insert("members".into(), json!(members));
    }
    value
}

async fn ensure_name_free(db: &DatabaseConnection, name: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
    let mut select = group::find_live().filter(group::Column::Name.eq(name));
    if let Some(id) = except {
        select = select.filter(group::Column::Id.ne(id));
    }
    if select.one(db).await?.is_some() {
        return Err(ServiceError::conflict("Group name already exists"));
    }
    Ok(())
}

async fn ensure_references(
    db: &DatabaseConnection,
    department_id: Option<Uuid>,
    manager_id: Option<Uuid>,
    member_ids: Option<&[Uuid]>,
) -> Result<(), ServiceError> {
    if let Some(id) = department_id {
        if department::find_live_by_id(db, id).await?.is_none() {
            return Err(ServiceError::not_found("Department"));
        }
    }
    if let Some(id) = manager_id {
        if user::find_live_by_id(db, id).await?.is_none() {
            return Err(ServiceError::not_found("Manager"));
        }
    }
    if let Some(ids) = member_ids {
        let found = refs::users(db, ids.iter().copied()).await?;
        if ids.iter().any(|id| !found.contains_key(id)) {
            return Err(ServiceError::not_found("Member"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_requires_every_field() {
        let err = check_input(&GroupInput::default(), true).unwrap_err();
        match err {
            ServiceError::Validation { details: Some(d), .. } => {
                for field in ["name", "department", "manager", "members"] {
                    assert!(d.get(field).is_some(), "missing detail for {}", field);
                }
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn update_checks_only_present_fields() {
        assert!(check_input(&GroupInput::default(), false).is_ok());
        let short = GroupInput { name: Some("ab".into()), ..Default::default() };
        assert!(check_input(&short, false).is_err());
        let bad_member = GroupInput { members: Some(vec!["x".into()]), ..Default::default() };
        assert!(check_input(&bad_member, false).is_err());
    }

    #[test]
    fn snapshot_includes_member_ids() {
        let now = Utc::now().into();
        let g = group::Model {
            id: Uuid::new_v4(),
            name: "Core".into(),
            department_id: Uuid::new_v4(),
            manager_id: Uuid::new_v4(),
            description: None,
            created_by: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let member = Uuid::new_v4();
        let snap = snapshot(&g, &[member]);
        assert_eq!(snap["members"][0], json!(member));
        assert_eq!(snap["name"], "Core");
    }
}
