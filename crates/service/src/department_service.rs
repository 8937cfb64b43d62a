use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, QueryFilter, QueryOrder, QuerySelect, Set};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use common::types::Paginated;
use models::{department, organization, user};

use crate::errors::ServiceError;
use crate::pagination::Pagination;
use crate::refs::{self, UserSummary};
use crate::validation::{ilike, lower_eq, parse_id, parse_opt_id, present};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentInput {
    pub name: Option<String>,
    pub organization: Option<String>,
    pub head_of_department: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct DepartmentFilter {
    pub organization_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub status: Option<String>,
}

/// Department with organization and head populated.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentView {
    #[serde(flatten)]
    pub department: department::Model,
    pub organization: Option<organization::Model>,
    pub head_of_department: Option<UserSummary>,
}

#[instrument(skip(db, input))]
pub async fn create(db: &DatabaseConnection, caller: Uuid, input: DepartmentInput) -> Result<department::Model, ServiceError> {
    if !present(input.name.as_deref()) || !present(input.organization.as_deref()) {
        return Err(ServiceError::bad_request("Name and organization are required"));
    }
    let name = input.name.as_deref().unwrap_or_default().trim().to_string();
    let organization_id = parse_id(input.organization.as_deref().unwrap_or_default(), "Organization")?;
    ensure_organization(db, organization_id).await?;
    ensure_name_free(db, organization_id, &name, None).await?;
    let head = parse_opt_id(input.head_of_department.as_deref(), "User")?;

    let now = Utc::now();
    let created = department::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        organization_id: Set(organization_id),
        head_of_department: Set(head),
        description: Set(input.description),
        status: Set(input.status.filter(|s| !s.trim().is_empty()).unwrap_or_else(|| department::STATUS_ACTIVE.into())),
        created_by: Set(Some(caller)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        deleted_at: Set(None),
    }
    .insert(db)
    .await?;
    info!(department_id = %created.id, organization_id = %organization_id, "department_created");
    Ok(created)
}

#[instrument(skip(db, input))]
pub async fn update(db: &DatabaseConnection, id: Uuid, input: DepartmentInput) -> Result<department::Model, ServiceError> {
    let existing = department::find_live_by_id(db, id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Department"))?;

    let organization_id = match input.organization.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => {
            let org = parse_id(raw, "Organization")?;
            ensure_organization(db, org).await?;
            org
        }
        None => existing.organization_id,
    };
    let name = input
        .name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(&existing.name)
        .to_string();
    ensure_name_free(db, organization_id, &name, Some(id)).await?;

    let mut am: department::ActiveModel = existing.into();
    am.name = Set(name);
    am.organization_id = Set(organization_id);
    if let Some(raw) = input.head_of_department.as_deref() {
        // an empty string clears the head
        am.head_of_department = Set(parse_opt_id(Some(raw), "User")?);
    }
    if let Some(description) = input.description {
        am.description = Set(Some(description));
    }
    if let Some(status) = input.status.filter(|s| !s.trim().is_empty()) {
        am.status = Set(status);
    }
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(department_id = %id, "department_updated");
    Ok(updated)
}

#[instrument(skip(db))]
pub async fn delete(db: &DatabaseConnection, id: Uuid) -> Result<(), ServiceError> {
    if department::find_live_by_id(db, id).await?.is_none() {
        return Err(ServiceError::not_found("Department"));
    }
    department::soft_delete(db, id).await?;
    info!(department_id = %id, "department_deleted");
    Ok(())
}

#[instrument(skip(db))]
pub async fn list_all(db: &DatabaseConnection) -> Result<Vec<DepartmentView>, ServiceError> {
    let rows = department::find_live().order_by_desc(department::Column::CreatedAt).all(db).await?;
    populate(db, rows).await
}

#[instrument(skip(db))]
pub async fn get(db: &DatabaseConnection, id: Uuid) -> Result<DepartmentView, ServiceError> {
    let found = department::find_live_by_id(db, id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Department"))?;
    let mut views = populate(db, vec![found]).await?;
    views.pop().ok_or_else(|| ServiceError::not_found("Department"))
}

/// Departments of one organization; search on name.
#[instrument(skip(db))]
pub async fn list_by_organization(db: &DatabaseConnection, organization_id: Uuid, page: &Pagination) -> Result<Paginated<DepartmentView>, ServiceError> {
    let mut select = department::find_live()
        .filter(department::Column::OrganizationId.eq(organization_id))
        .order_by_desc(department::Column::CreatedAt);
    if let Some(pattern) = page.like_pattern() {
        select = select.filter(ilike((department::Entity, department::Column::Name), &pattern));
    }
    let result = page.fetch(db, select).await?;
    let records = populate(db, result.records).await?;
    Ok(Paginated { pagination_info: result.pagination_info, records })
}

/// Search covers department name, organization name and the head's first/last name.
#[instrument(skip(db))]
pub async fn list(db: &DatabaseConnection, page: &Pagination, filter: &DepartmentFilter) -> Result<Paginated<DepartmentView>, ServiceError> {
    let mut select = department::find_live().order_by_desc(department::Column::CreatedAt);
    if let Some(org) = filter.organization_id {
        select = select.filter(department::Column::OrganizationId.eq(org));
    }
    if let Some(dept) = filter.department_id {
        select = select.filter(department::Column::Id.eq(dept));
    }
    if let Some(status) = filter.status.as_deref().filter(|s| !s.trim().is_empty()) {
        select = select.filter(department::Column::Status.eq(status));
    }
    if let Some(pattern) = page.like_pattern() {
        let org_ids: Vec<Uuid> = organization::find_live()
            .select_only()
            .column(organization::Column::Id)
            .filter(ilike((organization::Entity, organization::Column::OrganizationName), &pattern))
            .into_tuple()
            .all(db)
            .await?;
        let head_ids: Vec<Uuid> = user::find_live()
            .select_only()
            .column(user::Column::Id)
            .filter(
                Condition::any()
                    .add(ilike((user::Entity, user::Column::FirstName), &pattern))
                    .add(ilike((user::Entity, user::Column::LastName), &pattern)),
            )
            .into_tuple()
            .all(db)
            .await?;
        select = select.filter(
            Condition::any()
                .add(ilike((department::Entity, department::Column::Name), &pattern))
                .add(department::Column::OrganizationId.is_in(org_ids))
                .add(department::Column::HeadOfDepartment.is_in(head_ids)),
        );
    }
    let result = page.fetch(db, select).await?;
    let records = populate(db, result.records).await?;
    Ok(Paginated { pagination_info: result.pagination_info, records })
}

async fn populate(db: &DatabaseConnection, rows: Vec<department::Model>) -> Result<Vec<DepartmentView>, ServiceError> {
    let orgs = refs::organizations(db, rows.iter().map(|d| d.organization_id)).await?;
    let heads = refs::user_summaries(db, rows.iter().filter_map(|d| d.head_of_department)).await?;
    Ok(rows
        .into_iter()
        .map(|d| DepartmentView {
            organization: orgs.get(&d.organization_id).cloned(),
            head_of_department: d.head_of_department.and_then(|h| heads.get(&h).cloned()),
            department: d,
        })
        .collect())
}

async fn ensure_organization(db: &DatabaseConnection, id: Uuid) -> Result<(), ServiceError> {
    if organization::find_live_by_id(db, id).await?.is_none() {
        return Err(ServiceError::not_found("Organization"));
    }
    Ok(())
}

async fn ensure_name_free(db: &DatabaseConnection, organization_id: Uuid, name: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
    let mut select = department::find_live()
        .filter(department::Column::OrganizationId.eq(organization_id))
        .filter(lower_eq((department::Entity, department::Column::Name), name));
    if let Some(id) = except {
        select = select.filter(department::Column::Id.ne(id));
    }
    if select.one(db).await?.is_some() {
        return Err(ServiceError::bad_request("Department with this name already exists in the organization"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::organization_service::{self, OrganizationInput};
    use crate::test_support::get_db;
    use sea_orm::EntityTrait;

    #[tokio::test]
    async fn create_requires_name_and_organization() {
        let err = create(&DatabaseConnection::Disconnected, Uuid::new_v4(), DepartmentInput { name: Some("Ops".into()), ..Default::default() })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Name and organization are required");
    }

    #[tokio::test]
    async fn department_names_are_unique_per_organization() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let caller = Uuid::new_v4();
        let org = organization_service::create(
            &db,
            caller,
            OrganizationInput {
                organization_name: Some("Dept Org".into()),
                email: Some(format!("dept_{}@example.com", Uuid::new_v4())),
                ..Default::default()
            },
        )
        .await?;
        let org_id = org.organization.id.to_string();

        let input = |name: &str| DepartmentInput { name: Some(name.into()), organization: Some(org_id.clone()), ..Default::default() };
        let first = create(&db, caller, input("Finance")).await?;
        assert_eq!(first.status, "active");
        let dup = create(&db, caller, input("FINANCE")).await.unwrap_err();
        assert_eq!(dup.to_string(), "Department with this name already exists in the organization");

        let page = list_by_organization(&db, org.organization.id, &Pagination::default()).await?;
        assert_eq!(page.pagination_info.total_records, 1);
        assert_eq!(page.records[0].organization.as_ref().map(|o| o.id), Some(org.organization.id));

        delete(&db, first.id).await?;
        assert!(matches!(get(&db, first.id).await, Err(ServiceError::NotFound(_))));

        department::Entity::delete_by_id(first.id).exec(&db).await?;
        organization::Entity::delete_by_id(org.organization.id).exec(&db).await?;
        Ok(())
    }
}
