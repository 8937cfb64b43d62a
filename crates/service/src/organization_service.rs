use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use common::types::Paginated;
use models::{location, organization, organization_location};

use crate::errors::ServiceError;
use crate::pagination::Pagination;
use crate::validation::{ilike, parse_id, parse_opt_id, present};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationInput {
    pub organization_name: Option<String>,
    pub email: Option<String>,
    pub contact_number: Option<String>,
    pub description: Option<String>,
    pub primary_admin: Option<String>,
    pub locations: Option<Vec<String>>,
}

/// Organization with the ids of its linked locations.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationView {
    #[serde(flatten)]
    pub organization: organization::Model,
    pub locations: Vec<Uuid>,
}

/// Organization with its locations populated.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationDetail {
    #[serde(flatten)]
    pub organization: organization::Model,
    pub locations: Vec<location::Model>,
}

#[instrument(skip(db, input), fields(caller = %caller))]
pub async fn create(db: &DatabaseConnection, caller: Uuid, input: OrganizationInput) -> Result<OrganizationView, ServiceError> {
    if !present(input.organization_name.as_deref()) || !present(input.email.as_deref()) {
        return Err(ServiceError::bad_request("Organization name, email, and primary admin are required"));
    }
    let email = input.email.as_deref().unwrap_or_default().trim().to_lowercase();
    ensure_email_free(db, &email, None).await?;
    let primary_admin = parse_opt_id(input.primary_admin.as_deref(), "User")?;
    let location_ids = resolve_locations(db, input.locations.as_deref().unwrap_or_default()).await?;

    let now = Utc::now();
    let txn = db.begin().await?;
    let created = organization::ActiveModel {
        id: Set(Uuid::new_v4()),
        organization_name: Set(input.organization_name.unwrap_or_default().trim().to_string()),
        email: Set(email),
        contact_number: Set(input.contact_number),
        description: Set(input.description),
        primary_admin: Set(primary_admin),
        created_by: Set(Some(caller)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        deleted_at: Set(None),
    }
    .insert(&txn)
    .await?;
    organization_location::replace_for_organization(&txn, created.id, &location_ids).await?;
    txn.commit().await?;

    info!(organization_id = %created.id, "organization_created");
    Ok(OrganizationView { organization: created, locations: dedup(location_ids) })
}

/// Live organizations created by `caller`.
#[instrument(skip(db))]
pub async fn list_mine(db: &DatabaseConnection, caller: Uuid) -> Result<Vec<OrganizationView>, ServiceError> {
    let orgs = organization::find_live()
        .filter(organization::Column::CreatedBy.eq(caller))
        .order_by_desc(organization::Column::CreatedAt)
        .all(db)
        .await?;
    attach_location_ids(db, orgs).await
}

#[instrument(skip(db))]
pub async fn list_all(db: &DatabaseConnection) -> Result<Vec<OrganizationView>, ServiceError> {
    let orgs = organization::find_live()
        .order_by_desc(organization::Column::CreatedAt)
        .all(db)
        .await?;
    attach_location_ids(db, orgs).await
}

#[instrument(skip(db))]
pub async fn get(db: &DatabaseConnection, id: Uuid) -> Result<OrganizationDetail, ServiceError> {
    let org = organization::find_live_by_id(db, id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Organization"))?;
    let ids = organization_location::location_ids_for(db, id).await?;
    let locations = if ids.is_empty() {
        Vec::new()
    } else {
        location::find_live().filter(location::Column::Id.is_in(ids)).all(db).await?
    };
    Ok(OrganizationDetail { organization: org, locations })
}

/// Paginated live organizations; search covers name, email and description.
#[instrument(skip(db))]
pub async fn list(db: &DatabaseConnection, page: &Pagination) -> Result<Paginated<OrganizationView>, ServiceError> {
    let mut select = organization::find_live().order_by_desc(organization::Column::CreatedAt);
    if let Some(pattern) = page.like_pattern() {
        select = select.filter(
            Condition::any()
                .add(ilike((organization::Entity, organization::Column::OrganizationName), &pattern))
                .add(ilike((organization::Entity, organization::Column::Email), &pattern))
                .add(ilike((organization::Entity, organization::Column::Description), &pattern)),
        );
    }
    let result = page.fetch(db, select).await?;
    let views = attach_location_ids(db, result.records).await?;
    Ok(Paginated { pagination_info: result.pagination_info, records: views })
}

#[instrument(skip(db, input))]
pub async fn update(db: &DatabaseConnection, id: Uuid, input: OrganizationInput) -> Result<OrganizationView, ServiceError> {
    let existing = organization::find_live_by_id(db, id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Organization with identifier '{}' not found", id)))?;

    let mut am: organization::ActiveModel = existing.into();
    if let Some(email) = input.email.as_deref().filter(|e| !e.trim().is_empty()) {
        let email = email.trim().to_lowercase();
        ensure_email_free(db, &email, Some(id)).await?;
        am.email = Set(email);
    }
    if let Some(name) = input.organization_name.as_deref().filter(|n| !n.trim().is_empty()) {
        am.organization_name = Set(name.trim().to_string());
    }
    if let Some(contact) = input.contact_number {
        am.contact_number = Set(Some(contact));
    }
    if let Some(description) = input.description {
        am.description = Set(Some(description));
    }
    if input.primary_admin.is_some() {
        am.primary_admin = Set(parse_opt_id(input.primary_admin.as_deref(), "User")?);
    }
    am.updated_at = Set(Utc::now().into());

    let txn = db.begin().await?;
    let updated = am.update(&txn).await?;
    if let Some(raw) = input.locations.as_deref() {
        let ids = resolve_locations(db, raw).await?;
        organization_location::replace_for_organization(&txn, id, &ids).await?;
    }
    txn.commit().await?;

    info!(organization_id = %id, "organization_updated");
    let locations = organization_location::location_ids_for(db, id).await?;
    Ok(OrganizationView { organization: updated, locations })
}

#[instrument(skip(db))]
pub async fn delete(db: &DatabaseConnection, id: Uuid) -> Result<(), ServiceError> {
    if organization::find_live_by_id(db, id).await?.is_none() {
        return Err(ServiceError::NotFound(format!("Organization with identifier '{}' not found", id)));
    }
    organization::soft_delete(db, id).await?;
    info!(organization_id = %id, "organization_deleted");
    Ok(())
}

async fn ensure_email_free(db: &DatabaseConnection, email: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
    let mut select = organization::find_live().filter(organization::Column::Email.eq(email));
    if let Some(id) = except {
        select = select.filter(organization::Column::Id.ne(id));
    }
    if select.one(db).await?.is_some() {
        return Err(ServiceError::bad_request("Organization with this email already exists"));
    }
    Ok(())
}

/// Parse location ids and make sure each one is live.
async fn resolve_locations(db: &DatabaseConnection, raw: &[String]) -> Result<Vec<Uuid>, ServiceError> {
    let ids = dedup(raw.iter().map(|s| parse_id(s, "Location")).collect::<Result<Vec<_>, _>>()?);
    if ids.is_empty() {
        return Ok(ids);
    }
    let found = location::find_live().filter(location::Column::Id.is_in(ids.clone())).all(db).await?;
    if found.len() != ids.len() {
        return Err(ServiceError::not_found("Location"));
    }
    Ok(ids)
}

async fn attach_location_ids(db: &DatabaseConnection, orgs: Vec<organization::Model>) -> Result<Vec<OrganizationView>, ServiceError> {
    if orgs.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = orgs.iter().map(|o| o.id).collect();
    let links = organization_location::Entity::find()
        .filter(organization_location::Column::OrganizationId.is_in(ids))
        .all(db)
        .await?;
    let mut by_org: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for link in links {
        by_org.entry(link.organization_id).or_default().push(link.location_id);
    }
    Ok(orgs
        .into_iter()
        .map(|o| {
            let locations = by_org.remove(&o.id).unwrap_or_default();
            OrganizationView { organization: o, locations }
        })
        .collect())
}

fn dedup(ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut out: Vec<Uuid> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;

    fn input(name: &str, email: &str) -> OrganizationInput {
        OrganizationInput {
            organization_name: Some(name.into()),
            email: Some(email.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn organization_crud_service() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let caller = Uuid::new_v4();
        let email = format!("Svc_{}@Example.com", Uuid::new_v4());

        let created = create(&db, caller, input("Acme", &email)).await?;
        assert_eq!(created.organization.email, email.to_lowercase());

        let dup = create(&db, caller, input("Acme 2", &email)).await.unwrap_err();
        assert_eq!(dup.to_string(), "Organization with this email already exists");

        let mine = list_mine(&db, caller).await?;
        assert_eq!(mine.len(), 1);

        let patch = OrganizationInput { description: Some("Rockets".into()), ..Default::default() };
        let updated = update(&db, created.organization.id, patch).await?;
        assert_eq!(updated.organization.description.as_deref(), Some("Rockets"));

        delete(&db, created.organization.id).await?;
        assert!(matches!(get(&db, created.organization.id).await, Err(ServiceError::NotFound(_))));
        organization::Entity::delete_by_id(created.organization.id).exec(&db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn create_requires_name_and_email() {
        let err = create(&sea_orm::DatabaseConnection::Disconnected, Uuid::new_v4(), OrganizationInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
    }
}
