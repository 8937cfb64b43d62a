use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, instrument};
use uuid::Uuid;

use common::types::Paginated;
use common::utils::csv::generate_csv;
use models::{activity, location, organization_location, user};

use crate::activity_service::{self, ActivityEntry, AuditContext};
use crate::errors::ServiceError;
use crate::pagination::{like_pattern, Pagination};
use crate::refs::{self, UserSummary};
use crate::validation::{filter_id, ilike, FieldErrors};

const ZIP_MIN: usize = 3;

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub time_zone: Option<String>,
    pub address_line: Option<String>,
    pub street_address: Option<String>,
    pub zip: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AddressesInput {
    #[serde(default)]
    pub addresses: Vec<AddressInput>,
}

/// Organization reference shown next to a location.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationRef {
    pub id: Uuid,
    pub organization_name: String,
    pub email: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationListItem {
    #[serde(flatten)]
    pub location: location::Model,
    pub organization: Option<OrganizationRef>,
    pub user_count: u64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationDetail {
    #[serde(flatten)]
    pub location: location::Model,
    pub created_by_user: Option<UserSummary>,
}

/// Validated address fields.
#[derive(Debug)]
struct Address {
    country: String,
    state: Option<String>,
    city: String,
    time_zone: String,
    address_line: Option<String>,
    street_address: String,
    zip: String,
}

fn required(errs: &mut FieldErrors, value: &Option<String>, field: &str, label: &str) -> String {
    let v = value.as_deref().map(str::trim).unwrap_or_default();
    errs.check(!v.is_empty(), field, format!("{} is required", label));
    v.to_string()
}

fn check_address(index: usize, a: &AddressInput) -> Result<Address, ServiceError> {
    let mut errs = FieldErrors::new();
    let country = required(&mut errs, &a.country, "country", "Country");
    let city = required(&mut errs, &a.city, "city", "City");
    let time_zone = required(&mut errs, &a.time_zone, "timeZone", "Time zone");
    let street_address = required(&mut errs, &a.street_address, "streetAddress", "Street address");
    let zip = required(&mut errs, &a.zip, "zip", "Zip");
    errs.finish(&format!("Address {} validation failed", index + 1))?;
    if zip.chars().count() < ZIP_MIN {
        return Err(ServiceError::bad_request("Address has invalid zip code"));
    }
    let opt = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(String::from);
    Ok(Address {
        country,
        state: opt(&a.state),
        city,
        time_zone,
        address_line: opt(&a.address_line),
        street_address,
        zip,
    })
}

fn check_addresses(input: &AddressesInput) -> Result<Vec<Address>, ServiceError> {
    if input.addresses.is_empty() {
        return Err(ServiceError::bad_request("Addresses are required"));
    }
    input.addresses.iter().enumerate().map(|(i, a)| check_address(i, a)).collect()
}

/// One location per address, all or none; each gets its own CREATE entry.
#[instrument(skip(db, ctx, input))]
pub async fn create(db: &DatabaseConnection, ctx: &AuditContext, input: AddressesInput) -> Result<Vec<location::Model>, ServiceError> {
    let addresses = check_addresses(&input)?;
    let mut created = Vec::with_capacity(addresses.len());
    let txn = db.begin().await?;
    for a in addresses {
        let now = Utc::now();
        let saved = location::ActiveModel {
            id: Set(Uuid::new_v4()),
            country: Set(a.country),
            state: Set(a.state),
            city: Set(a.city),
            time_zone: Set(a.time_zone),
            address_line: Set(a.address_line),
            street_address: Set(a.street_address),
            zip: Set(a.zip),
            created_by: Set(ctx.performed_by),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            deleted_at: Set(None),
        }
        .insert(&txn)
        .await?;
        created.push(saved);
    }
    txn.commit().await?;

    for saved in &created {
        activity_service::record(
            db,
            ctx,
            ActivityEntry {
                entity_type: activity::ENTITY_LOCATION,
                entity_id: saved.id,
                action: activity::ACTION_CREATE,
                old_data: None,
                new_data: serde_json::to_value(saved).ok(),
                changes: None,
            },
        )
        .await;
    }
    info!(count = created.len(), "locations_created");
    Ok(created)
}

/// The first address replaces the location's fields.
#[instrument(skip(db, ctx, input))]
pub async fn update(db: &DatabaseConnection, ctx: &AuditContext, id: Uuid, input: AddressesInput) -> Result<location::Model, ServiceError> {
    let mut addresses = check_addresses(&input)?;
    let existing = location::find_live_by_id(db, id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Location with identifier '{}' not found", id)))?;
    let a = addresses.remove(0);
    let before = serde_json::to_value(&existing).unwrap_or(Value::Null);

    let mut am: location::ActiveModel = existing.into();
    am.country = Set(a.country);
    am.state = Set(a.state);
    am.city = Set(a.city);
    am.time_zone = Set(a.time_zone);
    am.address_line = Set(a.address_line);
    am.street_address = Set(a.street_address);
    am.zip = Set(a.zip);
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;

    let after = serde_json::to_value(&updated).unwrap_or(Value::Null);
    activity_service::record(
        db,
        ctx,
        ActivityEntry {
            entity_type: activity::ENTITY_LOCATION,
            entity_id: id,
            action: activity::ACTION_UPDATE,
            changes: activity_service::diff(&before, &after, ("from", "to")),
            old_data: Some(before),
            new_data: Some(after),
        },
    )
    .await;
    info!(location_id = %id, "location_updated");
    Ok(updated)
}

#[instrument(skip(db, ctx))]
pub async fn delete(db: &DatabaseConnection, ctx: &AuditContext, id: Uuid) -> Result<(), ServiceError> {
    let existing = location::find_live_by_id(db, id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Location with identifier '{}' not found", id)))?;
    let deleted = location::soft_delete(db, id).await?;
    activity_service::record(
        db,
        ctx,
        ActivityEntry {
            entity_type: activity::ENTITY_LOCATION,
            entity_id: id,
            action: activity::ACTION_DELETE,
            old_data: serde_json::to_value(&existing).ok(),
            new_data: serde_json::to_value(&deleted).ok(),
            changes: None,
        },
    )
    .await;
    info!(location_id = %id, "location_deleted");
    Ok(())
}

/// Search covers country, city, street address and address line.
#[instrument(skip(db))]
pub async fn list(db: &DatabaseConnection, page: &Pagination, organization_id: Option<Uuid>) -> Result<Paginated<LocationListItem>, ServiceError> {
    let select = filtered(db, page.like_pattern(), organization_id).await?;
    let result = page.fetch(db, select).await?;
    let records = decorate(db, result.records, organization_id).await?;
    Ok(Paginated { pagination_info: result.pagination_info, records })
}

#[instrument(skip(db))]
pub async fn list_all(db: &DatabaseConnection) -> Result<Vec<location::Model>, ServiceError> {
    Ok(location::find_live().order_by_desc(location::Column::CreatedAt).all(db).await?)
}

#[instrument(skip(db))]
pub async fn list_mine(db: &DatabaseConnection, caller: Uuid) -> Result<Vec<location::Model>, ServiceError> {
    Ok(location::find_live()
        .filter(location::Column::CreatedBy.eq(caller))
        .order_by_desc(location::Column::CreatedAt)
        .all(db)
        .await?)
}

#[instrument(skip(db))]
pub async fn get(db: &DatabaseConnection, id: Uuid) -> Result<LocationDetail, ServiceError> {
    let found = location::find_live_by_id(db, id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Location"))?;
    let creators = refs::user_summaries(db, found.created_by).await?;
    let created_by_user = found.created_by.and_then(|c| creators.get(&c).cloned());
    Ok(LocationDetail { location: found, created_by_user })
}

#[instrument(skip(db))]
pub async fn activity(db: &DatabaseConnection, id: Uuid) -> Result<Vec<activity::Model>, ServiceError> {
    activity_service::list_for(db, activity::ENTITY_LOCATION, id).await
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationExportInput {
    pub search_term: Option<String>,
    pub organization_id: Option<String>,
}

#[instrument(skip(db))]
pub async fn export_csv(db: &DatabaseConnection, input: &LocationExportInput) -> Result<String, ServiceError> {
    let pattern = input.search_term.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(like_pattern);
    let organization_id = filter_id(input.organization_id.as_deref());
    let rows = filtered(db, pattern, organization_id).await?.all(db).await?;
    let items = decorate(db, rows, organization_id).await?;
    let rows: Vec<Value> = items
        .iter()
        .map(|i| {
            json!({
                "country": i.location.country,
                "state": i.location.state,
                "city": i.location.city,
                "timeZone": i.location.time_zone,
                "streetAddress": i.location.street_address,
                "addressLine": i.location.address_line,
                "zip": i.location.zip,
                "organization": i.organization.as_ref().map(|o| o.organization_name.clone()),
                "userCount": i.user_count,
                "createdAt": i.location.created_at.to_rfc3339(),
            })
        })
        .collect();
    generate_csv(&rows).map_err(|e| ServiceError::Internal(e.to_string()))
}

async fn filtered(
    db: &DatabaseConnection,
    pattern: Option<String>,
    organization_id: Option<Uuid>,
) -> Result<sea_orm::Select<location::Entity>, ServiceError> {
    let mut select = location::find_live().order_by_desc(location::Column::CreatedAt);
    if let Some(org) = organization_id {
        let ids = organization_location::location_ids_for(db, org).await?;
        select = select.filter(location::Column::Id.is_in(ids));
    }
    if let Some(pattern) = pattern {
        select = select.filter(
            Condition::any()
                .add(ilike((location::Entity, location::Column::Country), &pattern))
                .add(ilike((location::Entity, location::Column::City), &pattern))
                .add(ilike((location::Entity, location::Column::StreetAddress), &pattern))
                .add(ilike((location::Entity, location::Column::AddressLine), &pattern)),
        );
    }
    Ok(select)
}

/// Attach the first live linking organization and the active user count.
async fn decorate(
    db: &DatabaseConnection,
    rows: Vec<location::Model>,
    organization_id: Option<Uuid>,
) -> Result<Vec<LocationListItem>, ServiceError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = rows.iter().map(|l| l.id).collect();

    let links = organization_location::Entity::find()
        .filter(organization_location::Column::LocationId.is_in(ids.clone()))
        .order_by_asc(organization_location::Column::CreatedAt)
        .all(db)
        .await?;
    let orgs = refs::organizations(db, links.iter().map(|l| l.organization_id)).await?;
    let mut org_by_location: HashMap<Uuid, OrganizationRef> = HashMap::new();
    for link in &links {
        if let Some(o) = orgs.get(&link.organization_id) {
            org_by_location.entry(link.location_id).or_insert_with(|| OrganizationRef {
                id: o.id,
                organization_name: o.organization_name.clone(),
                email: o.email.clone(),
            });
        }
    }

    let mut counts = user::find_live()
        .select_only()
        .column(user::Column::LocationId)
        .column_as(Expr::col(user::Column::Id).count(), "count")
        .filter(user::Column::Active.eq(true))
        .filter(user::Column::LocationId.is_in(ids));
    if let Some(org) = organization_id {
        counts = counts.filter(user::Column::OrganizationId.eq(org));
    }
    let counts: Vec<(Option<Uuid>, i64)> = counts.group_by(user::Column::LocationId).into_tuple().all(db).await?;
    let count_by_location: HashMap<Uuid, u64> = counts
        .into_iter()
        .filter_map(|(loc, n)| loc.map(|l| (l, n.max(0) as u64)))
        .collect();

    Ok(rows
        .into_iter()
        .map(|l| LocationListItem {
            organization: org_by_location.get(&l.id).cloned(),
            user_count: count_by_location.get(&l.id).copied().unwrap_or(0),
            location: l,
        })
        .collect())
}
