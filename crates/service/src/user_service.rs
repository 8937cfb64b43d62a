use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, QueryFilter, QueryOrder, Select, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, instrument};
use uuid::Uuid;

use common::types::Paginated;
use common::utils::csv::generate_csv;
use models::{activity, department, location, organization, role, user, user_credentials};

use crate::activity_service::{self, ActivityEntry, AuditContext};
use crate::auth::password;
use crate::errors::ServiceError;
use crate::pagination::{escape_like, normalize_search, Pagination};
use crate::refs::{self, UserSummary};
use crate::validation::{filter_id, ilike, FieldErrors};

const PASSWORD_MIN: usize = 8;
const INVALID_USER: &str = "User Details provided do not meet the required validation criteria";

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationDetailsInput {
    pub role: Option<String>,
    pub department: Option<String>,
    pub organization: Option<String>,
    pub location: Option<String>,
    pub reporting_manager: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInput {
    pub asset_id: Option<String>,
    pub asset_name: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub mobile_number: Option<String>,
    pub gender: Option<String>,
    pub active: Option<bool>,
    pub profile_pic: Option<String>,
    pub designation: Option<String>,
    pub organization_details: Option<OrganizationDetailsInput>,
    pub password_setting: Option<String>,
    pub password: Option<String>,
    pub assets: Option<Vec<AssetInput>>,
}

impl UserInput {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.middle_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.mobile_number.is_none()
            && self.gender.is_none()
            && self.active.is_none()
            && self.profile_pic.is_none()
            && self.designation.is_none()
            && self.organization_details.is_none()
            && self.password_setting.is_none()
            && self.password.is_none()
            && self.assets.is_none()
    }
}

/// List/export filters. Malformed ids are ignored.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct UserFilterInput {
    pub search_string: Option<String>,
    pub organization_id: Option<String>,
    pub department_id: Option<String>,
    pub role_id: Option<String>,
    /// `active`, `inactive` or `all`
    pub status: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationRef {
    pub id: Uuid,
    pub organization_name: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRef {
    pub id: Uuid,
    pub city: String,
    pub country: String,
}

/// User with every reference populated.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    #[serde(flatten)]
    pub user: user::Model,
    pub role: Option<NamedRef>,
    pub department: Option<NamedRef>,
    pub organization: Option<OrganizationRef>,
    pub location: Option<LocationRef>,
    pub reporting_manager: Option<UserSummary>,
}

/// Result of create: the generated password is only ever returned here.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedUser {
    #[serde(flatten)]
    pub user: UserView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporary_password: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordReset {
    pub id: Uuid,
    pub temporary_password: String,
}

/// Reference ids after parsing. Outer `None`: not given; inner `None`: cleared.
#[derive(Debug, Default)]
struct DetailIds {
    role: Option<Option<Uuid>>,
    department: Option<Option<Uuid>>,
    organization: Option<Option<Uuid>>,
    location: Option<Option<Uuid>>,
    reporting_manager: Option<Option<Uuid>>,
}

fn check_id(errs: &mut FieldErrors, raw: &Option<String>, field: &str) -> Option<Option<Uuid>> {
    let raw = raw.as_deref()?.trim();
    if raw.is_empty() {
        return Some(None);
    }
    match Uuid::parse_str(raw) {
        Ok(id) => Some(Some(id)),
        Err(_) => {
            errs.add(field, "Invalid ID format");
            None
        }
    }
}

/// Create validates every field; update validates only present ones.
fn check_input(input: &UserInput, creating: bool) -> Result<DetailIds, ServiceError> {
    let mut errs = FieldErrors::new();

    match input.first_name.as_deref() {
        Some(v) => {
            if let Err(e) = user::validate_name(v) {
                errs.add("firstName", model_message(e));
            }
        }
        None if creating => errs.add("firstName", "First name is required"),
        None => {}
    }
    match input.last_name.as_deref() {
        Some(v) => errs.check(!v.trim().is_empty(), "lastName", "Last name is required"),
        None if creating => errs.add("lastName", "Last name is required"),
        None => {}
    }
    match input.email.as_deref() {
        Some(v) => {
            if let Err(e) = user::validate_email(v) {
                errs.add("email", model_message(e));
            }
        }
        None if creating => errs.add("email", "Email is required"),
        None => {}
    }
    match input.mobile_number.as_deref() {
        Some(v) => {
            if let Err(e) = user::validate_mobile(v) {
                errs.add("mobileNumber", model_message(e));
            }
        }
        None if creating => errs.add("mobileNumber", "Mobile number is required"),
        None => {}
    }
    match input.gender.as_deref() {
        Some(v) => errs.check(!v.trim().is_empty(), "gender", "Gender is required"),
        None if creating => errs.add("gender", "Gender is required"),
        None => {}
    }
    if let Some(p) = input.password.as_deref() {
        errs.check(p.chars().count() >= PASSWORD_MIN, "password", "Password must be at least 8 characters");
    }
    if let Some(setting) = input.password_setting.as_deref() {
        if let Err(e) = user::validate_password_setting(setting) {
            errs.add("passwordSetting", model_message(e));
        }
    }
    if let Some(assets) = &input.assets {
        let ok = assets.iter().all(|a| {
            a.asset_id.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false)
                && a.asset_name.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false)
        });
        errs.check(ok, "assets", "Each asset needs an assetId and an assetName");
    }

    let mut ids = DetailIds::default();
    if let Some(d) = &input.organization_details {
        ids.role = check_id(&mut errs, &d.role, "organizationDetails.role");
        ids.department = check_id(&mut errs, &d.department, "organizationDetails.department");
        ids.organization = check_id(&mut errs, &d.organization, "organizationDetails.organization");
        ids.location = check_id(&mut errs, &d.location, "organizationDetails.location");
        ids.reporting_manager = check_id(&mut errs, &d.reporting_manager, "organizationDetails.reportingManager");
    }

    errs.finish(INVALID_USER)?;
    Ok(ids)
}

fn model_message(e: models::errors::ModelError) -> String {
    match e {
        models::errors::ModelError::Validation(m) => m,
        other => other.to_string(),
    }
}

fn assets_value(assets: &[AssetInput]) -> Value {
    let list: Vec<user::Asset> = assets
        .iter()
        .map(|a| user::Asset {
            asset_id: a.asset_id.as_deref().unwrap_or_default().trim().to_string(),
            asset_name: a.asset_name.as_deref().unwrap_or_default().trim().to_string(),
        })
        .collect();
    serde_json::to_value(list).unwrap_or_else(|_| json!([]))
}

/// Referenced role, department, organization and location must exist.
async fn ensure_references(db: &DatabaseConnection, ids: &DetailIds) -> Result<(), ServiceError> {
    if let Some(Some(id)) = ids.role {
        if role::find_by_id(db, id).await?.is_none() {
            return Err(ServiceError::not_found("Role"));
        }
    }
    if let Some(Some(id)) = ids.department {
        if department::find_live_by_id(db, id).await?.is_none() {
            return Err(ServiceError::not_found("Department"));
        }
    }
    if let Some(Some(id)) = ids.organization {
        if organization::find_live_by_id(db, id).await?.is_none() {
            return Err(ServiceError::not_found("Organization"));
        }
    }
    if let Some(Some(id)) = ids.location {
        if location::find_live_by_id(db, id).await?.is_none() {
            return Err(ServiceError::not_found("Location"));
        }
    }
    Ok(())
}

async fn ensure_manager(db: &DatabaseConnection, manager: Option<Uuid>, subject: Uuid) -> Result<(), ServiceError> {
    let Some(manager) = manager else { return Ok(()) };
    if manager == subject {
        return Err(ServiceError::bad_request("User cannot be their own reporting manager"));
    }
    if user::find_live_by_id(db, manager).await?.is_none() {
        return Err(ServiceError::NotFound("Reporting manager not found".into()));
    }
    Ok(())
}

async fn ensure_email_free(db: &DatabaseConnection, email: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
    let mut select = user::find_live().filter(user::Column::Email.eq(email));
    if let Some(id) = except {
        select = select.filter(user::Column::Id.ne(id));
    }
    if select.one(db).await?.is_some() {
        return Err(ServiceError::conflict("Email already exists"));
    }
    Ok(())
}

#[instrument(skip(db, ctx, input))]
pub async fn create(db: &DatabaseConnection, ctx: &AuditContext, input: UserInput) -> Result<CreatedUser, ServiceError> {
    let ids = check_input(&input, true)?;
    let email = input.email.as_deref().unwrap_or_default().trim().to_lowercase();
    ensure_email_free(db, &email, None).await?;
    let manager = ids.reporting_manager.flatten();
    if let (Some(m), Some(caller)) = (manager, ctx.performed_by) {
        if m == caller {
            return Err(ServiceError::bad_request("User cannot be their own reporting manager"));
        }
    }
    if let Some(m) = manager {
        if user::find_live_by_id(db, m).await?.is_none() {
            return Err(ServiceError::NotFound("Reporting manager not found".into()));
        }
    }
    ensure_references(db, &ids).await?;

    let setting = input
        .password_setting
        .clone()
        .unwrap_or_else(|| user::PASSWORD_SETTING_AUTO.to_string());
    let (plain, temporary_password) = match input.password.clone() {
        Some(p) => (p, None),
        None if setting == user::PASSWORD_SETTING_MANUAL => {
            return Err(ServiceError::bad_request("Password is required for manual password setting"));
        }
        None => {
            let generated = password::generate_password();
            (generated.clone(), Some(generated))
        }
    };
    let hash = password::hash_password(&plain)?;

    let now = Utc::now();
    let txn = db.begin().await?;
    let created = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        first_name: Set(input.first_name.unwrap_or_default().trim().to_string()),
        middle_name: Set(input.middle_name),
        last_name: Set(input.last_name.unwrap_or_default().trim().to_string()),
        email: Set(email),
        mobile_number: Set(input.mobile_number.unwrap_or_default().trim().to_string()),
        gender: Set(input.gender.unwrap_or_default().trim().to_string()),
        active: Set(input.active.unwrap_or(true)),
        profile_pic: Set(input.profile_pic),
        designation: Set(input.designation),
        role_id: Set(ids.role.flatten()),
        department_id: Set(ids.department.flatten()),
        organization_id: Set(ids.organization.flatten()),
        location_id: Set(ids.location.flatten()),
        reporting_manager_id: Set(manager),
        password_setting: Set(setting),
        assets: Set(assets_value(input.assets.as_deref().unwrap_or_default())),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        deleted_at: Set(None),
    }
    .insert(&txn)
    .await?;
    user_credentials::upsert_password(&txn, created.id, hash, password::ALGORITHM).await?;
    txn.commit().await?;

    activity_service::record(
        db,
        ctx,
        ActivityEntry {
            entity_type: activity::ENTITY_USER,
            entity_id: created.id,
            action: activity::ACTION_CREATE,
            old_data: None,
            new_data: serde_json::to_value(&created).ok(),
            changes: None,
        },
    )
    .await;
    info!(user_id = %created.id, "user_created");

    let mut views = populate(db, vec![created]).await?;
    let view = views.pop().ok_or_else(|| ServiceError::not_found("User"))?;
    Ok(CreatedUser { user: view, temporary_password })
}

#[instrument(skip(db, ctx, input))]
pub async fn update(db: &DatabaseConnection, ctx: &AuditContext, id: Uuid, input: UserInput) -> Result<UserView, ServiceError> {
    if input.is_empty() {
        return Err(ServiceError::bad_request("At least one field must be provided for update"));
    }
    let ids = check_input(&input, false)?;
    let existing = user::find_live_by_id(db, id)
        .await?
        .ok_or_else(|| ServiceError::not_found("User"))?;

    let email = input.email.as_deref().map(|e| e.trim().to_lowercase());
    if let Some(email) = email.as_deref().filter(|e| *e != existing.email) {
        ensure_email_free(db, email, Some(id)).await?;
    }
    if let Some(manager) = ids.reporting_manager {
        ensure_manager(db, manager, id).await?;
    }
    ensure_references(db, &ids).await?;

    let before = serde_json::to_value(&existing).unwrap_or(Value::Null);
    let mut am: user::ActiveModel = existing.into();
    if let Some(v) = input.first_name {
        am.first_name = Set(v.trim().to_string());
    }
    if let Some(v) = input.middle_name {
        am.middle_name = Set(Some(v));
    }
    if let Some(v) = input.last_name {
        am.last_name = Set(v.trim().to_string());
    }
    if let Some(v) = email {
        am.email = Set(v);
    }
    if let Some(v) = input.mobile_number {
        am.mobile_number = Set(v.trim().to_string());
    }
    if let Some(v) = input.gender {
        am.gender = Set(v.trim().to_string());
    }
    if let Some(v) = input.active {
        am.active = Set(v);
    }
    if let Some(v) = input.profile_pic {
        am.profile_pic = Set(Some(v));
    }
    if let Some(v) = input.designation {
        am.designation = Set(Some(v));
    }
    if let Some(v) = input.password_setting {
        am.password_setting = Set(v);
    }
    if let Some(v) = &input.assets {
        am.assets = Set(assets_value(v));
    }
    // organization details merge over the stored values
    if let Some(v) = ids.role {
        am.role_id = Set(v);
    }
    if let Some(v) = ids.department {
        am.department_id = Set(v);
    }
    if let Some(v) = ids.organization {
        am.organization_id = Set(v);
    }
    if let Some(v) = ids.location {
        am.location_id = Set(v);
    }
    if let Some(v) = ids.reporting_manager {
        am.reporting_manager_id = Set(v);
    }
    am.updated_at = Set(Utc::now().into());

    let txn = db.begin().await?;
    let updated = am.update(&txn).await?;
    if let Some(p) = input.password.as_deref() {
        let hash = password::hash_password(p)?;
        user_credentials::upsert_password(&txn, id, hash, password::ALGORITHM).await?;
    }
    txn.commit().await?;

    let after = serde_json::to_value(&updated).unwrap_or(Value::Null);
    activity_service::record(
        db,
        ctx,
        ActivityEntry {
            entity_type: activity::ENTITY_USER,
            entity_id: id,
            action: activity::ACTION_UPDATE,
            changes: activity_service::diff(&before, &after, ("old", "new")),
            old_data: Some(before),
            new_data: Some(after),
        },
    )
    .await;
    info!(user_id = %id, "user_updated");
    let mut views = populate(db, vec![updated]).await?;
    views.pop().ok_or_else(|| ServiceError::not_found("User"))
}

/// New random password, hashed once and returned once.
#[instrument(skip(db))]
pub async fn reset_password(db: &DatabaseConnection, id: Uuid) -> Result<PasswordReset, ServiceError> {
    if user::find_live_by_id(db, id).await?.is_none() {
        return Err(ServiceError::not_found("User"));
    }
    let temporary_password = password::generate_password();
    let hash = password::hash_password(&temporary_password)?;
    user_credentials::upsert_password(db, id, hash, password::ALGORITHM).await?;
    info!(user_id = %id, "user_password_reset");
    Ok(PasswordReset { id, temporary_password })
}

#[instrument(skip(db, ctx))]
pub async fn delete(db: &DatabaseConnection, ctx: &AuditContext, id: Uuid) -> Result<Uuid, ServiceError> {
    let existing = user::find_live_by_id(db, id)
        .await?
        .ok_or_else(|| ServiceError::not_found("User"))?;
    let deleted = user::soft_delete(db, id).await?;
    activity_service::record(
        db,
        ctx,
        ActivityEntry {
            entity_type: activity::ENTITY_USER,
            entity_id: id,
            action: activity::ACTION_DELETE,
            old_data: serde_json::to_value(&existing).ok(),
            new_data: serde_json::to_value(&deleted).ok(),
            changes: None,
        },
    )
    .await;
    info!(user_id = %id, "user_deleted");
    Ok(id)
}

#[instrument(skip(db))]
pub async fn get(db: &DatabaseConnection, id: Uuid) -> Result<UserView, ServiceError> {
    let found = user::find_live_by_id(db, id)
        .await?
        .ok_or_else(|| ServiceError::not_found("User"))?;
    let mut views = populate(db, vec![found]).await?;
    views.pop().ok_or_else(|| ServiceError::not_found("User"))
}

#[instrument(skip(db, page))]
pub async fn list(db: &DatabaseConnection, page: &Pagination, filter: &UserFilterInput) -> Result<Paginated<UserView>, ServiceError> {
    let select = filtered(page.search.as_deref(), filter)?;
    let result = page.fetch(db, select).await?;
    let records = populate(db, result.records).await?;
    Ok(Paginated { pagination_info: result.pagination_info, records })
}

#[instrument(skip(db))]
pub async fn list_all(db: &DatabaseConnection) -> Result<Vec<UserView>, ServiceError> {
    let rows = user::find_live().order_by_desc(user::Column::CreatedAt).all(db).await?;
    populate(db, rows).await
}

#[instrument(skip(db))]
pub async fn list_by_organization(db: &DatabaseConnection, organization_id: Uuid) -> Result<Vec<UserView>, ServiceError> {
    list_where(db, user::Column::OrganizationId.eq(organization_id)).await
}

#[instrument(skip(db))]
pub async fn list_by_department(db: &DatabaseConnection, department_id: Uuid) -> Result<Vec<UserView>, ServiceError> {
    list_where(db, user::Column::DepartmentId.eq(department_id)).await
}

#[instrument(skip(db))]
pub async fn list_by_role(db: &DatabaseConnection, role_id: Uuid) -> Result<Vec<UserView>, ServiceError> {
    list_where(db, user::Column::RoleId.eq(role_id)).await
}

async fn list_where(db: &DatabaseConnection, cond: sea_orm::sea_query::SimpleExpr) -> Result<Vec<UserView>, ServiceError> {
    let rows = user::find_live()
        .filter(cond)
        .order_by_desc(user::Column::CreatedAt)
        .all(db)
        .await?;
    populate(db, rows).await
}

#[instrument(skip(db))]
pub async fn export_csv(db: &DatabaseConnection, filter: &UserFilterInput) -> Result<String, ServiceError> {
    let search = normalize_search(filter.search_string.as_deref())?;
    let rows = filtered(search.as_deref(), filter)?.all(db).await?;
    let views = populate(db, rows).await?;
    let records: Vec<Value> = views
        .iter()
        .map(|v| {
            json!({
                "firstName": v.user.first_name,
                "lastName": v.user.last_name,
                "email": v.user.email,
                "mobileNumber": v.user.mobile_number,
                "gender": v.user.gender,
                "designation": v.user.designation,
                "active": v.user.active,
                "role": v.role.as_ref().map(|r| r.name.clone()),
                "department": v.department.as_ref().map(|d| d.name.clone()),
                "organization": v.organization.as_ref().map(|o| o.organization_name.clone()),
                "location": v.location.as_ref().map(|l| format!("{}, {}", l.city, l.country)),
                "reportingManager": v.reporting_manager.as_ref().map(|m| format!("{} {}", m.first_name, m.last_name)),
                "createdAt": v.user.created_at.to_rfc3339(),
            })
        })
        .collect();
    generate_csv(&records).map_err(|e| ServiceError::Internal(e.to_string()))
}

/// Status filter: `Some(true)` active, `Some(false)` inactive, `None` all.
pub fn parse_status(raw: Option<&str>) -> Result<Option<bool>, ServiceError> {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") | Some("all") => Ok(None),
        Some("active") => Ok(Some(true)),
        Some("inactive") => Ok(Some(false)),
        Some(_) => Err(ServiceError::bad_request("Status must be one of active, inactive, all")),
    }
}

/// Search: first/last name prefix or email substring.
fn filtered(search: Option<&str>, filter: &UserFilterInput) -> Result<Select<user::Entity>, ServiceError> {
    let mut select = user::find_live().order_by_desc(user::Column::CreatedAt);
    if let Some(id) = filter_id(filter.organization_id.as_deref()) {
        select = select.filter(user::Column::OrganizationId.eq(id));
    }
    if let Some(id) = filter_id(filter.department_id.as_deref()) {
        select = select.filter(user::Column::DepartmentId.eq(id));
    }
    if let Some(id) = filter_id(filter.role_id.as_deref()) {
        select = select.filter(user::Column::RoleId.eq(id));
    }
    if let Some(active) = parse_status(filter.status.as_deref())? {
        select = select.filter(user::Column::Active.eq(active));
    }
    if let Some(s) = search {
        let s = escape_like(&s.to_lowercase());
        let prefix = format!("{}%", s);
        select = select.filter(
            Condition::any()
                .add(ilike((user::Entity, user::Column::FirstName), &prefix))
                .add(ilike((user::Entity, user::Column::LastName), &prefix))
                .add(ilike((user::Entity, user::Column::Email), &format!("%{}%", s))),
        );
    }
    Ok(select)
}

/// Attach role, department, organization, location and reporting manager.
pub async fn populate(db: &DatabaseConnection, rows: Vec<user::Model>) -> Result<Vec<UserView>, ServiceError> {
    let roles = refs::roles(db, rows.iter().filter_map(|u| u.role_id)).await?;
    let departments = refs::departments(db, rows.iter().filter_map(|u| u.department_id)).await?;
    let organizations = refs::organizations(db, rows.iter().filter_map(|u| u.organization_id)).await?;
    let locations = refs::locations(db, rows.iter().filter_map(|u| u.location_id)).await?;
    let managers = refs::user_summaries(db, rows.iter().filter_map(|u| u.reporting_manager_id)).await?;

    Ok(rows
        .into_iter()
        .map(|u| UserView {
            role: u.role_id.and_then(|id| roles.get(&id)).map(|r| NamedRef { id: r.id, name: r.name.clone() }),
            department: u
                .department_id
                .and_then(|id| departments.get(&id))
                .map(|d| NamedRef { id: d.id, name: d.name.clone() }),
            organization: u
                .organization_id
                .and_then(|id| organizations.get(&id))
                .map(|o| OrganizationRef { id: o.id, organization_name: o.organization_name.clone() }),
            location: u
                .location_id
                .and_then(|id| locations.get(&id))
                .map(|l| LocationRef { id: l.id, city: l.city.clone(), country: l.country.clone() }),
            reporting_manager: u.reporting_manager_id.and_then(|id| managers.get(&id).cloned()),
            user: u,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;
    use sea_orm::EntityTrait;

    fn valid_input(email: &str) -> UserInput {
        UserInput {
            first_name: Some("Grace".into()),
            last_name: Some("Hopper".into()),
            email: Some(email.into()),
            mobile_number: Some("+1 555 010 9999".into()),
            gender: Some("female".into()),
            ..Default::default()
        }
    }

    #[test]
    fn create_reports_every_invalid_field() {
        let input = UserInput {
            first_name: Some("G".into()),
            email: Some("nope".into()),
            mobile_number: Some("123".into()),
            password: Some("short".into()),
            assets: Some(vec![AssetInput { asset_id: Some("A1".into()), asset_name: None }]),
            organization_details: Some(OrganizationDetailsInput { role: Some("bad".into()), ..Default::default() }),
            ..Default::default()
        };
        match check_input(&input, true).unwrap_err() {
            ServiceError::Validation { message, details: Some(d) } => {
                assert_eq!(message, INVALID_USER);
                for f in ["firstName", "lastName", "email", "mobileNumber", "gender", "password", "assets", "organizationDetails.role"] {
                    assert!(d.get(f).is_some(), "missing detail for {}", f);
                }
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn update_validates_present_fields_only() {
        let ids = check_input(&UserInput { designation: Some("CTO".into()), ..Default::default() }, false).unwrap();
        assert!(ids.role.is_none());
        let clear = UserInput {
            organization_details: Some(OrganizationDetailsInput { department: Some("".into()), ..Default::default() }),
            ..Default::default()
        };
        assert_eq!(check_input(&clear, false).unwrap().department, Some(None));
    }

    #[test]
    fn empty_update_is_detected() {
        assert!(UserInput::default().is_empty());
        assert!(!UserInput { active: Some(false), ..Default::default() }.is_empty());
    }

    #[test]
    fn status_filter_values() {
        assert_eq!(parse_status(Some("Active")).unwrap(), Some(true));
        assert_eq!(parse_status(Some("inactive")).unwrap(), Some(false));
        assert_eq!(parse_status(Some("all")).unwrap(), None);
        assert!(parse_status(Some("sleeping")).is_err());
    }

    #[tokio::test]
    async fn manual_password_setting_needs_a_password() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let mut input = valid_input(&format!("manual_{}@example.com", Uuid::new_v4()));
        input.password_setting = Some(user::PASSWORD_SETTING_MANUAL.into());
        let err = create(&db, &AuditContext::default(), input).await.unwrap_err();
        assert_eq!(err.to_string(), "Password is required for manual password setting");
        Ok(())
    }

    #[tokio::test]
    async fn user_lifecycle_service() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let ctx = AuditContext::default();
        let email = format!("life_{}@Example.com", Uuid::new_v4());

        let created = create(&db, &ctx, valid_input(&email)).await?;
        let id = created.user.user.id;
        let temp = created.temporary_password.expect("generated password");
        assert_eq!(temp.len(), 8);
        let cred = user_credentials::find_by_user(&db, id).await?.expect("credentials");
        assert!(password::verify_password(&temp, &cred.password_hash)?);

        let dup = create(&db, &ctx, valid_input(&email)).await.unwrap_err();
        assert!(matches!(dup, ServiceError::Conflict(_)));

        let self_manager = UserInput {
            organization_details: Some(OrganizationDetailsInput { reporting_manager: Some(id.to_string()), ..Default::default() }),
            ..Default::default()
        };
        let err = update(&db, &ctx, id, self_manager).await.unwrap_err();
        assert_eq!(err.to_string(), "User cannot be their own reporting manager");

        let updated = update(&db, &ctx, id, UserInput { designation: Some("Admiral".into()), ..Default::default() }).await?;
        assert_eq!(updated.user.designation.as_deref(), Some("Admiral"));

        let reset = reset_password(&db, id).await?;
        let cred = user_credentials::find_by_user(&db, id).await?.expect("credentials");
        assert!(password::verify_password(&reset.temporary_password, &cred.password_hash)?);

        let history = activity_service::list_for(&db, activity::ENTITY_USER, id).await?;
        assert!(history.iter().any(|a| a.action == activity::ACTION_UPDATE && a.changes.is_some()));

        delete(&db, &ctx, id).await?;
        assert!(matches!(get(&db, id).await, Err(ServiceError::NotFound(_))));
        user::Entity::delete_by_id(id).exec(&db).await?;
        Ok(())
    }
}
