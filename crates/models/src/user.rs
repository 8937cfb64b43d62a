use sea_orm::{entity::prelude::*, DatabaseConnection, Set};
use uuid::Uuid;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors;
use crate::{department, location, organization, role};

pub const PASSWORD_SETTING_MANUAL: &str = "manual";
pub const PASSWORD_SETTING_AUTO: &str = "auto-generate";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static MOBILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9+\-\s()]{10,}$").expect("valid mobile regex"));

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    pub mobile_number: String,
    pub gender: String,
    pub active: bool,
    pub profile_pic: Option<String>,
    pub designation: Option<String>,
    pub role_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub reporting_manager_id: Option<Uuid>,
    pub password_setting: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub assets: Json,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

/// Asset handed out to a user (laptop, badge, ...).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub asset_id: String,
    pub asset_name: String,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Role,
    Department,
    Organization,
    Location,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Role => Entity::belongs_to(role::Entity).from(Column::RoleId).to(role::Column::Id).into(),
            Relation::Department => Entity::belongs_to(department::Entity)
                .from(Column::DepartmentId)
                .to(department::Column::Id)
                .into(),
            Relation::Organization => Entity::belongs_to(organization::Entity)
                .from(Column::OrganizationId)
                .to(organization::Column::Id)
                .into(),
            Relation::Location => Entity::belongs_to(location::Entity)
                .from(Column::LocationId)
                .to(location::Column::Id)
                .into(),
        }
    }
}

impl Related<role::Entity> for Entity {
    fn to() -> RelationDef { Relation::Role.def() }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn typed_assets(&self) -> Vec<Asset> {
        serde_json::from_value(self.assets.clone()).unwrap_or_default()
    }
}

pub fn validate_email(email: &str) -> Result<(), errors::ModelError> {
    if !EMAIL_RE.is_match(email.trim()) {
        return Err(errors::ModelError::Validation("Invalid email format".into()));
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), errors::ModelError> {
    if name.trim().chars().count() < 2 {
        return Err(errors::ModelError::Validation("First name must be at least 2 characters".into()));
    }
    Ok(())
}

pub fn validate_mobile(mobile: &str) -> Result<(), errors::ModelError> {
    if !MOBILE_RE.is_match(mobile) {
        return Err(errors::ModelError::Validation("Invalid mobile number format".into()));
    }
    Ok(())
}

pub fn validate_password_setting(setting: &str) -> Result<(), errors::ModelError> {
    match setting {
        PASSWORD_SETTING_MANUAL | PASSWORD_SETTING_AUTO => Ok(()),
        other => Err(errors::ModelError::Validation(format!("Invalid password setting '{}'", other))),
    }
}

pub fn find_live() -> Select<Entity> {
    Entity::find().filter(Column::DeletedAt.is_null())
}

pub async fn find_live_by_id(db: &DatabaseConnection, id: Uuid) -> Result<Option<Model>, errors::ModelError> {
    Ok(find_live().filter(Column::Id.eq(id)).one(db).await?)
}

pub async fn find_live_by_email(db: &DatabaseConnection, email: &str) -> Result<Option<Model>, errors::ModelError> {
    Ok(find_live()
        .filter(Column::Email.eq(email.trim().to_lowercase()))
        .one(db)
        .await?)
}

pub async fn soft_delete(db: &DatabaseConnection, id: Uuid) -> Result<Model, errors::ModelError> {
    let mut found: ActiveModel = find_live_by_id(db, id)
        .await?
        .ok_or_else(|| errors::ModelError::NotFound("user".into()))?
        .into();
    let now = Utc::now();
    found.deleted_at = Set(Some(now.into()));
    found.updated_at = Set(now.into());
    Ok(found.update(db).await?)
}

pub async fn hard_delete(db: &DatabaseConnection, id: Uuid) -> Result<(), errors::ModelError> {
    Entity::delete_by_id(id).exec(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_format() {
        assert!(validate_email("ann@example.com").is_ok());
        assert!(validate_email("ann@example").is_err());
        assert!(validate_email("ann smith@example.com").is_err());
    }

    #[test]
    fn mobile_format() {
        assert!(validate_mobile("+1 (555) 010-9999").is_ok());
        assert!(validate_mobile("12345").is_err());
        assert!(validate_mobile("555-CALL-NOW1").is_err());
    }

    #[test]
    fn name_needs_two_chars() {
        assert!(validate_name("Al").is_ok());
        assert!(validate_name(" A ").is_err());
    }

    #[test]
    fn password_setting_values() {
        assert!(validate_password_setting("manual").is_ok());
        assert!(validate_password_setting("auto-generate").is_ok());
        assert!(validate_password_setting("sometimes").is_err());
    }
}
