//! First-admin bootstrap used by the `create_admin` binary.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, TransactionTrait};
use serde_json::{json, Value};
use tracing::{info, instrument};
use uuid::Uuid;

use models::role::{self, RolePermissions};
use models::{user, user_credentials};

use crate::auth::password;
use crate::errors::ServiceError;
use crate::validation::lower_eq;

pub const ADMIN_ROLE: &str = "admin";

#[derive(Clone, Debug)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeedOutcome {
    Created(Uuid),
    AlreadyExists(Uuid),
}

/// Role named `name` (case-insensitive), created with every permission when missing.
#[instrument(skip(db))]
pub async fn ensure_role(db: &DatabaseConnection, name: &str) -> Result<role::Model, ServiceError> {
    let existing = role::Entity::find()
        .filter(lower_eq((role::Entity, role::Column::Name), name))
        .one(db)
        .await?;
    if let Some(found) = existing {
        return Ok(found);
    }
    let now = Utc::now();
    let created = role::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(Some("Full access".into())),
        permissions: Set(serde_json::to_value(RolePermissions::all()).unwrap_or(Value::Null)),
        created_by: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await?;
    info!(role_id = %created.id, name, "role_seeded");
    Ok(created)
}

/// Create an active user holding `role_name`; an existing live email is left untouched.
#[instrument(skip(db, seed), fields(email = %seed.email))]
pub async fn ensure_user_with_role(db: &DatabaseConnection, seed: &AdminSeed, role_name: &str) -> Result<SeedOutcome, ServiceError> {
    let email = seed.email.trim().to_lowercase();
    user::validate_email(&email)?;
    if seed.password.chars().count() < 8 {
        return Err(ServiceError::validation("Password must be at least 8 characters"));
    }
    if let Some(existing) = user::find_live_by_email(db, &email).await? {
        info!(user_id = %existing.id, "user already exists");
        return Ok(SeedOutcome::AlreadyExists(existing.id));
    }
    let role = ensure_role(db, role_name).await?;
    let hash = password::hash_password(&seed.password)?;

    let now = Utc::now();
    let txn = db.begin().await?;
    let created = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        first_name: Set(seed.first_name.clone()),
        middle_name: Set(None),
        last_name: Set(seed.last_name.clone()),
        email: Set(email),
        mobile_number: Set("0000000000".into()),
        gender: Set("unspecified".into()),
        active: Set(true),
        profile_pic: Set(None),
        designation: Set(Some("Administrator".into())),
        role_id: Set(Some(role.id)),
        department_id: Set(None),
        organization_id: Set(None),
        location_id: Set(None),
        reporting_manager_id: Set(None),
        password_setting: Set(user::PASSWORD_SETTING_MANUAL.into()),
        assets: Set(json!([])),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        deleted_at: Set(None),
    }
    .insert(&txn)
    .await?;
    user_credentials::upsert_password(&txn, created.id, hash, password::ALGORITHM).await?;
    txn.commit().await?;
    info!(user_id = %created.id, role = role_name, "user_seeded");
    Ok(SeedOutcome::Created(created.id))
}

pub async fn ensure_admin(db: &DatabaseConnection, seed: &AdminSeed) -> Result<SeedOutcome, ServiceError> {
    ensure_user_with_role(db, seed, ADMIN_ROLE).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;

    #[tokio::test]
    async fn short_password_is_rejected_before_any_query() {
        let seed = AdminSeed {
            email: "admin@example.com".into(),
            password: "short".into(),
            first_name: "Ad".into(),
            last_name: "Min".into(),
        };
        let err = ensure_admin(&DatabaseConnection::Disconnected, &seed).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation { .. }));
    }

    #[tokio::test]
    async fn seeding_twice_reports_existing_user() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let seed = AdminSeed {
            email: format!("Seed_{}@Example.com", Uuid::new_v4().simple()),
            password: "Sup3rSecret".into(),
            first_name: "Seed".into(),
            last_name: "Admin".into(),
        };
        let first = ensure_admin(&db, &seed).await?;
        let SeedOutcome::Created(id) = first else { panic!("expected a new user") };
        assert_eq!(ensure_admin(&db, &seed).await?, SeedOutcome::AlreadyExists(id));
        let creds = user_credentials::find_by_user(&db, id).await?;
        assert!(creds.is_some());
        user::hard_delete(&db, id).await?;
        Ok(())
    }
}
