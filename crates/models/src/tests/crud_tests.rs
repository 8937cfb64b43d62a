use crate::{department, group, group_member, location, organization, organization_location, role, user, user_credentials};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use anyhow::Result;
use chrono::Utc;
use uuid::Uuid;

use super::setup_test_db;

fn new_organization(suffix: &str) -> organization::ActiveModel {
    let now = Utc::now().into();
    organization::ActiveModel {
        id: Set(Uuid::new_v4()),
        organization_name: Set(format!("Org {}", suffix)),
        email: Set(format!("org_{}@example.com", suffix)),
        contact_number: Set(None),
        description: Set(None),
        primary_admin: Set(None),
        created_by: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    }
}

fn new_location() -> location::ActiveModel {
    let now = Utc::now().into();
    location::ActiveModel {
        id: Set(Uuid::new_v4()),
        country: Set("Germany".into()),
        state: Set(Some("Berlin".into())),
        city: Set("Berlin".into()),
        time_zone: Set("Europe/Berlin".into()),
        address_line: Set(None),
        street_address: Set("Unter den Linden 1".into()),
        zip: Set("10117".into()),
        created_by: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    }
}

fn new_user(email: &str, organization_id: Option<Uuid>, department_id: Option<Uuid>) -> user::ActiveModel {
    let now = Utc::now().into();
    user::ActiveModel {
        id: Set(Uuid::new_v4()),
        first_name: Set("Ada".into()),
        middle_name: Set(None),
        last_name: Set("Lovelace".into()),
        email: Set(email.to_string()),
        mobile_number: Set("+44 20 7946 0000".into()),
        gender: Set("female".into()),
        active: Set(true),
        profile_pic: Set(None),
        designation: Set(None),
        role_id: Set(None),
        department_id: Set(department_id),
        organization_id: Set(organization_id),
        location_id: Set(None),
        reporting_manager_id: Set(None),
        password_setting: Set(user::PASSWORD_SETTING_AUTO.into()),
        assets: Set(serde_json::json!([])),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    }
}

/// Organization soft delete hides it from live lookups but keeps the row
#[tokio::test]
async fn test_organization_soft_delete() -> Result<()> {
    let Some(db) = setup_test_db().await else { return Ok(()) };

    let org = new_organization(&Uuid::new_v4().to_string()).insert(&db).await?;
    assert!(organization::find_live_by_id(&db, org.id).await?.is_some());

    organization::soft_delete(&db, org.id).await?;
    assert!(organization::find_live_by_id(&db, org.id).await?.is_none());
    let raw = organization::Entity::find_by_id(org.id).one(&db).await?.expect("row kept");
    assert!(raw.deleted_at.is_some());

    organization::Entity::delete_by_id(org.id).exec(&db).await?;
    Ok(())
}

/// Location links are replaced, not appended, and duplicates collapse
#[tokio::test]
async fn test_organization_location_links() -> Result<()> {
    let Some(db) = setup_test_db().await else { return Ok(()) };

    let org = new_organization(&Uuid::new_v4().to_string()).insert(&db).await?;
    let a = new_location().insert(&db).await?;
    let b = new_location().insert(&db).await?;

    organization_location::replace_for_organization(&db, org.id, &[a.id, a.id, b.id]).await?;
    let mut ids = organization_location::location_ids_for(&db, org.id).await?;
    ids.sort();
    let mut expected = vec![a.id, b.id];
    expected.sort();
    assert_eq!(ids, expected);

    organization_location::replace_for_organization(&db, org.id, &[b.id]).await?;
    assert_eq!(organization_location::location_ids_for(&db, org.id).await?, vec![b.id]);

    organization::Entity::delete_by_id(org.id).exec(&db).await?;
    location::Entity::delete_by_id(a.id).exec(&db).await?;
    location::Entity::delete_by_id(b.id).exec(&db).await?;
    Ok(())
}

/// User, credentials, department and group wiring
#[tokio::test]
async fn test_user_department_group_crud() -> Result<()> {
    let Some(db) = setup_test_db().await else { return Ok(()) };

    let org = new_organization(&Uuid::new_v4().to_string()).insert(&db).await?;
    let now = Utc::now().into();
    let dept = department::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Engineering".into()),
        organization_id: Set(org.id),
        head_of_department: Set(None),
        description: Set(None),
        status: Set(department::STATUS_ACTIVE.into()),
        created_by: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    }
    .insert(&db)
    .await?;

    let email = format!("crud_{}@example.com", Uuid::new_v4());
    let u = new_user(&email, Some(org.id), Some(dept.id)).insert(&db).await?;
    assert_eq!(user::find_live_by_email(&db, &email.to_uppercase()).await?.map(|x| x.id), Some(u.id));

    let cred = user_credentials::upsert_password(&db, u.id, "hash-1".into(), "argon2").await?;
    let cred2 = user_credentials::upsert_password(&db, u.id, "hash-2".into(), "argon2").await?;
    assert_eq!(cred.id, cred2.id);
    assert_eq!(cred2.password_hash, "hash-2");

    let g = group::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(format!("Platform {}", Uuid::new_v4())),
        department_id: Set(dept.id),
        manager_id: Set(u.id),
        description: Set(None),
        created_by: Set(Some(u.id)),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    }
    .insert(&db)
    .await?;
    group_member::replace_for_group(&db, g.id, &[u.id]).await?;
    assert_eq!(group_member::member_ids(&db, g.id).await?, vec![u.id]);

    let deleted = user::soft_delete(&db, u.id).await?;
    assert!(deleted.deleted_at.is_some());
    assert!(user::find_live_by_id(&db, u.id).await?.is_none());

    group::Entity::delete_by_id(g.id).exec(&db).await?;
    user::hard_delete(&db, u.id).await?;
    department::Entity::delete_by_id(dept.id).exec(&db).await?;
    organization::Entity::delete_by_id(org.id).exec(&db).await?;
    Ok(())
}

/// Roles round-trip their permission document
#[tokio::test]
async fn test_role_permissions_document() -> Result<()> {
    let Some(db) = setup_test_db().await else { return Ok(()) };

    let now = Utc::now().into();
    let perms = role::RolePermissions { projects: vec!["VIEW".into()], ..Default::default() };
    let r = role::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(format!("role_{}", Uuid::new_v4())),
        description: Set(None),
        permissions: Set(serde_json::to_value(&perms)?),
        created_by: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&db)
    .await?;

    let found = role::find_by_id(&db, r.id).await?.expect("role exists");
    assert_eq!(found.typed_permissions(), perms);

    role::Entity::delete_by_id(r.id).exec(&db).await?;
    Ok(())
}
