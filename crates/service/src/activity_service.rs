//! Audit trail for locations, groups and users.
//!
//! Writing an entry never fails the caller: errors are logged and swallowed.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set};
use serde_json::{Map, Value};
use tracing::{instrument, warn};
use uuid::Uuid;

use models::activity;

use crate::errors::ServiceError;

pub const ACTIVITY_LIMIT: u64 = 50;

const SECRET_KEYS: [&str; 3] = ["password", "passwordHash", "temporaryPassword"];

/// Who did it and from where.
#[derive(Clone, Debug, Default)]
pub struct AuditContext {
    pub performed_by: Option<Uuid>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl AuditContext {
    pub fn by(user_id: Uuid) -> Self { Self { performed_by: Some(user_id), ..Default::default() } }
}

/// One entry to be written.
#[derive(Clone, Debug)]
pub struct ActivityEntry<'a> {
    pub entity_type: &'a str,
    pub entity_id: Uuid,
    pub action: &'a str,
    pub old_data: Option<Value>,
    pub new_data: Option<Value>,
    pub changes: Option<Value>,
}

#[instrument(skip(db, ctx, entry), fields(entity_type = entry.entity_type, entity_id = %entry.entity_id, action = entry.action))]
pub async fn record(db: &DatabaseConnection, ctx: &AuditContext, entry: ActivityEntry<'_>) {
    let am = activity::ActiveModel {
        id: Set(Uuid::new_v4()),
        entity_type: Set(entry.entity_type.to_string()),
        entity_id: Set(entry.entity_id),
        action: Set(entry.action.to_string()),
        performed_by: Set(ctx.performed_by),
        old_data: Set(entry.old_data.map(scrub)),
        new_data: Set(entry.new_data.map(scrub)),
        changes: Set(entry.changes.map(scrub)),
        ip_address: Set(ctx.ip_address.clone()),
        user_agent: Set(ctx.user_agent.clone()),
        created_at: Set(Utc::now().into()),
    };
    if let Err(e) = am.insert(db).await {
        warn!(error = %e, "failed to write activity entry");
    }
}

/// Latest entries for one record, newest first.
#[instrument(skip(db))]
pub async fn list_for(db: &DatabaseConnection, entity_type: &str, entity_id: Uuid) -> Result<Vec<activity::Model>, ServiceError> {
    Ok(activity::Entity::find()
        .filter(activity::Column::EntityType.eq(entity_type))
        .filter(activity::Column::EntityId.eq(entity_id))
        .order_by_desc(activity::Column::CreatedAt)
        .limit(ACTIVITY_LIMIT)
        .all(db)
        .await?)
}

/// Field-by-field changes between two JSON objects, as `{field: {<from>: old, <to>: new}}`.
/// Fields that are equal, or absent from `new`, are skipped. `None` when nothing changed.
pub fn diff(old: &Value, new: &Value, labels: (&str, &str)) -> Option<Value> {
    let (Some(old), Some(new)) = (old.as_object(), new.as_object()) else { return None };
    let mut changes = Map::new();
    for (key, new_value) in new {
        if matches!(key.as_str(), "updatedAt" | "createdAt") || SECRET_KEYS.contains(&key.as_str()) {
            continue;
        }
        let old_value = old.get(key).unwrap_or(&Value::Null);
        if old_value != new_value {
            let mut pair = Map::new();
            pair.insert(labels.0.to_string(), old_value.clone());
            pair.insert(labels.1.to_string(), new_value.clone());
            changes.insert(key.clone(), Value::Object(pair));
        }
    }
    (!changes.is_empty()).then_some(Value::Object(changes))
}

/// Drop password material from a snapshot.
fn scrub(mut value: Value) -> Value {
    if let Some(obj) = value.as_object_mut() {
        for key in SECRET_KEYS {
            obj.remove(key);
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn diff_reports_changed_fields_only() {
        let old = json!({"city": "Berlin", "zip": "10117", "updatedAt": "a"});
        let new = json!({"city": "Munich", "zip": "10117", "updatedAt": "b"});
        assert_eq!(diff(&old, &new, ("from", "to")), Some(json!({"city": {"from": "Berlin", "to": "Munich"}})));
        assert_eq!(diff(&old, &old, ("from", "to")), None);
    }

    #[test]
    fn diff_never_exposes_passwords() {
        let changes = diff(&json!({}), &json!({"password": "x", "email": "a@b.co"}), ("old", "new")).unwrap();
        assert!(changes.get("password").is_none());
        assert_eq!(changes["email"]["new"], "a@b.co");
    }

    #[test]
    fn scrub_removes_secret_keys() {
        let v = scrub(json!({"email": "a@b.co", "password": "x", "temporaryPassword": "y"}));
        assert_eq!(v, json!({"email": "a@b.co"}));
    }
}
