use sea_orm::{entity::prelude::*, DatabaseConnection};
use uuid::Uuid;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// Allowed permission values inside each section.
pub const PERMISSIONS: [&str; 6] = ["CREATE", "EDIT", "VIEW", "DELETE", "EXPORT", "UPDATE"];

/// Permission sections in display order.
pub const SECTIONS: [&str; 4] = ["projects", "task", "users", "settings"];

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "role")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub permissions: Json,
    pub created_by: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Typed view of the `permissions` document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermissions {
    #[serde(default)]
    pub projects: Vec<String>,
    #[serde(default)]
    pub task: Vec<String>,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub settings: Vec<String>,
}

impl RolePermissions {
    pub fn all() -> Self {
        let every: Vec<String> = PERMISSIONS.iter().map(|p| ToString::to_string(p)).collect();
        Self { projects: every.clone(), task: every.clone(), users: every.clone(), settings: every }
    }

    pub fn section(&self, name: &str) -> Option<&[String]> {
        match name {
            "projects" => Some(&self.projects),
            "task" => Some(&self.task),
            "users" => Some(&self.users),
            "settings" => Some(&self.settings),
            _ => None,
        }
    }

    /// Reject values outside [`PERMISSIONS`].
    pub fn validate(&self) -> Result<(), ModelError> {
        for section in SECTIONS {
            let values = self.section(section).unwrap_or_default();
            if let Some(bad) = values.iter().find(|v| !PERMISSIONS.contains(&v.as_str())) {
                return Err(ModelError::Validation(format!("invalid permission '{}' in section '{}'", bad, section)));
            }
        }
        Ok(())
    }

    /// `Projects: CREATE, VIEW | Task: EDIT`, or `N/A` when every section is empty.
    pub fn summary(&self) -> String {
        let parts: Vec<String> = SECTIONS
            .iter()
            .filter_map(|section| {
                let values = self.section(section)?;
                if values.is_empty() {
                    return None;
                }
                let mut label = ToString::to_string(section);
                if let Some(first) = label.get_mut(0..1) {
                    first.make_ascii_uppercase();
                }
                Some(format!("{}: {}", label, values.join(", ")))
            })
            .collect();
        if parts.is_empty() { "N/A".to_string() } else { parts.join(" | ") }
    }
}

impl Model {
    pub fn typed_permissions(&self) -> RolePermissions {
        serde_json::from_value(self.permissions.clone()).unwrap_or_default()
    }
}

pub async fn find_by_id(db: &DatabaseConnection, id: Uuid) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find_by_id(id).one(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_lists_non_empty_sections() {
        let p = RolePermissions {
            projects: vec!["CREATE".into(), "VIEW".into()],
            task: vec!["EDIT".into()],
            ..Default::default()
        };
        assert_eq!(p.summary(), "Projects: CREATE, VIEW | Task: EDIT");
        assert_eq!(RolePermissions::default().summary(), "N/A");
    }

    #[test]
    fn validate_rejects_unknown_permission() {
        let p = RolePermissions { users: vec!["FLY".into()], ..Default::default() };
        assert!(p.validate().is_err());
        assert!(RolePermissions::all().validate().is_ok());
    }
}
