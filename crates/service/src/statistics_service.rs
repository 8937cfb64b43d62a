use sea_orm::{ColumnTrait, DatabaseConnection, PaginatorTrait, QueryFilter};
use serde::Serialize;
use tracing::instrument;

use models::{department, group, user};

use crate::errors::ServiceError;

/// Head counts over live records.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatistics {
    pub total_users: u64,
    pub active_users: u64,
    pub inactive_users: u64,
    pub total_groups: u64,
    pub total_departments: u64,
}

#[instrument(skip(db))]
pub async fn user_statistics(db: &DatabaseConnection) -> Result<UserStatistics, ServiceError> {
    let total_users = user::find_live().count(db).await?;
    let active_users = user::find_live().filter(user::Column::Active.eq(true)).count(db).await?;
    let total_groups = group::find_live().count(db).await?;
    let total_departments = department::find_live().count(db).await?;
    Ok(UserStatistics {
        total_users,
        active_users,
        inactive_users: total_users.saturating_sub(active_users),
        total_groups,
        total_departments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;

    #[tokio::test]
    async fn statistics_are_consistent() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let stats = user_statistics(&db).await?;
        assert_eq!(stats.total_users, stats.active_users + stats.inactive_users);
        Ok(())
    }

    #[test]
    fn serializes_camel_case() {
        let v = serde_json::to_value(UserStatistics::default()).unwrap();
        assert!(v.get("totalDepartments").is_some());
        assert!(v.get("inactiveUsers").is_some());
    }
}
