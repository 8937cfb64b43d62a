use std::collections::BTreeMap;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use common::types::Paginated;
use models::project::{self, slugify};
use models::task::{self, TaskStatus};

use crate::errors::ServiceError;
use crate::pagination::Pagination;
use crate::validation::{ilike, FieldErrors};

const TITLE_MIN: usize = 3;
const CODE_LEN: std::ops::RangeInclusive<usize> = 2..=10;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub slug: Option<String>,
    pub code: Option<String>,
    pub active: Option<bool>,
    pub logo: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: project::Model,
    /// Live task count per status, every status present.
    pub task_counts: BTreeMap<String, u64>,
}

/// Normalized title, slug and code; `None` where the input had nothing.
#[derive(Debug, Default, PartialEq)]
struct ProjectFields {
    title: Option<String>,
    slug: Option<String>,
    code: Option<String>,
}

fn check_input(input: &ProjectInput, creating: bool) -> Result<ProjectFields, ServiceError> {
    let mut errs = FieldErrors::new();
    let title = input.title.as_deref().map(str::trim).map(String::from);
    match &title {
        Some(t) => errs.check(t.chars().count() >= TITLE_MIN, "title", "Title must be at least 3 characters"),
        None if creating => errs.add("title", "Title is required"),
        None => {}
    }
    let code = input.code.as_deref().map(|c| c.trim().to_uppercase());
    match &code {
        Some(c) => errs.check(
            CODE_LEN.contains(&c.chars().count()) && c.chars().all(|ch| ch.is_ascii_alphanumeric()),
            "code",
            "Code must be 2 to 10 letters or digits",
        ),
        None if creating => errs.add("code", "Code is required"),
        None => {}
    }
    let slug = match input.slug.as_deref().map(slugify) {
        Some(s) => Some(s),
        None if creating => title.as_deref().map(slugify),
        None => None,
    };
    if let Some(s) = &slug {
        errs.check(!s.is_empty(), "slug", "Slug must contain letters or digits");
    }
    errs.finish("Project details provided do not meet the required validation criteria")?;
    Ok(ProjectFields { title, slug, code })
}

async fn ensure_unique(db: &DatabaseConnection, fields: &ProjectFields, except: Option<Uuid>) -> Result<(), ServiceError> {
    if let Some(slug) = &fields.slug {
        let mut q = project::Entity::find().filter(project::Column::Slug.eq(slug.as_str()));
        if let Some(id) = except {
            q = q.filter(project::Column::Id.ne(id));
        }
        if q.one(db).await?.is_some() {
            return Err(ServiceError::conflict("Project with this slug already exists"));
        }
    }
    if let Some(code) = &fields.code {
        let mut q = project::Entity::find().filter(project::Column::Code.eq(code.as_str()));
        if let Some(id) = except {
            q = q.filter(project::Column::Id.ne(id));
        }
        if q.one(db).await?.is_some() {
            return Err(ServiceError::conflict("Project with this code already exists"));
        }
    }
    Ok(())
}

#[instrument(skip(db, input))]
pub async fn create(db: &DatabaseConnection, caller: Uuid, input: ProjectInput) -> Result<project::Model, ServiceError> {
    let fields = check_input(&input, true)?;
    ensure_unique(db, &fields, None).await?;
    let now = Utc::now();
    let created = project::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(fields.title.unwrap_or_default()),
        description: Set(input.description),
        slug: Set(fields.slug.unwrap_or_default()),
        code: Set(fields.code.unwrap_or_default()),
        active: Set(input.active.unwrap_or(true)),
        logo: Set(input.logo),
        timezone: Set(input.timezone),
        task_seq: Set(0),
        created_by: Set(Some(caller)),
        updated_by: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        deleted_at: Set(None),
    }
    .insert(db)
    .await?;
    info!(project_id = %created.id, code = %created.code, "project_created");
    Ok(created)
}

/// Search on title and code; `active` filters by status.
#[instrument(skip(db))]
pub async fn list(db: &DatabaseConnection, page: &Pagination, active: Option<bool>) -> Result<Paginated<project::Model>, ServiceError> {
    let mut select = project::find_live().order_by_desc(project::Column::CreatedAt);
    if let Some(active) = active {
        select = select.filter(project::Column::Active.eq(active));
    }
    if let Some(pattern) = page.like_pattern() {
        select = select.filter(
            Condition::any()
                .add(ilike((project::Entity, project::Column::Title), &pattern))
                .add(ilike((project::Entity, project::Column::Code), &pattern)),
        );
    }
    page.fetch(db, select).await
}

#[instrument(skip(db))]
pub async fn get(db: &DatabaseConnection, id: Uuid) -> Result<ProjectDetail, ServiceError> {
    let found = project::find_live_by_id(db, id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Project"))?;
    let rows: Vec<(String, i64)> = task::find_live()
        .select_only()
        .column(task::Column::Status)
        .column_as(Expr::col(task::Column::Id).count(), "count")
        .filter(task::Column::ProjectId.eq(id))
        .group_by(task::Column::Status)
        .into_tuple()
        .all(db)
        .await?;
    let mut task_counts: BTreeMap<String, u64> = TaskStatus::ALL.iter().map(|s| (s.to_string(), 0)).collect();
    for (status, n) in rows {
        task_counts.insert(status, n.max(0) as u64);
    }
    Ok(ProjectDetail { project: found, task_counts })
}

#[instrument(skip(db, input))]
pub async fn update(db: &DatabaseConnection, caller: Uuid, id: Uuid, input: ProjectInput) -> Result<project::Model, ServiceError> {
    let fields = check_input(&input, false)?;
    let existing = project::find_live_by_id(db, id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Project"))?;
    ensure_unique(db, &fields, Some(id)).await?;
    // issued refIds embed the code
    if existing.task_seq > 0 && fields.code.as_deref().is_some_and(|c| c != existing.code) {
        return Err(ServiceError::conflict("Project code cannot be changed once tasks have been created"));
    }

    let mut am: project::ActiveModel = existing.into();
    if let Some(v) = fields.title {
        am.title = Set(v);
    }
    if let Some(v) = fields.slug {
        am.slug = Set(v);
    }
    if let Some(v) = fields.code {
        am.code = Set(v);
    }
    if let Some(v) = input.description {
        am.description = Set(Some(v));
    }
    if let Some(v) = input.active {
        am.active = Set(v);
    }
    if let Some(v) = input.logo {
        am.logo = Set(Some(v));
    }
    if let Some(v) = input.timezone {
        am.timezone = Set(Some(v));
    }
    am.updated_by = Set(Some(caller));
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(project_id = %id, "project_updated");
    Ok(updated)
}

/// Returns the success message for the new state.
#[instrument(skip(db))]
pub async fn set_status(db: &DatabaseConnection, caller: Uuid, id: Uuid, active: bool) -> Result<(project::Model, String), ServiceError> {
    let existing = project::find_live_by_id(db, id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Project"))?;
    let label = if active { "active" } else { "inactive" };
    if existing.active == active {
        return Err(ServiceError::conflict(format!("Project is already {}", label)));
    }
    let mut am: project::ActiveModel = existing.into();
    am.active = Set(active);
    am.updated_by = Set(Some(caller));
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(project_id = %id, active, "project_status_changed");
    Ok((updated, format!("Project has been successfully marked as {}.", label)))
}

#[instrument(skip(db))]
pub async fn delete(db: &DatabaseConnection, id: Uuid) -> Result<(), ServiceError> {
    let existing = project::find_live_by_id(db, id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Project"))?;
    let live_tasks = task::find_live().filter(task::Column::ProjectId.eq(id)).count(db).await?;
    if live_tasks > 0 {
        return Err(ServiceError::conflict("Cannot delete the project because tasks are already assigned to it."));
    }
    let mut am: project::ActiveModel = existing.into();
    let now = Utc::now();
    am.deleted_at = Set(Some(now.into()));
    am.updated_at = Set(now.into());
    am.update(db).await?;
    info!(project_id = %id, "project_deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;

    #[test]
    fn create_derives_slug_and_uppercases_code() {
        let input = ProjectInput { title: Some("Mobile App".into()), code: Some("mob1".into()), ..Default::default() };
        let fields = check_input(&input, true).unwrap();
        assert_eq!(fields.slug.as_deref(), Some("mobile-app"));
        assert_eq!(fields.code.as_deref(), Some("MOB1"));
    }

    #[test]
    fn bad_code_and_short_title_are_rejected() {
        let input = ProjectInput { title: Some("ab".into()), code: Some("A-1".into()), ..Default::default() };
        match check_input(&input, true).unwrap_err() {
            ServiceError::Validation { details: Some(d), .. } => {
                assert!(d.get("title").is_some());
                assert!(d.get("code").is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
        let long = ProjectInput { code: Some("ABCDEFGHIJK".into()), ..Default::default() };
        assert!(check_input(&long, false).is_err());
    }

    #[test]
    fn update_leaves_missing_fields_alone() {
        assert_eq!(check_input(&ProjectInput::default(), false).unwrap(), ProjectFields::default());
    }

    #[tokio::test]
    async fn status_toggle_and_delete() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let caller = Uuid::new_v4();
        let code = format!("P{}", &Uuid::new_v4().simple().to_string()[..6]);
        let created = create(
            &db,
            caller,
            ProjectInput { title: Some(format!("Project {}", code)), code: Some(code.clone()), ..Default::default() },
        )
        .await?;
        assert!(created.active);

        let err = set_status(&db, caller, created.id, true).await.unwrap_err();
        assert_eq!(err.to_string(), "Project is already active");
        let (_, message) = set_status(&db, caller, created.id, false).await?;
        assert_eq!(message, "Project has been successfully marked as inactive.");

        let detail = get(&db, created.id).await?;
        assert_eq!(detail.task_counts.get("TODO"), Some(&0));

        delete(&db, created.id).await?;
        assert!(matches!(get(&db, created.id).await, Err(ServiceError::NotFound(_))));
        project::Entity::delete_by_id(created.id).exec(&db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn search_treats_wildcards_literally() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let caller = Uuid::new_v4();
        let code = format!("W{}", &Uuid::new_v4().simple().to_string()[..6]).to_uppercase();
        let created = create(&db, caller, ProjectInput { title: Some(format!("Wild {}", code)), code: Some(code.clone()), ..Default::default() }).await?;

        let mut masked = code.clone();
        masked.replace_range(3..4, "_");
        let search = |s: String| Pagination::from_query(&crate::pagination::PageQuery { search_string: Some(s), ..Default::default() });
        let hits = list(&db, &search(masked)?, None).await?;
        assert!(hits.records.iter().all(|p| p.id != created.id));
        let hits = list(&db, &search(code.to_lowercase())?, None).await?;
        assert!(hits.records.iter().any(|p| p.id == created.id));

        project::Entity::delete_by_id(created.id).exec(&db).await?;
        Ok(())
    }
}
