use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use common::types::Paginated;
use models::task::{self, TaskPriority, TaskStatus};
use models::{project, task_assignee};

use crate::errors::ServiceError;
use crate::pagination::Pagination;
use crate::refs::{self, UserSummary};
use crate::validation::{ilike, parse_id, FieldErrors};

const TITLE_MIN: usize = 3;
const INVALID_TASK: &str = "Task details provided do not meet the required validation criteria";

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    /// RFC 3339 timestamp or `YYYY-MM-DD`.
    pub due_date: Option<String>,
    pub project_id: Option<String>,
    pub is_sub_task: Option<bool>,
    pub assignees: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default)]
pub struct TaskFilter {
    pub project_id: Option<Uuid>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assignee_id: Option<Uuid>,
}

fn blank(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

impl TaskFilter {
    /// Parse raw query values; malformed values are a 400.
    pub fn parse(
        project_id: Option<&str>,
        status: Option<&str>,
        priority: Option<&str>,
        assignee_id: Option<&str>,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            project_id: blank(project_id).map(|s| parse_id(s, "Project")).transpose()?,
            status: blank(status)
                .map(|s| s.parse::<TaskStatus>().map_err(|e| ServiceError::bad_request(e.to_string())))
                .transpose()?,
            priority: blank(priority)
                .map(|s| s.parse::<TaskPriority>().map_err(|e| ServiceError::bad_request(e.to_string())))
                .transpose()?,
            assignee_id: blank(assignee_id).map(|s| parse_id(s, "User")).transpose()?,
        })
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssigneeView {
    #[serde(flatten)]
    pub user: UserSummary,
    pub assigned_at: DateTime<FixedOffset>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    #[serde(flatten)]
    pub task: task::Model,
    pub assignees: Vec<AssigneeView>,
}

/// Parsed task fields; `None` where the input had nothing.
#[derive(Debug, Default)]
struct TaskFields {
    title: Option<String>,
    status: Option<TaskStatus>,
    priority: Option<TaskPriority>,
    due_date: Option<DateTime<FixedOffset>>,
    project_id: Option<Uuid>,
    assignees: Option<Vec<Uuid>>,
}

pub fn parse_due_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().fixed_offset())
}

fn check_input(input: &TaskInput, creating: bool, today: NaiveDate) -> Result<TaskFields, ServiceError> {
    let mut errs = FieldErrors::new();
    let mut fields = TaskFields::default();

    match input.title.as_deref().map(str::trim) {
        Some(t) => {
            errs.check(t.chars().count() >= TITLE_MIN, "title", "Min 3 letters required");
            fields.title = Some(t.to_string());
        }
        None if creating => errs.add("title", "Min 3 letters required"),
        None => {}
    }
    match input.project_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => match Uuid::parse_str(raw) {
            Ok(id) => fields.project_id = Some(id),
            Err(_) => errs.add("projectId", "Invalid Project ID format"),
        },
        None if creating => errs.add("projectId", "Project is required"),
        None => {}
    }
    match input.due_date.as_deref() {
        Some(raw) => match parse_due_date(raw) {
            Some(due) if due.date_naive() >= today => fields.due_date = Some(due),
            Some(_) => errs.add("dueDate", "Due date must between today and the future date."),
            None => errs.add("dueDate", "Invalid due date"),
        },
        None if creating => errs.add("dueDate", "Due date is required"),
        None => {}
    }
    if let Some(raw) = input.status.as_deref() {
        match raw.parse::<TaskStatus>() {
            Ok(s) => fields.status = Some(s),
            Err(_) => errs.add("status", format!("Status must be one of {}", join_all(TaskStatus::ALL.iter().map(|s| s.as_str())))),
        }
    }
    if let Some(raw) = input.priority.as_deref() {
        match raw.parse::<TaskPriority>() {
            Ok(p) => fields.priority = Some(p),
            Err(_) => errs.add("priority", format!("Priority must be one of {}", join_all(TaskPriority::ALL.iter().map(|p| p.as_str())))),
        }
    }
    if let Some(list) = &input.assignees {
        let parsed: Vec<Uuid> = list.iter().filter_map(|s| Uuid::parse_str(s.trim()).ok()).collect();
        errs.check(parsed.len() == list.len(), "assignees", "Invalid User ID format");
        fields.assignees = Some(parsed);
    }

    errs.finish(INVALID_TASK)?;
    Ok(fields)
}

fn join_all<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values.collect::<Vec<_>>().join(", ")
}

/// Insert missing `(task, user)` links; existing ones are left alone.
async fn link_assignees<C: ConnectionTrait>(db: &C, task_id: Uuid, user_ids: &[Uuid]) -> Result<usize, ServiceError> {
    let existing: Vec<Uuid> = task_assignee::Entity::find()
        .filter(task_assignee::Column::TaskId.eq(task_id))
        .all(db)
        .await?
        .into_iter()
        .map(|a| a.user_id)
        .collect();
    let mut added = 0;
    let mut seen = existing;
    for user_id in user_ids {
        if seen.contains(user_id) {
            continue;
        }
        seen.push(*user_id);
        task_assignee::ActiveModel {
            id: Set(Uuid::new_v4()),
            task_id: Set(task_id),
            user_id: Set(*user_id),
            assigned_at: Set(Utc::now().into()),
        }
        .insert(db)
        .await?;
        added += 1;
    }
    Ok(added)
}

async fn ensure_users(db: &DatabaseConnection, ids: &[Uuid]) -> Result<(), ServiceError> {
    let found = refs::users(db, ids.iter().copied()).await?;
    if ids.iter().any(|id| !found.contains_key(id)) {
        return Err(ServiceError::not_found("User"));
    }
    Ok(())
}

#[instrument(skip(db, input))]
pub async fn create(db: &DatabaseConnection, caller: Uuid, input: TaskInput) -> Result<TaskView, ServiceError> {
    let fields = check_input(&input, true, Utc::now().date_naive())?;
    let project_id = fields.project_id.ok_or_else(|| ServiceError::validation(INVALID_TASK))?;
    let due_date = fields.due_date.ok_or_else(|| ServiceError::validation(INVALID_TASK))?;
    if project::find_live_by_id(db, project_id).await?.is_none() {
        return Err(ServiceError::not_found("Project"));
    }
    let assignees = fields.assignees.unwrap_or_default();
    ensure_users(db, &assignees).await?;

    let status = fields.status.unwrap_or(TaskStatus::Todo);
    let now = Utc::now();
    let txn = db.begin().await?;
    let numbered = project::next_task_seq(&txn, project_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Project"))?;
    let created = task::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(fields.title.unwrap_or_default()),
        ref_id: Set(task::ref_id(&numbered.code, numbered.task_seq.max(1) as u64)),
        description: Set(input.description),
        status: Set(status.to_string()),
        priority: Set(fields.priority.unwrap_or(TaskPriority::Low).as_str().to_string()),
        due_date: Set(due_date),
        project_id: Set(project_id),
        created_by: Set(Some(caller)),
        updated_by: Set(None),
        is_sub_task: Set(input.is_sub_task.unwrap_or(false)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        completed_at: Set((status == TaskStatus::Completed).then(|| now.into())),
        deleted_at: Set(None),
    }
    .insert(&txn)
    .await?;
    link_assignees(&txn, created.id, &assignees).await?;
    txn.commit().await?;

    info!(task_id = %created.id, ref_id = %created.ref_id, "task_created");
    get(db, created.id).await
}

/// Search on title and refId.
#[instrument(skip(db))]
pub async fn list(db: &DatabaseConnection, page: &Pagination, filter: &TaskFilter) -> Result<Paginated<TaskView>, ServiceError> {
    let mut select = task::find_live().order_by_desc(task::Column::CreatedAt);
    if let Some(id) = filter.project_id {
        select = select.filter(task::Column::ProjectId.eq(id));
    }
    if let Some(status) = filter.status {
        select = select.filter(task::Column::Status.eq(status.as_str()));
    }
    if let Some(priority) = filter.priority {
        select = select.filter(task::Column::Priority.eq(priority.as_str()));
    }
    if let Some(user_id) = filter.assignee_id {
        let task_ids: Vec<Uuid> = task_assignee::Entity::find()
            .select_only()
            .column(task_assignee::Column::TaskId)
            .filter(task_assignee::Column::UserId.eq(user_id))
            .into_tuple()
            .all(db)
            .await?;
        select = select.filter(task::Column::Id.is_in(task_ids));
    }
    if let Some(pattern) = page.like_pattern() {
        select = select.filter(
            Condition::any()
                .add(ilike((task::Entity, task::Column::Title), &pattern))
                .add(ilike((task::Entity, task::Column::RefId), &pattern)),
        );
    }
    let result = page.fetch(db, select).await?;
    let records = with_assignees(db, result.records).await?;
    Ok(Paginated { pagination_info: result.pagination_info, records })
}

/// Live task count per status, every status present.
#[instrument(skip(db))]
pub async fn stats(db: &DatabaseConnection, project_id: Option<Uuid>) -> Result<BTreeMap<String, u64>, ServiceError> {
    let mut select = task::find_live()
        .select_only()
        .column(task::Column::Status)
        .column_as(Expr::col(task::Column::Id).count(), "count");
    if let Some(id) = project_id {
        select = select.filter(task::Column::ProjectId.eq(id));
    }
    let rows: Vec<(String, i64)> = select.group_by(task::Column::Status).into_tuple().all(db).await?;
    let mut counts: BTreeMap<String, u64> = TaskStatus::ALL.iter().map(|s| (s.to_string(), 0)).collect();
    for (status, n) in rows {
        counts.insert(status, n.max(0) as u64);
    }
    Ok(counts)
}

/// Live tasks past due and not completed become OVER_DUE. Returns how many changed.
#[instrument(skip(db))]
pub async fn mark_overdue(db: &DatabaseConnection) -> Result<u64, ServiceError> {
    let now: DateTime<FixedOffset> = Utc::now().into();
    let res = task::Entity::update_many()
        .col_expr(task::Column::Status, Expr::value(TaskStatus::OverDue.as_str()))
        .col_expr(task::Column::UpdatedAt, Expr::value(now))
        .filter(task::Column::DeletedAt.is_null())
        .filter(task::Column::DueDate.lt(now))
        .filter(task::Column::Status.is_not_in([TaskStatus::Completed.as_str(), TaskStatus::OverDue.as_str()]))
        .exec(db)
        .await?;
    info!(count = res.rows_affected, "tasks_marked_overdue");
    Ok(res.rows_affected)
}

#[instrument(skip(db))]
pub async fn list_archived(db: &DatabaseConnection, page: &Pagination) -> Result<Paginated<TaskView>, ServiceError> {
    let mut select = task::Entity::find()
        .filter(task::Column::DeletedAt.is_not_null())
        .order_by_desc(task::Column::DeletedAt);
    if let Some(pattern) = page.like_pattern() {
        select = select.filter(
            Condition::any()
                .add(ilike((task::Entity, task::Column::Title), &pattern))
                .add(ilike((task::Entity, task::Column::RefId), &pattern)),
        );
    }
    let result = page.fetch(db, select).await?;
    let records = with_assignees(db, result.records).await?;
    Ok(Paginated { pagination_info: result.pagination_info, records })
}

#[instrument(skip(db))]
pub async fn get(db: &DatabaseConnection, id: Uuid) -> Result<TaskView, ServiceError> {
    let found = task::find_live_by_id(db, id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Task"))?;
    let mut views = with_assignees(db, vec![found]).await?;
    views.pop().ok_or_else(|| ServiceError::not_found("Task"))
}

#[instrument(skip(db, input))]
pub async fn update(db: &DatabaseConnection, caller: Uuid, id: Uuid, input: TaskInput) -> Result<TaskView, ServiceError> {
    let fields = check_input(&input, false, Utc::now().date_naive())?;
    let existing = task::find_live_by_id(db, id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Task"))?;
    // refIds are minted per project, so a task never changes project
    if fields.project_id.is_some_and(|p| p != existing.project_id) {
        return Err(ServiceError::bad_request("Task cannot be moved to another project"));
    }
    if let Some(ids) = &fields.assignees {
        ensure_users(db, ids).await?;
    }

    let now = Utc::now();
    let mut am: task::ActiveModel = existing.into();
    if let Some(v) = fields.title {
        am.title = Set(v);
    }
    if let Some(v) = input.description {
        am.description = Set(Some(v));
    }
    if let Some(v) = fields.status {
        am.status = Set(v.to_string());
        am.completed_at = Set((v == TaskStatus::Completed).then(|| now.into()));
    }
    if let Some(v) = fields.priority {
        am.priority = Set(v.as_str().to_string());
    }
    if let Some(v) = fields.due_date {
        am.due_date = Set(v);
    }
    if let Some(v) = input.is_sub_task {
        am.is_sub_task = Set(v);
    }
    am.updated_by = Set(Some(caller));
    am.updated_at = Set(now.into());

    let txn = db.begin().await?;
    am.update(&txn).await?;
    if let Some(ids) = &fields.assignees {
        link_assignees(&txn, id, ids).await?;
    }
    txn.commit().await?;
    info!(task_id = %id, "task_updated");
    get(db, id).await
}

/// COMPLETED stamps `completedAt`; any other status clears it.
#[instrument(skip(db))]
pub async fn update_status(db: &DatabaseConnection, caller: Uuid, id: Uuid, raw_status: &str) -> Result<TaskView, ServiceError> {
    let status: TaskStatus = raw_status.parse()?;
    let existing = task::find_live_by_id(db, id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Task"))?;
    let now = Utc::now();
    let mut am: task::ActiveModel = existing.into();
    am.status = Set(status.to_string());
    am.completed_at = Set((status == TaskStatus::Completed).then(|| now.into()));
    am.updated_by = Set(Some(caller));
    am.updated_at = Set(now.into());
    am.update(db).await?;
    info!(task_id = %id, status = %status, "task_status_updated");
    get(db, id).await
}

#[instrument(skip(db))]
pub async fn archive(db: &DatabaseConnection, id: Uuid) -> Result<(), ServiceError> {
    let existing = task::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Task"))?;
    if existing.deleted_at.is_some() {
        return Err(ServiceError::conflict("Task is already archived"));
    }
    let now = Utc::now();
    let mut am: task::ActiveModel = existing.into();
    am.deleted_at = Set(Some(now.into()));
    am.updated_at = Set(now.into());
    am.update(db).await?;
    info!(task_id = %id, "task_archived");
    Ok(())
}

#[instrument(skip(db))]
pub async fn restore(db: &DatabaseConnection, id: Uuid) -> Result<TaskView, ServiceError> {
    let existing = task::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Task"))?;
    if existing.deleted_at.is_none() {
        return Err(ServiceError::conflict("Task is already restored"));
    }
    let mut am: task::ActiveModel = existing.into();
    am.deleted_at = Set(None);
    am.updated_at = Set(Utc::now().into());
    am.update(db).await?;
    info!(task_id = %id, "task_restored");
    get(db, id).await
}

#[instrument(skip(db, user_ids))]
pub async fn add_assignees(db: &DatabaseConnection, id: Uuid, user_ids: &[String]) -> Result<TaskView, ServiceError> {
    if user_ids.is_empty() {
        return Err(ServiceError::validation("Users required"));
    }
    let ids = user_ids.iter().map(|s| parse_id(s, "User")).collect::<Result<Vec<_>, _>>()?;
    if task::find_live_by_id(db, id).await?.is_none() {
        return Err(ServiceError::not_found("Task"));
    }
    ensure_users(db, &ids).await?;
    let added = link_assignees(db, id, &ids).await?;
    info!(task_id = %id, added, "task_assignees_added");
    get(db, id).await
}

#[instrument(skip(db))]
pub async fn remove_assignee(db: &DatabaseConnection, id: Uuid, user_id: Uuid) -> Result<(), ServiceError> {
    let res = task_assignee::Entity::delete_many()
        .filter(task_assignee::Column::TaskId.eq(id))
        .filter(task_assignee::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    if res.rows_affected == 0 {
        return Err(ServiceError::not_found("Task assignment"));
    }
    info!(task_id = %id, user_id = %user_id, "task_assignee_removed");
    Ok(())
}

async fn with_assignees(db: &DatabaseConnection, rows: Vec<task::Model>) -> Result<Vec<TaskView>, ServiceError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = rows.iter().map(|t| t.id).collect();
    let links = task_assignee::Entity::find()
        .filter(task_assignee::Column::TaskId.is_in(ids))
        .order_by_asc(task_assignee::Column::AssignedAt)
        .all(db)
        .await?;
    let people = refs::user_summaries(db, links.iter().map(|l| l.user_id)).await?;
    let mut by_task: HashMap<Uuid, Vec<AssigneeView>> = HashMap::new();
    for link in links {
        if let Some(user) = people.get(&link.user_id) {
            by_task
                .entry(link.task_id)
                .or_default()
                .push(AssigneeView { user: user.clone(), assigned_at: link.assigned_at });
        }
    }
    Ok(rows
        .into_iter()
        .map(|t| TaskView { assignees: by_task.remove(&t.id).unwrap_or_default(), task: t })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project_service::{self, ProjectInput};
    use crate::test_support::get_db;

    fn today() -> NaiveDate { NaiveDate::from_ymd_opt(2030, 6, 15).unwrap() }

    #[test]
    fn due_date_accepts_dates_and_timestamps() {
        assert!(parse_due_date("2030-06-15").is_some());
        assert!(parse_due_date("2030-06-15T10:00:00+02:00").is_some());
        assert!(parse_due_date("15/06/2030").is_none());
    }

    #[test]
    fn past_due_date_is_rejected() {
        let input = TaskInput {
            title: Some("Ship it".into()),
            project_id: Some(Uuid::new_v4().to_string()),
            due_date: Some("2030-06-14".into()),
            ..Default::default()
        };
        match check_input(&input, true, today()).unwrap_err() {
            ServiceError::Validation { details: Some(d), .. } => {
                assert_eq!(d["dueDate"], "Due date must between today and the future date.");
            }
            other => panic!("unexpected {:?}", other),
        }
        let mut same_day = input.clone();
        same_day.due_date = Some("2030-06-15".into());
        assert!(check_input(&same_day, true, today()).is_ok());
    }

    #[test]
    fn title_status_and_priority_are_checked() {
        let input = TaskInput {
            title: Some("ab".into()),
            status: Some("DONE".into()),
            priority: Some("URGENT".into()),
            ..Default::default()
        };
        match check_input(&input, false, today()).unwrap_err() {
            ServiceError::Validation { details: Some(d), .. } => {
                assert_eq!(d["title"], "Min 3 letters required");
                assert!(d.get("status").is_some());
                assert!(d.get("priority").is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn filter_parsing() {
        let f = TaskFilter::parse(None, Some("COMPLETED"), Some(" "), None).unwrap();
        assert_eq!(f.status, Some(TaskStatus::Completed));
        assert!(f.priority.is_none());
        assert!(TaskFilter::parse(Some("nope"), None, None, None).is_err());
    }

    #[tokio::test]
    async fn task_lifecycle_service() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let caller = Uuid::new_v4();
        let code = format!("T{}", &Uuid::new_v4().simple().to_string()[..6]).to_uppercase();
        let project = project_service::create(
            &db,
            caller,
            ProjectInput { title: Some(format!("Tasks {}", code)), code: Some(code.clone()), ..Default::default() },
        )
        .await?;

        let input = TaskInput {
            title: Some("Write docs".into()),
            project_id: Some(project.id.to_string()),
            due_date: Some(Utc::now().date_naive().format("%Y-%m-%d").to_string()),
            ..Default::default()
        };
        let first = create(&db, caller, input.clone()).await?;
        let second = create(&db, caller, input).await?;
        assert_eq!(first.task.ref_id, format!("{}-1", code));
        assert_eq!(second.task.ref_id, format!("{}-2", code));
        assert_eq!(first.task.status, "TODO");

        let done = update_status(&db, caller, first.task.id, "COMPLETED").await?;
        assert!(done.task.completed_at.is_some());
        let reopened = update_status(&db, caller, first.task.id, "IN_PROGRESS").await?;
        assert!(reopened.task.completed_at.is_none());

        let err = project_service::delete(&db, project.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        archive(&db, second.task.id).await?;
        assert_eq!(archive(&db, second.task.id).await.unwrap_err().to_string(), "Task is already archived");
        restore(&db, second.task.id).await?;
        assert_eq!(restore(&db, second.task.id).await.unwrap_err().to_string(), "Task is already restored");

        let counts = stats(&db, Some(project.id)).await?;
        assert_eq!(counts.get("IN_PROGRESS"), Some(&1));
        assert_eq!(counts.get("TODO"), Some(&1));

        task::Entity::delete_many().filter(task::Column::ProjectId.eq(project.id)).exec(&db).await?;
        project::Entity::delete_by_id(project.id).exec(&db).await?;
        Ok(())
    }

    async fn new_project(db: &DatabaseConnection, caller: Uuid, prefix: &str) -> Result<project::Model, ServiceError> {
        let code = format!("{}{}", prefix, &Uuid::new_v4().simple().to_string()[..6]).to_uppercase();
        project_service::create(
            db,
            caller,
            ProjectInput { title: Some(format!("Numbering {}", code)), code: Some(code), ..Default::default() },
        )
        .await
    }

    fn task_in(project_id: Uuid) -> TaskInput {
        TaskInput {
            title: Some("Numbered task".into()),
            project_id: Some(project_id.to_string()),
            due_date: Some(Utc::now().date_naive().format("%Y-%m-%d").to_string()),
            ..Default::default()
        }
    }

    async fn drop_projects(db: &DatabaseConnection, ids: &[Uuid]) -> Result<(), anyhow::Error> {
        for id in ids {
            task::Entity::delete_many().filter(task::Column::ProjectId.eq(*id)).exec(db).await?;
            project::Entity::delete_by_id(*id).exec(db).await?;
        }
        Ok(())
    }

    #[tokio::test]
    async fn ref_ids_never_repeat_within_a_project() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let caller = Uuid::new_v4();
        let a = new_project(&db, caller, "A").await?;
        let b = new_project(&db, caller, "B").await?;

        let b1 = create(&db, caller, task_in(b.id)).await?;
        let b2 = create(&db, caller, task_in(b.id)).await?;

        // moving between projects is refused and the task stays put
        let moved = update(&db, caller, b2.task.id, TaskInput { project_id: Some(a.id.to_string()), ..Default::default() }).await;
        assert!(matches!(moved, Err(ServiceError::BadRequest(_))));
        assert_eq!(get(&db, b2.task.id).await?.task.project_id, b.id);
        // naming the current project is a no-op
        update(&db, caller, b2.task.id, TaskInput { project_id: Some(b.id.to_string()), ..Default::default() }).await?;

        // a gap in the rows does not make the counter go back
        task::Entity::delete_by_id(b1.task.id).exec(&db).await?;
        let b3 = create(&db, caller, task_in(b.id)).await?;
        assert_eq!(b3.task.ref_id, format!("{}-3", b.code));
        let a1 = create(&db, caller, task_in(a.id)).await?;
        assert_eq!(a1.task.ref_id, format!("{}-1", a.code));

        // issued refIds pin the project code
        let recode = project_service::update(&db, caller, b.id, ProjectInput { code: Some("ZZ99".into()), ..Default::default() }).await;
        assert!(matches!(recode, Err(ServiceError::Conflict(_))));
        let same = project_service::update(&db, caller, b.id, ProjectInput { code: Some(b.code.clone()), ..Default::default() }).await?;
        assert_eq!(same.code, b.code);

        drop_projects(&db, &[a.id, b.id]).await
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_get_distinct_ref_ids() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let caller = Uuid::new_v4();
        let p = new_project(&db, caller, "C").await?;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let db = db.clone();
            let input = task_in(p.id);
            handles.push(tokio::spawn(async move { create(&db, caller, input).await }));
        }
        let mut refs = Vec::new();
        for h in handles {
            refs.push(h.await??.task.ref_id);
        }
        refs.sort();
        let mut expected: Vec<String> = (1..=8).map(|n| format!("{}-{}", p.code, n)).collect();
        expected.sort();
        assert_eq!(refs, expected);

        drop_projects(&db, &[p.id]).await
    }
}
