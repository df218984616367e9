//! Month-over-month task metrics.
//!
//! Every metric is a pair of `COUNT` queries over the current and previous
//! calendar month of `created_at`. Nothing is cached; dashboards recompute
//! on every request.

use api_types::{AnalyticsSummary, TaskStatus};
use chrono::{DateTime, Datelike, TimeZone, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct CountFilter {
    workspace_id: Option<Uuid>,
    project_id: Option<Uuid>,
    assignee_id: Option<Uuid>,
    status: Option<TaskStatus>,
    exclude_done: bool,
    due_before: Option<DateTime<Utc>>,
}

pub async fn workspace_analytics(
    pool: &SqlitePool,
    workspace_id: Uuid,
    member_id: Uuid,
    now: DateTime<Utc>,
) -> Result<AnalyticsSummary, sqlx::Error> {
    let base = CountFilter {
        workspace_id: Some(workspace_id),
        ..CountFilter::default()
    };
    summarize(pool, base, member_id, now).await
}

pub async fn project_analytics(
    pool: &SqlitePool,
    project_id: Uuid,
    member_id: Uuid,
    now: DateTime<Utc>,
) -> Result<AnalyticsSummary, sqlx::Error> {
    let base = CountFilter {
        project_id: Some(project_id),
        ..CountFilter::default()
    };
    summarize(pool, base, member_id, now).await
}

async fn summarize(
    pool: &SqlitePool,
    base: CountFilter,
    member_id: Uuid,
    now: DateTime<Utc>,
) -> Result<AnalyticsSummary, sqlx::Error> {
    let this_month = (month_start(now), next_month_start(now));
    let last_month = (previous_month_start(now), month_start(now));

    let assigned = CountFilter {
        assignee_id: Some(member_id),
        ..base.clone()
    };
    let incomplete = CountFilter {
        exclude_done: true,
        ..base.clone()
    };
    let completed = CountFilter {
        status: Some(TaskStatus::Done),
        ..base.clone()
    };
    let overdue = CountFilter {
        exclude_done: true,
        due_before: Some(now),
        ..base.clone()
    };

    let (task_count, task_difference) = paired_counts(pool, &base, this_month, last_month).await?;
    let (assigned_task_count, assigned_task_difference) =
        paired_counts(pool, &assigned, this_month, last_month).await?;
    let (incomplete_task_count, incomplete_task_difference) =
        paired_counts(pool, &incomplete, this_month, last_month).await?;
    let (completed_task_count, completed_task_difference) =
        paired_counts(pool, &completed, this_month, last_month).await?;
    let (overdue_task_count, overdue_task_difference) =
        paired_counts(pool, &overdue, this_month, last_month).await?;

    Ok(AnalyticsSummary {
        task_count,
        task_difference,
        assigned_task_count,
        assigned_task_difference,
        completed_task_count,
        completed_task_difference,
        incomplete_task_count,
        incomplete_task_difference,
        overdue_task_count,
        overdue_task_difference,
    })
}

async fn paired_counts(
    pool: &SqlitePool,
    filter: &CountFilter,
    this_month: (DateTime<Utc>, DateTime<Utc>),
    last_month: (DateTime<Utc>, DateTime<Utc>),
) -> Result<(i64, i64), sqlx::Error> {
    let current = count_created_between(pool, filter, this_month.0, this_month.1).await?;
    let previous = count_created_between(pool, filter, last_month.0, last_month.1).await?;
    Ok((current, current - previous))
}

async fn count_created_between(
    pool: &SqlitePool,
    filter: &CountFilter,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    let mut query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM tasks WHERE created_at >= ");
    query.push_bind(from);
    query.push(" AND created_at < ").push_bind(until);

    if let Some(workspace_id) = filter.workspace_id {
        query.push(" AND workspace_id = ").push_bind(workspace_id);
    }
    if let Some(project_id) = filter.project_id {
        query.push(" AND project_id = ").push_bind(project_id);
    }
    if let Some(assignee_id) = filter.assignee_id {
        query.push(" AND assignee_id = ").push_bind(assignee_id);
    }
    if let Some(status) = filter.status {
        query.push(" AND status = ").push_bind(status);
    }
    if filter.exclude_done {
        query.push(" AND status <> ").push_bind(TaskStatus::Done);
    }
    if let Some(due_before) = filter.due_before {
        query.push(" AND due_date < ").push_bind(due_before);
    }

    query.build_query_scalar::<i64>().fetch_one(pool).await
}

fn month_start(at: DateTime<Utc>) -> DateTime<Utc> {
    first_instant(at.year(), at.month())
}

fn next_month_start(at: DateTime<Utc>) -> DateTime<Utc> {
    match at.month() {
        12 => first_instant(at.year() + 1, 1),
        month => first_instant(at.year(), month + 1),
    }
}

fn previous_month_start(at: DateTime<Utc>) -> DateTime<Utc> {
    match at.month() {
        1 => first_instant(at.year() - 1, 12),
        month => first_instant(at.year(), month - 1),
    }
}

fn first_instant(year: i32, month: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .expect("first of month is a valid instant")
}
