use api_types::{ListTasksQuery, Task, TaskStatus};
use chrono::{DateTime, Utc};
use sqlx::{Executor, QueryBuilder, Sqlite, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub struct CreateTaskParams {
    pub workspace_id: Uuid,
    pub project_id: Uuid,
    pub assignee_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub due_date: DateTime<Utc>,
    pub position: i64,
}

const TASK_COLUMNS: &str = "id, workspace_id, project_id, assignee_id, name, description, status, due_date, position, created_at, updated_at";

pub struct TaskRepository;

impl TaskRepository {
    pub async fn create(pool: &SqlitePool, params: CreateTaskParams) -> Result<Task, TaskError> {
        let CreateTaskParams {
            workspace_id,
            project_id,
            assignee_id,
            name,
            description,
            status,
            due_date,
            position,
        } = params;

        let now = Utc::now();
        let record = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (id, workspace_id, project_id, assignee_id, name, description, status, due_date, position, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            RETURNING id, workspace_id, project_id, assignee_id, name, description, status, due_date, position, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(workspace_id)
        .bind(project_id)
        .bind(assignee_id)
        .bind(&name)
        .bind(&description)
        .bind(status)
        .bind(due_date)
        .bind(position)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(record)
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Task>, TaskError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let record = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, workspace_id, project_id, assignee_id, name, description, status, due_date, position, created_at, updated_at
            FROM tasks
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(record)
    }

    /// Filtered listing, newest first. Filters are conjunctive; absent ones
    /// are not applied.
    pub async fn list(pool: &SqlitePool, filter: &ListTasksQuery) -> Result<Vec<Task>, TaskError> {
        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE workspace_id = "
        ));
        query.push_bind(filter.workspace_id);

        if let Some(project_id) = filter.project_id {
            query.push(" AND project_id = ").push_bind(project_id);
        }
        if let Some(assignee_id) = filter.assignee_id {
            query.push(" AND assignee_id = ").push_bind(assignee_id);
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }
        if let Some(due_date) = filter.due_date {
            query.push(" AND due_date = ").push_bind(due_date);
        }
        if let Some(search) = &filter.search {
            query
                .push(" AND name LIKE ")
                .push_bind(format!("%{search}%"));
        }

        query.push(" ORDER BY created_at DESC");

        let records = query.build_query_as::<Task>().fetch_all(pool).await?;
        Ok(records)
    }

    /// One Kanban column: tasks of a (workspace, status) pair, ascending by
    /// position.
    pub async fn list_column(
        pool: &SqlitePool,
        workspace_id: Uuid,
        status: TaskStatus,
    ) -> Result<Vec<Task>, TaskError> {
        let records = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, workspace_id, project_id, assignee_id, name, description, status, due_date, position, created_at, updated_at
            FROM tasks
            WHERE workspace_id = ?1 AND status = ?2
            ORDER BY position ASC
            "#,
        )
        .bind(workspace_id)
        .bind(status)
        .fetch_all(pool)
        .await?;

        Ok(records)
    }

    /// Lowest position in a column, if the column has any tasks. New tasks
    /// are created at this value plus one step.
    pub async fn min_position(
        pool: &SqlitePool,
        workspace_id: Uuid,
        status: TaskStatus,
    ) -> Result<Option<i64>, TaskError> {
        let min = sqlx::query_scalar::<_, Option<i64>>(
            "SELECT MIN(position) FROM tasks WHERE workspace_id = ?1 AND status = ?2",
        )
        .bind(workspace_id)
        .bind(status)
        .fetch_one(pool)
        .await?;

        Ok(min)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        name: Option<String>,
        status: Option<TaskStatus>,
        description: Option<String>,
        project_id: Option<Uuid>,
        assignee_id: Option<Uuid>,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Task, TaskError> {
        let update_name = name.is_some();
        let update_status = status.is_some();
        let update_description = description.is_some();
        let update_project = project_id.is_some();
        let update_assignee = assignee_id.is_some();
        let update_due_date = due_date.is_some();

        let record = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks SET
                name = CASE WHEN ?1 THEN ?2 ELSE name END,
                status = CASE WHEN ?3 THEN ?4 ELSE status END,
                description = CASE WHEN ?5 THEN ?6 ELSE description END,
                project_id = CASE WHEN ?7 THEN ?8 ELSE project_id END,
                assignee_id = CASE WHEN ?9 THEN ?10 ELSE assignee_id END,
                due_date = CASE WHEN ?11 THEN ?12 ELSE due_date END,
                updated_at = ?13
            WHERE id = ?14
            RETURNING id, workspace_id, project_id, assignee_id, name, description, status, due_date, position, created_at, updated_at
            "#,
        )
        .bind(update_name)
        .bind(name)
        .bind(update_status)
        .bind(status)
        .bind(update_description)
        .bind(description)
        .bind(update_project)
        .bind(project_id)
        .bind(update_assignee)
        .bind(assignee_id)
        .bind(update_due_date)
        .bind(due_date)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(pool)
        .await?;

        Ok(record)
    }

    /// Applies one entry of a position batch. Callers run these inside a
    /// transaction so the whole batch lands or none of it does.
    pub async fn update_position<'e, E>(
        executor: E,
        id: Uuid,
        status: TaskStatus,
        position: i64,
        now: DateTime<Utc>,
    ) -> Result<Task, TaskError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let record = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks SET status = ?1, position = ?2, updated_at = ?3
            WHERE id = ?4
            RETURNING id, workspace_id, project_id, assignee_id, name, description, status, due_date, position, created_at, updated_at
            "#,
        )
        .bind(status)
        .bind(position)
        .bind(now)
        .bind(id)
        .fetch_one(executor)
        .await?;

        Ok(record)
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<(), TaskError> {
        sqlx::query("DELETE FROM tasks WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }
}
