use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use strum_macros::{Display, EnumIter};
use uuid::Uuid;

use crate::{MemberWithProfile, Project};

/// The five fixed Kanban states. Board columns render in declaration order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Type, Display,
    EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Backlog,
    Todo,
    InProgress,
    InReview,
    Done,
}

/// Task row. `position` is the ordering key within the task's
/// (workspace, status) column, ascending.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub project_id: Uuid,
    pub assignee_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub due_date: DateTime<Utc>,
    pub position: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Task with its referenced project and assignee denormalized inline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskWithRelations {
    #[serde(flatten)]
    pub task: Task,
    pub project: Option<Project>,
    pub assignee: Option<MemberWithProfile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaskRequest {
    pub name: String,
    pub status: TaskStatus,
    pub workspace_id: Uuid,
    pub project_id: Uuid,
    pub assignee_id: Uuid,
    pub due_date: DateTime<Utc>,
    pub description: Option<String>,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub name: Option<String>,
    pub status: Option<TaskStatus>,
    pub description: Option<String>,
    pub project_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
}

/// One entry of a batched position update, as produced by a board move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkUpdateTaskItem {
    pub id: Uuid,
    pub status: TaskStatus,
    pub position: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkUpdateTasksRequest {
    pub updates: Vec<BulkUpdateTaskItem>,
}

/// Server-side drag-and-drop: drop the task at `index` within the `status`
/// column of its board.
#[derive(Debug, Clone, Deserialize)]
pub struct MoveTaskRequest {
    pub status: TaskStatus,
    pub index: usize,
}

/// Task listing filters. All optional filters combine with AND semantics.
#[derive(Debug, Clone, Deserialize)]
pub struct ListTasksQuery {
    pub workspace_id: Uuid,
    pub project_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<DateTime<Utc>>,
    pub search: Option<String>,
}
