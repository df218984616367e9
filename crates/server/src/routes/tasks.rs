use std::collections::{BTreeSet, HashMap};

use api_types::{
    ApiResponse, BulkUpdateTasksRequest, CreateTaskRequest, ListTasksQuery, MemberWithProfile,
    MoveTaskRequest, Project, Task, TaskWithRelations, UpdateTaskRequest,
};
use axum::{
    Json, Router,
    extract::{Extension, Path, Query, State},
    routing::{get, post},
};
use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;

use super::{error::ErrorResponse, guard::ensure_member};
use crate::{
    AppState,
    auth::RequestContext,
    db::{
        members::MemberRepository,
        projects::ProjectRepository,
        tasks::{CreateTaskParams, TaskRepository},
    },
    ordering::{Board, BoardEntry, MoveError, creation_position},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/{task_id}",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .route("/tasks/bulk-update", post(bulk_update_tasks))
        .route("/tasks/{task_id}/move", post(move_task))
}

#[instrument(
    name = "tasks.list",
    skip(state, ctx, query),
    fields(workspace_id = %query.workspace_id, user_id = %ctx.user.id)
)]
async fn list_tasks(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<ApiResponse<Vec<TaskWithRelations>>>, ErrorResponse> {
    ensure_member(state.pool(), ctx.user.id, query.workspace_id).await?;

    let tasks = TaskRepository::list(state.pool(), &query)
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to list tasks");
            ErrorResponse::internal("failed to list tasks")
        })?;

    let enriched = enrich_tasks(&state, tasks).await?;
    Ok(Json(ApiResponse::new(enriched)))
}

#[instrument(
    name = "tasks.create",
    skip(state, ctx, payload),
    fields(workspace_id = %payload.workspace_id, user_id = %ctx.user.id)
)]
async fn create_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<Json<ApiResponse<Task>>, ErrorResponse> {
    ensure_member(state.pool(), ctx.user.id, payload.workspace_id).await?;

    // New tasks land one step above the column's current minimum.
    let column_min =
        TaskRepository::min_position(state.pool(), payload.workspace_id, payload.status)
            .await
            .map_err(|error| {
                tracing::error!(?error, "failed to read column positions");
                ErrorResponse::internal("failed to create task")
            })?;

    let task = TaskRepository::create(
        state.pool(),
        CreateTaskParams {
            workspace_id: payload.workspace_id,
            project_id: payload.project_id,
            assignee_id: payload.assignee_id,
            name: payload.name,
            description: payload.description,
            status: payload.status,
            due_date: payload.due_date,
            position: creation_position(column_min),
        },
    )
    .await
    .map_err(|error| {
        tracing::error!(?error, "failed to create task");
        super::error::db_error(error, "failed to create task")
    })?;

    Ok(Json(ApiResponse::new(task)))
}

#[instrument(
    name = "tasks.get",
    skip(state, ctx),
    fields(task_id = %task_id, user_id = %ctx.user.id)
)]
async fn get_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<ApiResponse<TaskWithRelations>>, ErrorResponse> {
    let task = find_task(&state, task_id).await?;
    ensure_member(state.pool(), ctx.user.id, task.workspace_id).await?;

    let mut enriched = enrich_tasks(&state, vec![task]).await?;
    let task = enriched
        .pop()
        .ok_or_else(|| ErrorResponse::internal("failed to load task"))?;

    Ok(Json(ApiResponse::new(task)))
}

#[instrument(
    name = "tasks.update",
    skip(state, ctx, payload),
    fields(task_id = %task_id, user_id = %ctx.user.id)
)]
async fn update_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<Json<ApiResponse<Task>>, ErrorResponse> {
    let existing = find_task(&state, task_id).await?;
    ensure_member(state.pool(), ctx.user.id, existing.workspace_id).await?;

    let task = TaskRepository::update(
        state.pool(),
        task_id,
        payload.name,
        payload.status,
        payload.description,
        payload.project_id,
        payload.assignee_id,
        payload.due_date,
    )
    .await
    .map_err(|error| {
        tracing::error!(?error, "failed to update task");
        ErrorResponse::internal("failed to update task")
    })?;

    Ok(Json(ApiResponse::new(task)))
}

#[instrument(
    name = "tasks.delete",
    skip(state, ctx),
    fields(task_id = %task_id, user_id = %ctx.user.id)
)]
async fn delete_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ErrorResponse> {
    let task = find_task(&state, task_id).await?;
    ensure_member(state.pool(), ctx.user.id, task.workspace_id).await?;

    TaskRepository::delete(state.pool(), task_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to delete task");
            ErrorResponse::internal("failed to delete task")
        })?;

    Ok(Json(ApiResponse::new(())))
}

#[instrument(
    name = "tasks.bulk_update",
    skip(state, ctx, payload),
    fields(user_id = %ctx.user.id, count = payload.updates.len())
)]
async fn bulk_update_tasks(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<BulkUpdateTasksRequest>,
) -> Result<Json<ApiResponse<Vec<Task>>>, ErrorResponse> {
    if payload.updates.is_empty() {
        return Ok(Json(ApiResponse::new(Vec::new())));
    }

    let first = find_task(&state, payload.updates[0].id).await?;
    let workspace_id = first.workspace_id;
    ensure_member(state.pool(), ctx.user.id, workspace_id).await?;

    // One transaction for the whole batch: every row lands or none does.
    let mut tx = state.pool().begin().await.map_err(|error| {
        tracing::error!(?error, "failed to begin transaction");
        ErrorResponse::internal("failed to update tasks")
    })?;

    let now = Utc::now();
    let mut results = Vec::with_capacity(payload.updates.len());

    for item in payload.updates {
        let task = TaskRepository::find_by_id(&mut *tx, item.id)
            .await
            .map_err(|error| {
                tracing::error!(?error, task_id = %item.id, "failed to find task");
                ErrorResponse::internal("failed to update tasks")
            })?
            .ok_or_else(|| ErrorResponse::not_found("task not found"))?;

        if task.workspace_id != workspace_id {
            return Err(ErrorResponse::bad_request(
                "all tasks must belong to the same workspace",
            ));
        }

        let updated =
            TaskRepository::update_position(&mut *tx, item.id, item.status, item.position, now)
                .await
                .map_err(|error| {
                    tracing::error!(?error, task_id = %item.id, "failed to update task");
                    ErrorResponse::internal("failed to update tasks")
                })?;

        results.push(updated);
    }

    tx.commit().await.map_err(|error| {
        tracing::error!(?error, "failed to commit transaction");
        ErrorResponse::internal("failed to update tasks")
    })?;

    Ok(Json(ApiResponse::new(results)))
}

/// Server-side drag-and-drop: recomputes positions for the two affected
/// columns and applies the batch atomically.
#[instrument(
    name = "tasks.move",
    skip(state, ctx, payload),
    fields(task_id = %task_id, user_id = %ctx.user.id)
)]
async fn move_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<MoveTaskRequest>,
) -> Result<Json<ApiResponse<Task>>, ErrorResponse> {
    let task = find_task(&state, task_id).await?;
    ensure_member(state.pool(), ctx.user.id, task.workspace_id).await?;

    let mut tasks = TaskRepository::list_column(state.pool(), task.workspace_id, task.status)
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to load board column");
            ErrorResponse::internal("failed to move task")
        })?;
    if payload.status != task.status {
        let destination =
            TaskRepository::list_column(state.pool(), task.workspace_id, payload.status)
                .await
                .map_err(|error| {
                    tracing::error!(?error, "failed to load board column");
                    ErrorResponse::internal("failed to move task")
                })?;
        tasks.extend(destination);
    }

    let mut board = Board::from_tasks(tasks.iter().map(|t| BoardEntry {
        id: t.id,
        status: t.status,
        position: t.position,
    }));

    let updates = board
        .plan_move(task_id, payload.status, payload.index)
        .map_err(|error| match error {
            MoveError::TaskNotFound(_) => ErrorResponse::not_found("task not found"),
        })?;

    let mut tx = state.pool().begin().await.map_err(|error| {
        tracing::error!(?error, "failed to begin transaction");
        ErrorResponse::internal("failed to move task")
    })?;

    let now = Utc::now();
    for update in &updates {
        TaskRepository::update_position(&mut *tx, update.id, update.status, update.position, now)
            .await
            .map_err(|error| {
                tracing::error!(?error, task_id = %update.id, "failed to update position");
                ErrorResponse::internal("failed to move task")
            })?;
    }

    tx.commit().await.map_err(|error| {
        tracing::error!(?error, "failed to commit transaction");
        ErrorResponse::internal("failed to move task")
    })?;

    let moved = find_task(&state, task_id).await?;
    Ok(Json(ApiResponse::new(moved)))
}

/// Joins each task's project and assignee in memory, fetching every
/// related collection with a single batched query over the distinct id
/// set.
async fn enrich_tasks(
    state: &AppState,
    tasks: Vec<Task>,
) -> Result<Vec<TaskWithRelations>, ErrorResponse> {
    let project_ids: Vec<Uuid> = tasks
        .iter()
        .map(|task| task.project_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let assignee_ids: Vec<Uuid> = tasks
        .iter()
        .filter_map(|task| task.assignee_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let projects: HashMap<Uuid, Project> = ProjectRepository::find_by_ids(state.pool(), &project_ids)
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to load related projects");
            ErrorResponse::internal("failed to load tasks")
        })?
        .into_iter()
        .map(|project| (project.id, project))
        .collect();

    let assignees: HashMap<Uuid, MemberWithProfile> =
        MemberRepository::find_with_profiles_by_ids(state.pool(), &assignee_ids)
            .await
            .map_err(|error| {
                tracing::error!(?error, "failed to load related members");
                ErrorResponse::internal("failed to load tasks")
            })?
            .into_iter()
            .map(|member| (member.id, member))
            .collect();

    Ok(tasks
        .into_iter()
        .map(|task| {
            let project = projects.get(&task.project_id).cloned();
            let assignee = task
                .assignee_id
                .and_then(|id| assignees.get(&id))
                .cloned();
            TaskWithRelations {
                task,
                project,
                assignee,
            }
        })
        .collect())
}

async fn find_task(state: &AppState, task_id: Uuid) -> Result<Task, ErrorResponse> {
    TaskRepository::find_by_id(state.pool(), task_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to load task");
            ErrorResponse::internal("failed to load task")
        })?
        .ok_or_else(|| ErrorResponse::not_found("task not found"))
}
