use api_types::{AnalyticsSummary, ApiResponse, Project};
use axum::{
    Json, Router,
    extract::{Extension, Multipart, Path, Query, State},
    routing::get,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use super::{
    error::{ErrorResponse, db_error},
    guard::ensure_member,
    read_entity_form,
};
use crate::{
    AppState, analytics, auth::RequestContext, db::projects::ProjectRepository, images,
};

#[derive(Debug, Deserialize)]
pub struct ListProjectsQuery {
    pub workspace_id: Uuid,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/{project_id}",
            get(get_project).patch(update_project).delete(delete_project),
        )
        .route("/projects/{project_id}/analytics", get(project_analytics))
}

#[instrument(
    name = "projects.list",
    skip(state, ctx),
    fields(workspace_id = %query.workspace_id, user_id = %ctx.user.id)
)]
async fn list_projects(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ListProjectsQuery>,
) -> Result<Json<ApiResponse<Vec<Project>>>, ErrorResponse> {
    ensure_member(state.pool(), ctx.user.id, query.workspace_id).await?;

    let projects = ProjectRepository::list_by_workspace(state.pool(), query.workspace_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to list projects");
            ErrorResponse::internal("failed to list projects")
        })?;

    Ok(Json(ApiResponse::new(projects)))
}

#[instrument(name = "projects.create", skip(state, ctx, multipart), fields(user_id = %ctx.user.id))]
async fn create_project(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<Project>>, ErrorResponse> {
    let form = read_entity_form(&mut multipart).await?;
    let name = form
        .name
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ErrorResponse::bad_request("`name` is required"))?;
    let workspace_id = form
        .workspace_id
        .ok_or_else(|| ErrorResponse::bad_request("`workspace_id` is required"))?;

    ensure_member(state.pool(), ctx.user.id, workspace_id).await?;

    let image_url = form
        .image_data
        .as_deref()
        .map(images::to_data_uri)
        .transpose()?;

    let project = ProjectRepository::create(state.pool(), workspace_id, &name, image_url)
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to create project");
            db_error(error, "failed to create project")
        })?;

    Ok(Json(ApiResponse::new(project)))
}

#[instrument(
    name = "projects.get",
    skip(state, ctx),
    fields(project_id = %project_id, user_id = %ctx.user.id)
)]
async fn get_project(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Project>>, ErrorResponse> {
    let project = find_project(&state, project_id).await?;
    ensure_member(state.pool(), ctx.user.id, project.workspace_id).await?;

    Ok(Json(ApiResponse::new(project)))
}

#[instrument(
    name = "projects.update",
    skip(state, ctx, multipart),
    fields(project_id = %project_id, user_id = %ctx.user.id)
)]
async fn update_project(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(project_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<Project>>, ErrorResponse> {
    let project = find_project(&state, project_id).await?;
    ensure_member(state.pool(), ctx.user.id, project.workspace_id).await?;

    let form = read_entity_form(&mut multipart).await?;
    let image_url = form
        .image_data
        .as_deref()
        .map(images::to_data_uri)
        .transpose()?;

    let project = ProjectRepository::update(state.pool(), project_id, form.name, image_url)
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to update project");
            ErrorResponse::internal("failed to update project")
        })?;

    Ok(Json(ApiResponse::new(project)))
}

#[instrument(
    name = "projects.delete",
    skip(state, ctx),
    fields(project_id = %project_id, user_id = %ctx.user.id)
)]
async fn delete_project(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ErrorResponse> {
    let project = find_project(&state, project_id).await?;
    ensure_member(state.pool(), ctx.user.id, project.workspace_id).await?;

    ProjectRepository::delete(state.pool(), project_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to delete project");
            ErrorResponse::internal("failed to delete project")
        })?;

    Ok(Json(ApiResponse::new(())))
}

#[instrument(
    name = "projects.analytics",
    skip(state, ctx),
    fields(project_id = %project_id, user_id = %ctx.user.id)
)]
async fn project_analytics(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ApiResponse<AnalyticsSummary>>, ErrorResponse> {
    let project = find_project(&state, project_id).await?;
    let member = ensure_member(state.pool(), ctx.user.id, project.workspace_id).await?;

    let summary = analytics::project_analytics(state.pool(), project_id, member.id, Utc::now())
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to compute analytics");
            ErrorResponse::internal("failed to compute analytics")
        })?;

    Ok(Json(ApiResponse::new(summary)))
}

async fn find_project(state: &AppState, project_id: Uuid) -> Result<Project, ErrorResponse> {
    ProjectRepository::find_by_id(state.pool(), project_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to load project");
            ErrorResponse::internal("failed to load project")
        })?
        .ok_or_else(|| ErrorResponse::not_found("project not found"))
}
