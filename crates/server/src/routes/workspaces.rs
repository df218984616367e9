use api_types::{
    AnalyticsSummary, ApiResponse, JoinWorkspaceRequest, MemberRole, Workspace, WorkspaceInfo,
};
use axum::{
    Json, Router,
    extract::{Extension, Multipart, Path, State},
    routing::{get, post},
};
use chrono::Utc;
use rand::{Rng, distr::Alphanumeric};
use tracing::instrument;
use uuid::Uuid;

use super::{
    error::{ErrorResponse, db_error},
    guard::{ensure_admin, ensure_member},
    read_entity_form,
};
use crate::{
    AppState, analytics,
    auth::RequestContext,
    db::{
        members::{MemberError, MemberRepository},
        workspaces::{CreateWorkspaceParams, WorkspaceRepository},
    },
    images,
};

const INVITE_CODE_LENGTH: usize = 6;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/workspaces", get(list_workspaces).post(create_workspace))
        .route(
            "/workspaces/{workspace_id}",
            get(get_workspace)
                .patch(update_workspace)
                .delete(delete_workspace),
        )
        .route("/workspaces/{workspace_id}/info", get(workspace_info))
        .route(
            "/workspaces/{workspace_id}/reset-invite-code",
            post(reset_invite_code),
        )
        .route("/workspaces/{workspace_id}/join", post(join_workspace))
        .route(
            "/workspaces/{workspace_id}/analytics",
            get(workspace_analytics),
        )
}

fn generate_invite_code(length: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

#[instrument(name = "workspaces.list", skip(state, ctx), fields(user_id = %ctx.user.id))]
async fn list_workspaces(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<ApiResponse<Vec<Workspace>>>, ErrorResponse> {
    let workspaces = WorkspaceRepository::list_for_user(state.pool(), ctx.user.id)
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to list workspaces");
            ErrorResponse::internal("failed to list workspaces")
        })?;

    Ok(Json(ApiResponse::new(workspaces)))
}

#[instrument(name = "workspaces.create", skip(state, ctx, multipart), fields(user_id = %ctx.user.id))]
async fn create_workspace(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<Workspace>>, ErrorResponse> {
    let form = read_entity_form(&mut multipart).await?;
    let name = form
        .name
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ErrorResponse::bad_request("`name` is required"))?;

    let image_url = form
        .image_data
        .as_deref()
        .map(images::to_data_uri)
        .transpose()?;

    let workspace = WorkspaceRepository::create(
        state.pool(),
        CreateWorkspaceParams {
            name,
            owner_user_id: ctx.user.id,
            image_url,
            invite_code: generate_invite_code(INVITE_CODE_LENGTH),
        },
    )
    .await
    .map_err(|error| {
        tracing::error!(?error, "failed to create workspace");
        db_error(error, "failed to create workspace")
    })?;

    Ok(Json(ApiResponse::new(workspace)))
}

#[instrument(
    name = "workspaces.get",
    skip(state, ctx),
    fields(workspace_id = %workspace_id, user_id = %ctx.user.id)
)]
async fn get_workspace(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Workspace>>, ErrorResponse> {
    ensure_member(state.pool(), ctx.user.id, workspace_id).await?;

    let workspace = find_workspace(&state, workspace_id).await?;
    Ok(Json(ApiResponse::new(workspace)))
}

/// Reduced view for invite links; requires a session but no membership.
#[instrument(name = "workspaces.info", skip(state), fields(workspace_id = %workspace_id))]
async fn workspace_info(
    State(state): State<AppState>,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<ApiResponse<WorkspaceInfo>>, ErrorResponse> {
    let workspace = find_workspace(&state, workspace_id).await?;
    Ok(Json(ApiResponse::new(workspace.into())))
}

#[instrument(
    name = "workspaces.update",
    skip(state, ctx, multipart),
    fields(workspace_id = %workspace_id, user_id = %ctx.user.id)
)]
async fn update_workspace(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(workspace_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<Workspace>>, ErrorResponse> {
    ensure_admin(state.pool(), ctx.user.id, workspace_id).await?;

    let form = read_entity_form(&mut multipart).await?;
    let image_url = form
        .image_data
        .as_deref()
        .map(images::to_data_uri)
        .transpose()?;

    let workspace = WorkspaceRepository::update(state.pool(), workspace_id, form.name, image_url)
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to update workspace");
            ErrorResponse::internal("failed to update workspace")
        })?;

    Ok(Json(ApiResponse::new(workspace)))
}

#[instrument(
    name = "workspaces.delete",
    skip(state, ctx),
    fields(workspace_id = %workspace_id, user_id = %ctx.user.id)
)]
async fn delete_workspace(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ErrorResponse> {
    ensure_admin(state.pool(), ctx.user.id, workspace_id).await?;

    WorkspaceRepository::delete(state.pool(), workspace_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to delete workspace");
            ErrorResponse::internal("failed to delete workspace")
        })?;

    Ok(Json(ApiResponse::new(())))
}

#[instrument(
    name = "workspaces.reset_invite_code",
    skip(state, ctx),
    fields(workspace_id = %workspace_id, user_id = %ctx.user.id)
)]
async fn reset_invite_code(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Workspace>>, ErrorResponse> {
    ensure_admin(state.pool(), ctx.user.id, workspace_id).await?;

    let workspace = WorkspaceRepository::set_invite_code(
        state.pool(),
        workspace_id,
        &generate_invite_code(INVITE_CODE_LENGTH),
    )
    .await
    .map_err(|error| {
        tracing::error!(?error, "failed to reset invite code");
        ErrorResponse::internal("failed to reset invite code")
    })?;

    Ok(Json(ApiResponse::new(workspace)))
}

#[instrument(
    name = "workspaces.join",
    skip(state, ctx, payload),
    fields(workspace_id = %workspace_id, user_id = %ctx.user.id)
)]
async fn join_workspace(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(workspace_id): Path<Uuid>,
    Json(payload): Json<JoinWorkspaceRequest>,
) -> Result<Json<ApiResponse<Workspace>>, ErrorResponse> {
    let existing =
        MemberRepository::find_by_workspace_and_user(state.pool(), workspace_id, ctx.user.id)
            .await
            .map_err(|error| {
                tracing::error!(?error, "failed to resolve membership");
                ErrorResponse::internal("failed to join workspace")
            })?;
    if existing.is_some() {
        return Err(ErrorResponse::bad_request("already a member"));
    }

    let workspace = find_workspace(&state, workspace_id).await?;
    if workspace.invite_code != payload.code {
        return Err(ErrorResponse::bad_request("invalid invite code"));
    }

    // The unique key on (workspace, user) turns a concurrent double-join
    // into the same "already a member" rejection.
    MemberRepository::create(state.pool(), workspace_id, ctx.user.id, MemberRole::Member)
        .await
        .map_err(|error| match error {
            MemberError::AlreadyMember => ErrorResponse::bad_request("already a member"),
            other => {
                tracing::error!(?other, "failed to join workspace");
                ErrorResponse::internal("failed to join workspace")
            }
        })?;

    Ok(Json(ApiResponse::new(workspace)))
}

#[instrument(
    name = "workspaces.analytics",
    skip(state, ctx),
    fields(workspace_id = %workspace_id, user_id = %ctx.user.id)
)]
async fn workspace_analytics(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<ApiResponse<AnalyticsSummary>>, ErrorResponse> {
    let member = ensure_member(state.pool(), ctx.user.id, workspace_id).await?;

    let summary = analytics::workspace_analytics(state.pool(), workspace_id, member.id, Utc::now())
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to compute analytics");
            ErrorResponse::internal("failed to compute analytics")
        })?;

    Ok(Json(ApiResponse::new(summary)))
}

async fn find_workspace(state: &AppState, workspace_id: Uuid) -> Result<Workspace, ErrorResponse> {
    WorkspaceRepository::find_by_id(state.pool(), workspace_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to load workspace");
            ErrorResponse::internal("failed to load workspace")
        })?
        .ok_or_else(|| ErrorResponse::not_found("workspace not found"))
}
