use api_types::{ApiResponse, Member, MemberRole, MemberWithProfile, UpdateMemberRoleRequest};
use axum::{
    Json, Router,
    extract::{Extension, Path, Query, State},
    routing::get,
};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use super::{
    error::ErrorResponse,
    guard::{ensure_admin, ensure_member},
};
use crate::{AppState, auth::RequestContext, db::members::MemberRepository};

#[derive(Debug, Deserialize)]
pub struct ListMembersQuery {
    pub workspace_id: Uuid,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/members", get(list_members)).route(
        "/members/{member_id}",
        get(get_member).patch(update_member).delete(delete_member),
    )
}

#[instrument(
    name = "members.list",
    skip(state, ctx),
    fields(workspace_id = %query.workspace_id, user_id = %ctx.user.id)
)]
async fn list_members(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ListMembersQuery>,
) -> Result<Json<ApiResponse<Vec<MemberWithProfile>>>, ErrorResponse> {
    ensure_member(state.pool(), ctx.user.id, query.workspace_id).await?;

    let members =
        MemberRepository::list_by_workspace_with_profiles(state.pool(), query.workspace_id)
            .await
            .map_err(|error| {
                tracing::error!(?error, "failed to list members");
                ErrorResponse::internal("failed to list members")
            })?;

    Ok(Json(ApiResponse::new(members)))
}

#[instrument(
    name = "members.get",
    skip(state, ctx),
    fields(member_id = %member_id, user_id = %ctx.user.id)
)]
async fn get_member(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(member_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Member>>, ErrorResponse> {
    let member = find_member(&state, member_id).await?;
    ensure_member(state.pool(), ctx.user.id, member.workspace_id).await?;

    Ok(Json(ApiResponse::new(member)))
}

#[instrument(
    name = "members.update",
    skip(state, ctx, payload),
    fields(member_id = %member_id, user_id = %ctx.user.id)
)]
async fn update_member(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(member_id): Path<Uuid>,
    Json(payload): Json<UpdateMemberRoleRequest>,
) -> Result<Json<ApiResponse<Member>>, ErrorResponse> {
    let target = find_member(&state, member_id).await?;
    ensure_admin(state.pool(), ctx.user.id, target.workspace_id).await?;

    // Demoting the only member would leave the workspace without an admin.
    if payload.role == MemberRole::Member
        && member_count(&state, target.workspace_id).await? == 1
    {
        return Err(ErrorResponse::bad_request("cannot demote the last member"));
    }

    let member = MemberRepository::update_role(state.pool(), member_id, payload.role)
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to update member");
            ErrorResponse::internal("failed to update member")
        })?;

    Ok(Json(ApiResponse::new(member)))
}

#[instrument(
    name = "members.delete",
    skip(state, ctx),
    fields(member_id = %member_id, user_id = %ctx.user.id)
)]
async fn delete_member(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(member_id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ErrorResponse> {
    let target = find_member(&state, member_id).await?;
    let caller = ensure_member(state.pool(), ctx.user.id, target.workspace_id).await?;

    // Members may remove themselves; removing anyone else takes ADMIN.
    if caller.id != target.id && caller.role != MemberRole::Admin {
        return Err(ErrorResponse::unauthorized());
    }

    if member_count(&state, target.workspace_id).await? == 1 {
        return Err(ErrorResponse::bad_request("cannot delete the last member"));
    }

    MemberRepository::delete(state.pool(), member_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to delete member");
            ErrorResponse::internal("failed to delete member")
        })?;

    Ok(Json(ApiResponse::new(())))
}

async fn member_count(state: &AppState, workspace_id: Uuid) -> Result<i64, ErrorResponse> {
    MemberRepository::count_by_workspace(state.pool(), workspace_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to count members");
            ErrorResponse::internal("failed to count members")
        })
}

async fn find_member(state: &AppState, member_id: Uuid) -> Result<Member, ErrorResponse> {
    MemberRepository::find_by_id(state.pool(), member_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to load member");
            ErrorResponse::internal("failed to load member")
        })?
        .ok_or_else(|| ErrorResponse::not_found("member not found"))
}
