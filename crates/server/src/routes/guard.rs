//! Authorization gate. Every scoped read and every mutation resolves the
//! caller's membership through these helpers before touching anything.

use api_types::{Member, MemberRole};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::error::ErrorResponse;
use crate::db::members::MemberRepository;

/// Caller must belong to the workspace. Non-members get the same generic
/// 401 as unauthenticated callers.
pub(crate) async fn ensure_member(
    pool: &SqlitePool,
    user_id: Uuid,
    workspace_id: Uuid,
) -> Result<Member, ErrorResponse> {
    match MemberRepository::find_by_workspace_and_user(pool, workspace_id, user_id).await {
        Ok(Some(member)) => Ok(member),
        Ok(None) => Err(ErrorResponse::unauthorized()),
        Err(error) => {
            tracing::error!(?error, %workspace_id, "failed to resolve membership");
            Err(ErrorResponse::internal("failed to resolve membership"))
        }
    }
}

/// Caller must belong to the workspace with the ADMIN role.
pub(crate) async fn ensure_admin(
    pool: &SqlitePool,
    user_id: Uuid,
    workspace_id: Uuid,
) -> Result<Member, ErrorResponse> {
    let member = ensure_member(pool, user_id, workspace_id).await?;
    if member.role != MemberRole::Admin {
        return Err(ErrorResponse::unauthorized());
    }
    Ok(member)
}
