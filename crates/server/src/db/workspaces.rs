use api_types::{MemberRole, Workspace};
use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use super::members::MemberRepository;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("member error: {0}")]
    Member(#[from] super::members::MemberError),
}

pub struct CreateWorkspaceParams {
    pub name: String,
    pub owner_user_id: Uuid,
    pub image_url: Option<String>,
    pub invite_code: String,
}

pub struct WorkspaceRepository;

impl WorkspaceRepository {
    /// Creates the workspace together with an ADMIN membership for the
    /// owner, atomically.
    pub async fn create(
        pool: &SqlitePool,
        params: CreateWorkspaceParams,
    ) -> Result<Workspace, WorkspaceError> {
        let CreateWorkspaceParams {
            name,
            owner_user_id,
            image_url,
            invite_code,
        } = params;

        let mut tx = pool.begin().await?;
        let now = Utc::now();

        let workspace = sqlx::query_as::<_, Workspace>(
            r#"
            INSERT INTO workspaces (id, name, owner_user_id, image_url, invite_code, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            RETURNING id, name, owner_user_id, image_url, invite_code, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&name)
        .bind(owner_user_id)
        .bind(&image_url)
        .bind(&invite_code)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        MemberRepository::create(&mut *tx, workspace.id, owner_user_id, MemberRole::Admin).await?;

        tx.commit().await?;
        Ok(workspace)
    }

    pub async fn find_by_id(
        pool: &SqlitePool,
        id: Uuid,
    ) -> Result<Option<Workspace>, WorkspaceError> {
        let record = sqlx::query_as::<_, Workspace>(
            r#"
            SELECT id, name, owner_user_id, image_url, invite_code, created_at, updated_at
            FROM workspaces
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(record)
    }

    /// Workspaces the user belongs to, newest first.
    pub async fn list_for_user(
        pool: &SqlitePool,
        user_id: Uuid,
    ) -> Result<Vec<Workspace>, WorkspaceError> {
        let records = sqlx::query_as::<_, Workspace>(
            r#"
            SELECT w.id, w.name, w.owner_user_id, w.image_url, w.invite_code, w.created_at, w.updated_at
            FROM workspaces w
            INNER JOIN members m ON m.workspace_id = w.id
            WHERE m.user_id = ?1
            ORDER BY w.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(records)
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        name: Option<String>,
        image_url: Option<String>,
    ) -> Result<Workspace, WorkspaceError> {
        let update_name = name.is_some();
        let update_image = image_url.is_some();

        let record = sqlx::query_as::<_, Workspace>(
            r#"
            UPDATE workspaces SET
                name = CASE WHEN ?1 THEN ?2 ELSE name END,
                image_url = CASE WHEN ?3 THEN ?4 ELSE image_url END,
                updated_at = ?5
            WHERE id = ?6
            RETURNING id, name, owner_user_id, image_url, invite_code, created_at, updated_at
            "#,
        )
        .bind(update_name)
        .bind(name)
        .bind(update_image)
        .bind(image_url)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(pool)
        .await?;

        Ok(record)
    }

    /// Replaces the invite code. Outstanding invite links die with the old
    /// code.
    pub async fn set_invite_code(
        pool: &SqlitePool,
        id: Uuid,
        invite_code: &str,
    ) -> Result<Workspace, WorkspaceError> {
        let record = sqlx::query_as::<_, Workspace>(
            r#"
            UPDATE workspaces SET invite_code = ?1, updated_at = ?2
            WHERE id = ?3
            RETURNING id, name, owner_user_id, image_url, invite_code, created_at, updated_at
            "#,
        )
        .bind(invite_code)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(pool)
        .await?;

        Ok(record)
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<(), WorkspaceError> {
        sqlx::query("DELETE FROM workspaces WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }
}
