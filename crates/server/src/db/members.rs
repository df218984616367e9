use api_types::{Member, MemberRole, MemberWithProfile};
use chrono::Utc;
use sqlx::{Executor, QueryBuilder, Sqlite, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum MemberError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("already a member")]
    AlreadyMember,
}

pub struct MemberRepository;

impl MemberRepository {
    /// Membership resolver: at most one row exists per (workspace, user)
    /// pair. Absence is a normal outcome, not an error.
    pub async fn find_by_workspace_and_user(
        pool: &SqlitePool,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Member>, MemberError> {
        let record = sqlx::query_as::<_, Member>(
            r#"
            SELECT id, workspace_id, user_id, role, created_at
            FROM members
            WHERE workspace_id = ?1 AND user_id = ?2
            "#,
        )
        .bind(workspace_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(record)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Member>, MemberError> {
        let record = sqlx::query_as::<_, Member>(
            "SELECT id, workspace_id, user_id, role, created_at FROM members WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(record)
    }

    pub async fn create<'e, E>(
        executor: E,
        workspace_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<Member, MemberError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query_as::<_, Member>(
            r#"
            INSERT INTO members (id, workspace_id, user_id, role, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id, workspace_id, user_id, role, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(workspace_id)
        .bind(user_id)
        .bind(role)
        .bind(Utc::now())
        .fetch_one(executor)
        .await;

        match result {
            Ok(member) => Ok(member),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(MemberError::AlreadyMember)
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Members of a workspace with display name and email joined in. The
    /// name falls back to the email when the profile name is empty.
    pub async fn list_by_workspace_with_profiles(
        pool: &SqlitePool,
        workspace_id: Uuid,
    ) -> Result<Vec<MemberWithProfile>, MemberError> {
        let records = sqlx::query_as::<_, MemberWithProfile>(
            r#"
            SELECT m.id, m.workspace_id, m.user_id, m.role, m.created_at, u.name, u.email
            FROM members m
            INNER JOIN users u ON u.id = m.user_id
            WHERE m.workspace_id = ?1
            ORDER BY m.created_at ASC
            "#,
        )
        .bind(workspace_id)
        .fetch_all(pool)
        .await?;

        Ok(records.into_iter().map(apply_name_fallback).collect())
    }

    /// Batched profile lookup for enrichment: one query for the whole id
    /// set.
    pub async fn find_with_profiles_by_ids(
        pool: &SqlitePool,
        ids: &[Uuid],
    ) -> Result<Vec<MemberWithProfile>, MemberError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT m.id, m.workspace_id, m.user_id, m.role, m.created_at, u.name, u.email
            FROM members m
            INNER JOIN users u ON u.id = m.user_id
            WHERE m.id IN (
            "#,
        );
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        query.push(")");

        let records = query
            .build_query_as::<MemberWithProfile>()
            .fetch_all(pool)
            .await?;

        Ok(records.into_iter().map(apply_name_fallback).collect())
    }

    pub async fn count_by_workspace(
        pool: &SqlitePool,
        workspace_id: Uuid,
    ) -> Result<i64, MemberError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM members WHERE workspace_id = ?1")
                .bind(workspace_id)
                .fetch_one(pool)
                .await?;

        Ok(count)
    }

    pub async fn update_role(
        pool: &SqlitePool,
        id: Uuid,
        role: MemberRole,
    ) -> Result<Member, MemberError> {
        let record = sqlx::query_as::<_, Member>(
            r#"
            UPDATE members SET role = ?1
            WHERE id = ?2
            RETURNING id, workspace_id, user_id, role, created_at
            "#,
        )
        .bind(role)
        .bind(id)
        .fetch_one(pool)
        .await?;

        Ok(record)
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<(), MemberError> {
        sqlx::query("DELETE FROM members WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }
}

fn apply_name_fallback(mut member: MemberWithProfile) -> MemberWithProfile {
    if member.name.is_empty() {
        member.name = member.email.clone();
    }
    member
}
