use api_types::Project;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub struct ProjectRepository;

impl ProjectRepository {
    pub async fn create(
        pool: &SqlitePool,
        workspace_id: Uuid,
        name: &str,
        image_url: Option<String>,
    ) -> Result<Project, ProjectError> {
        let now = Utc::now();
        let record = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (id, workspace_id, name, image_url, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING id, workspace_id, name, image_url, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(workspace_id)
        .bind(name)
        .bind(image_url)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(record)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Project>, ProjectError> {
        let record = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, workspace_id, name, image_url, created_at, updated_at
            FROM projects
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(record)
    }

    pub async fn list_by_workspace(
        pool: &SqlitePool,
        workspace_id: Uuid,
    ) -> Result<Vec<Project>, ProjectError> {
        let records = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, workspace_id, name, image_url, created_at, updated_at
            FROM projects
            WHERE workspace_id = ?1
            ORDER BY created_at DESC
            "#,
        )
        .bind(workspace_id)
        .fetch_all(pool)
        .await?;

        Ok(records)
    }

    /// Batched lookup for enrichment: one query for the whole id set.
    pub async fn find_by_ids(pool: &SqlitePool, ids: &[Uuid]) -> Result<Vec<Project>, ProjectError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT id, workspace_id, name, image_url, created_at, updated_at FROM projects WHERE id IN (",
        );
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        query.push(")");

        let records = query.build_query_as::<Project>().fetch_all(pool).await?;
        Ok(records)
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        name: Option<String>,
        image_url: Option<String>,
    ) -> Result<Project, ProjectError> {
        let update_name = name.is_some();
        let update_image = image_url.is_some();

        let record = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects SET
                name = CASE WHEN ?1 THEN ?2 ELSE name END,
                image_url = CASE WHEN ?3 THEN ?4 ELSE image_url END,
                updated_at = ?5
            WHERE id = ?6
            RETURNING id, workspace_id, name, image_url, created_at, updated_at
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

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<(), ProjectError> {
        sqlx::query("DELETE FROM projects WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }
}
