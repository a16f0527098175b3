use async_trait::async_trait;
use uuid::Uuid;

use super::PgStore;
use crate::models::prompt::PromptVersion;

#[async_trait]
pub trait PromptRepository: Send + Sync {
    async fn active_version(&self, key: &str) -> anyhow::Result<Option<PromptVersion>>;

    async fn list_versions(&self, key: &str) -> anyhow::Result<Vec<PromptVersion>>;

    /// Stores `content` as the next version number for `key`, inactive.
    async fn create_version(
        &self,
        key: &str,
        content: &str,
        model: Option<&str>,
        created_by: Option<Uuid>,
    ) -> anyhow::Result<PromptVersion>;

    /// Makes `version` the only active one for `key`.
    async fn activate_version(&self, key: &str, version: i32)
        -> anyhow::Result<Option<PromptVersion>>;
}

#[async_trait]
impl PromptRepository for PgStore {
    async fn active_version(&self, key: &str) -> anyhow::Result<Option<PromptVersion>> {
        let prompt = sqlx::query_as::<_, PromptVersion>(
            "SELECT * FROM prompt_versions WHERE prompt_key = $1 AND is_active = TRUE",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(prompt)
    }

    async fn list_versions(&self, key: &str) -> anyhow::Result<Vec<PromptVersion>> {
        let versions = sqlx::query_as::<_, PromptVersion>(
            "SELECT * FROM prompt_versions WHERE prompt_key = $1 ORDER BY version DESC",
        )
        .bind(key)
        .fetch_all(&self.pool)
        .await?;
        Ok(versions)
    }

    async fn create_version(
        &self,
        key: &str,
        content: &str,
        model: Option<&str>,
        created_by: Option<Uuid>,
    ) -> anyhow::Result<PromptVersion> {
        let prompt = sqlx::query_as::<_, PromptVersion>(
            "INSERT INTO prompt_versions (prompt_key, version, content, model, created_by)
             VALUES ($1,
                     (SELECT COALESCE(MAX(version), 0) + 1 FROM prompt_versions WHERE prompt_key = $1),
                     $2, $3, $4)
             RETURNING *",
        )
        .bind(key)
        .bind(content)
        .bind(model)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(prompt)
    }

    async fn activate_version(
        &self,
        key: &str,
        version: i32,
    ) -> anyhow::Result<Option<PromptVersion>> {
        let mut tx = self.pool.begin().await?;

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM prompt_versions WHERE prompt_key = $1 AND version = $2)",
        )
        .bind(key)
        .bind(version)
        .fetch_one(&mut *tx)
        .await?;
        if !exists {
            return Ok(None);
        }

        sqlx::query(
            "UPDATE prompt_versions SET is_active = FALSE
             WHERE prompt_key = $1 AND is_active = TRUE",
        )
        .bind(key)
        .execute(&mut *tx)
        .await?;

        let prompt = sqlx::query_as::<_, PromptVersion>(
            "UPDATE prompt_versions SET is_active = TRUE
             WHERE prompt_key = $1 AND version = $2
             RETURNING *",
        )
        .bind(key)
        .bind(version)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(prompt))
    }
}
