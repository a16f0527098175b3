use async_trait::async_trait;
use uuid::Uuid;

use super::PgStore;
use crate::models::feature_flag::FeatureFlag;

#[async_trait]
pub trait FeatureFlagRepository: Send + Sync {
    async fn list_flags(&self) -> anyhow::Result<Vec<FeatureFlag>>;

    async fn set_flag(
        &self,
        key: &str,
        enabled: bool,
        description: Option<&str>,
        updated_by: Option<Uuid>,
    ) -> anyhow::Result<FeatureFlag>;
}

#[async_trait]
impl FeatureFlagRepository for PgStore {
    async fn list_flags(&self) -> anyhow::Result<Vec<FeatureFlag>> {
        let flags = sqlx::query_as::<_, FeatureFlag>("SELECT * FROM feature_flags ORDER BY key")
            .fetch_all(&self.pool)
            .await?;
        Ok(flags)
    }

    async fn set_flag(
        &self,
        key: &str,
        enabled: bool,
        description: Option<&str>,
        updated_by: Option<Uuid>,
    ) -> anyhow::Result<FeatureFlag> {
        let flag = sqlx::query_as::<_, FeatureFlag>(
            "INSERT INTO feature_flags (key, enabled, description, updated_by)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (key) DO UPDATE
             SET enabled     = EXCLUDED.enabled,
                 description = COALESCE(EXCLUDED.description, feature_flags.description),
                 updated_by  = EXCLUDED.updated_by,
                 updated_at  = NOW()
             RETURNING *",
        )
        .bind(key)
        .bind(enabled)
        .bind(description)
        .bind(updated_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(flag)
    }
}
