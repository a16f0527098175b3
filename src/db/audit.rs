use async_trait::async_trait;

use super::PgStore;
use crate::models::audit::{AuditEntry, AuditLogRow};

#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn insert_audit(&self, entry: &AuditEntry) -> anyhow::Result<()>;

    /// Newest first. `action_prefix` filters with `LIKE 'prefix%'`.
    async fn list_audit(
        &self,
        action_prefix: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<(Vec<AuditLogRow>, i64)>;
}

#[async_trait]
impl AuditRepository for PgStore {
    async fn insert_audit(&self, entry: &AuditEntry) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO audit_log (actor_id, action, resource_type, resource_id, details)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(entry.actor_id)
        .bind(&entry.action)
        .bind(&entry.resource_type)
        .bind(&entry.resource_id)
        .bind(&entry.details)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_audit(
        &self,
        action_prefix: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<(Vec<AuditLogRow>, i64)> {
        let pattern = action_prefix.map(|p| format!("{p}%"));

        let rows: Vec<AuditLogRow> = sqlx::query_as(
            "SELECT id, actor_id, action, resource_type, resource_id, details, created_at
             FROM audit_log
             WHERE ($1::TEXT IS NULL OR action LIKE $1)
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(&pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM audit_log WHERE ($1::TEXT IS NULL OR action LIKE $1)",
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows, total))
    }
}
