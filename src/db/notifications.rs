use async_trait::async_trait;
use uuid::Uuid;

use super::PgStore;
use crate::models::notification::Notification;

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert(
        &self,
        user_id: Uuid,
        title: &str,
        body: &str,
        data: Option<&serde_json::Value>,
    ) -> anyhow::Result<Notification>;

    async fn list_for_user(&self, user_id: Uuid, limit: i64) -> anyhow::Result<Vec<Notification>>;

    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<bool>;

    /// (platform, token) pairs registered for the user.
    async fn push_tokens(&self, user_id: Uuid) -> anyhow::Result<Vec<(String, String)>>;

    async fn register_push_token(
        &self,
        user_id: Uuid,
        platform: &str,
        token: &str,
    ) -> anyhow::Result<()>;
}

#[async_trait]
impl NotificationRepository for PgStore {
    async fn insert(
        &self,
        user_id: Uuid,
        title: &str,
        body: &str,
        data: Option<&serde_json::Value>,
    ) -> anyhow::Result<Notification> {
        let row = sqlx::query_as::<_, Notification>(
            "INSERT INTO notifications (user_id, title, body, data)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(user_id)
        .bind(title)
        .bind(body)
        .bind(data)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_for_user(&self, user_id: Uuid, limit: i64) -> anyhow::Result<Vec<Notification>> {
        let rows = sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE user_id = $1
             ORDER BY created_at DESC
             LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE notifications SET read_at = COALESCE(read_at, NOW())
             WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn push_tokens(&self, user_id: Uuid) -> anyhow::Result<Vec<(String, String)>> {
        let tokens: Vec<(String, String)> =
            sqlx::query_as("SELECT platform, token FROM push_tokens WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(tokens)
    }

    async fn register_push_token(
        &self,
        user_id: Uuid,
        platform: &str,
        token: &str,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO push_tokens (user_id, platform, token)
             VALUES ($1, $2, $3)
             ON CONFLICT (user_id, token) DO NOTHING",
        )
        .bind(user_id)
        .bind(platform)
        .bind(token)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
