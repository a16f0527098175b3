use async_trait::async_trait;
use uuid::Uuid;

use super::PgStore;
use crate::models::routine::{RoutineSlot, RoutineStep};

#[async_trait]
pub trait RoutineRepository: Send + Sync {
    /// Appends the product at the end of the slot. `None` when the product
    /// is already in that slot.
    async fn add_step(
        &self,
        child_id: Uuid,
        child_product_id: Uuid,
        slot: RoutineSlot,
    ) -> anyhow::Result<Option<RoutineStep>>;

    async fn list_steps(
        &self,
        child_id: Uuid,
        slot: Option<RoutineSlot>,
    ) -> anyhow::Result<Vec<RoutineStep>>;

    async fn get_step(&self, id: Uuid) -> anyhow::Result<Option<RoutineStep>>;

    async fn remove_step(&self, id: Uuid) -> anyhow::Result<bool>;
}

#[async_trait]
impl RoutineRepository for PgStore {
    async fn add_step(
        &self,
        child_id: Uuid,
        child_product_id: Uuid,
        slot: RoutineSlot,
    ) -> anyhow::Result<Option<RoutineStep>> {
        let step = sqlx::query_as::<_, RoutineStep>(
            "INSERT INTO routine_steps (child_id, child_product_id, slot, position)
             VALUES ($1, $2, $3,
                     (SELECT COALESCE(MAX(position), -1) + 1
                      FROM routine_steps WHERE child_id = $1 AND slot = $3))
             ON CONFLICT (child_id, child_product_id, slot) DO NOTHING
             RETURNING *",
        )
        .bind(child_id)
        .bind(child_product_id)
        .bind(slot.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(step)
    }

    async fn list_steps(
        &self,
        child_id: Uuid,
        slot: Option<RoutineSlot>,
    ) -> anyhow::Result<Vec<RoutineStep>> {
        let steps = sqlx::query_as::<_, RoutineStep>(
            "SELECT * FROM routine_steps
             WHERE child_id = $1 AND ($2::TEXT IS NULL OR slot = $2)
             ORDER BY slot DESC, position",
        )
        .bind(child_id)
        .bind(slot.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;
        Ok(steps)
    }

    async fn get_step(&self, id: Uuid) -> anyhow::Result<Option<RoutineStep>> {
        let step = sqlx::query_as::<_, RoutineStep>("SELECT * FROM routine_steps WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(step)
    }

    async fn remove_step(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM routine_steps WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
