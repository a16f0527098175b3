use async_trait::async_trait;
use uuid::Uuid;

use super::PgStore;
use crate::models::child::{
    AddGuardianRequest, Child, CreateChildRequest, ManagedChild, UpdateChildRequest,
};

#[async_trait]
pub trait FamilyRepository: Send + Sync {
    async fn list_children(&self, parent_id: Uuid) -> anyhow::Result<Vec<Child>>;

    async fn get_child(&self, id: Uuid) -> anyhow::Result<Option<Child>>;

    async fn create_child(&self, parent_id: Uuid, req: &CreateChildRequest)
        -> anyhow::Result<Child>;

    async fn update_child(&self, id: Uuid, req: &UpdateChildRequest)
        -> anyhow::Result<Option<Child>>;

    async fn delete_child(&self, id: Uuid) -> anyhow::Result<bool>;

    /// Owning parent or any managing guardian.
    async fn is_parent_of(&self, parent_id: Uuid, child_id: Uuid) -> anyhow::Result<bool>;

    /// Owning parent first, then guardians.
    async fn parents_of(&self, child_id: Uuid) -> anyhow::Result<Vec<Uuid>>;

    async fn add_guardian(&self, child_id: Uuid, req: &AddGuardianRequest)
        -> anyhow::Result<ManagedChild>;

    async fn remove_guardian(&self, child_id: Uuid, parent_id: Uuid) -> anyhow::Result<bool>;
}

#[async_trait]
impl FamilyRepository for PgStore {
    async fn list_children(&self, parent_id: Uuid) -> anyhow::Result<Vec<Child>> {
        let children = sqlx::query_as::<_, Child>(
            "SELECT c.* FROM children c
             WHERE c.parent_id = $1
                OR EXISTS (SELECT 1 FROM managed_children mc
                           WHERE mc.child_id = c.id AND mc.parent_id = $1)
             ORDER BY c.display_name",
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(children)
    }

    async fn get_child(&self, id: Uuid) -> anyhow::Result<Option<Child>> {
        let child = sqlx::query_as::<_, Child>("SELECT * FROM children WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(child)
    }

    async fn create_child(
        &self,
        parent_id: Uuid,
        req: &CreateChildRequest,
    ) -> anyhow::Result<Child> {
        let child = sqlx::query_as::<_, Child>(
            "INSERT INTO children (parent_id, display_name, birth_year, avatar_emoji, requires_approval)
             VALUES ($1, $2, $3, $4, COALESCE($5, TRUE))
             RETURNING *",
        )
        .bind(parent_id)
        .bind(&req.display_name)
        .bind(req.birth_year)
        .bind(&req.avatar_emoji)
        .bind(req.requires_approval)
        .fetch_one(&self.pool)
        .await?;
        Ok(child)
    }

    async fn update_child(
        &self,
        id: Uuid,
        req: &UpdateChildRequest,
    ) -> anyhow::Result<Option<Child>> {
        let child = sqlx::query_as::<_, Child>(
            "UPDATE children
             SET display_name      = COALESCE($1, display_name),
                 birth_year        = COALESCE($2, birth_year),
                 avatar_emoji      = COALESCE($3, avatar_emoji),
                 requires_approval = COALESCE($4, requires_approval),
                 updated_at        = NOW()
             WHERE id = $5
             RETURNING *",
        )
        .bind(&req.display_name)
        .bind(req.birth_year)
        .bind(&req.avatar_emoji)
        .bind(req.requires_approval)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(child)
    }

    async fn delete_child(&self, id: Uuid) -> anyhow::Result<bool> {
        // FK cascades take care of managed_children, wishlists, shelf and routines
        let result = sqlx::query("DELETE FROM children WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn is_parent_of(&self, parent_id: Uuid, child_id: Uuid) -> anyhow::Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM children WHERE id = $1 AND parent_id = $2
                UNION ALL
                SELECT 1 FROM managed_children WHERE child_id = $1 AND parent_id = $2
             )",
        )
        .bind(child_id)
        .bind(parent_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn parents_of(&self, child_id: Uuid) -> anyhow::Result<Vec<Uuid>> {
        let parents: Vec<Uuid> = sqlx::query_scalar(
            "SELECT parent_id FROM (
                SELECT parent_id, 0 AS rank, created_at FROM children WHERE id = $1
                UNION ALL
                SELECT mc.parent_id, 1 AS rank, mc.created_at
                FROM managed_children mc
                JOIN children c ON c.id = mc.child_id
                WHERE mc.child_id = $1 AND mc.parent_id <> c.parent_id
             ) p
             ORDER BY rank, created_at",
        )
        .bind(child_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(parents)
    }

    async fn add_guardian(
        &self,
        child_id: Uuid,
        req: &AddGuardianRequest,
    ) -> anyhow::Result<ManagedChild> {
        let row = sqlx::query_as::<_, ManagedChild>(
            "INSERT INTO managed_children (child_id, parent_id, relationship)
             VALUES ($1, $2, $3)
             ON CONFLICT (child_id, parent_id) DO UPDATE SET relationship = EXCLUDED.relationship
             RETURNING *",
        )
        .bind(child_id)
        .bind(req.parent_id)
        .bind(&req.relationship)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn remove_guardian(&self, child_id: Uuid, parent_id: Uuid) -> anyhow::Result<bool> {
        let result =
            sqlx::query("DELETE FROM managed_children WHERE child_id = $1 AND parent_id = $2")
                .bind(child_id)
                .bind(parent_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
