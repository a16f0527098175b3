use async_trait::async_trait;
use uuid::Uuid;

use super::PgStore;
use crate::models::wishlist::{
    CreateWishlistGroupRequest, NewWishlistItem, UpdateWishlistGroupRequest, WishlistGroup,
    WishlistGroupSummary, WishlistItem, WishlistItemGroup, WishlistStatus,
};

#[async_trait]
pub trait WishlistRepository: Send + Sync {
    async fn create_item(&self, new: &NewWishlistItem) -> anyhow::Result<WishlistItem>;

    async fn get_item(&self, id: Uuid) -> anyhow::Result<Option<WishlistItem>>;

    async fn list_items(
        &self,
        profile_id: Uuid,
        status: Option<WishlistStatus>,
    ) -> anyhow::Result<Vec<WishlistItem>>;

    async fn update_notes(&self, id: Uuid, notes: Option<&str>)
        -> anyhow::Result<Option<WishlistItem>>;

    /// Guarded write: only succeeds while the item is still in `from`.
    async fn set_status(
        &self,
        id: Uuid,
        from: WishlistStatus,
        to: WishlistStatus,
    ) -> anyhow::Result<Option<WishlistItem>>;

    async fn delete_item(&self, id: Uuid) -> anyhow::Result<bool>;

    async fn create_group(
        &self,
        profile_id: Uuid,
        req: &CreateWishlistGroupRequest,
    ) -> anyhow::Result<WishlistGroup>;

    async fn get_group(&self, id: Uuid) -> anyhow::Result<Option<WishlistGroup>>;

    async fn list_groups(&self, profile_id: Uuid) -> anyhow::Result<Vec<WishlistGroupSummary>>;

    async fn update_group(
        &self,
        id: Uuid,
        req: &UpdateWishlistGroupRequest,
    ) -> anyhow::Result<Option<WishlistGroup>>;

    async fn delete_group(&self, id: Uuid) -> anyhow::Result<bool>;

    async fn add_item_to_group(&self, item_id: Uuid, group_id: Uuid) -> anyhow::Result<()>;

    async fn remove_item_from_group(&self, item_id: Uuid, group_id: Uuid)
        -> anyhow::Result<bool>;

    async fn memberships(&self, item_ids: &[Uuid]) -> anyhow::Result<Vec<WishlistItemGroup>>;

    async fn group_items(&self, group_id: Uuid) -> anyhow::Result<Vec<WishlistItem>>;
}

#[async_trait]
impl WishlistRepository for PgStore {
    async fn create_item(&self, new: &NewWishlistItem) -> anyhow::Result<WishlistItem> {
        let item = sqlx::query_as::<_, WishlistItem>(
            "INSERT INTO wishlist_items
                (profile_id, product_id, product_name, brand, image_url,
                 safety_score, rating, notes, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'saved')
             RETURNING *",
        )
        .bind(new.profile_id)
        .bind(new.product_id)
        .bind(&new.product_name)
        .bind(&new.brand)
        .bind(&new.image_url)
        .bind(new.safety_score)
        .bind(new.rating)
        .bind(&new.notes)
        .fetch_one(&self.pool)
        .await?;
        Ok(item)
    }

    async fn get_item(&self, id: Uuid) -> anyhow::Result<Option<WishlistItem>> {
        let item = sqlx::query_as::<_, WishlistItem>("SELECT * FROM wishlist_items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    async fn list_items(
        &self,
        profile_id: Uuid,
        status: Option<WishlistStatus>,
    ) -> anyhow::Result<Vec<WishlistItem>> {
        let items = sqlx::query_as::<_, WishlistItem>(
            "SELECT * FROM wishlist_items
             WHERE profile_id = $1 AND ($2::TEXT IS NULL OR status = $2)
             ORDER BY created_at DESC",
        )
        .bind(profile_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn update_notes(
        &self,
        id: Uuid,
        notes: Option<&str>,
    ) -> anyhow::Result<Option<WishlistItem>> {
        let item = sqlx::query_as::<_, WishlistItem>(
            "UPDATE wishlist_items SET notes = $1, updated_at = NOW()
             WHERE id = $2
             RETURNING *",
        )
        .bind(notes)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    async fn set_status(
        &self,
        id: Uuid,
        from: WishlistStatus,
        to: WishlistStatus,
    ) -> anyhow::Result<Option<WishlistItem>> {
        let item = sqlx::query_as::<_, WishlistItem>(
            "UPDATE wishlist_items SET status = $1, updated_at = NOW()
             WHERE id = $2 AND status = $3
             RETURNING *",
        )
        .bind(to.as_str())
        .bind(id)
        .bind(from.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    async fn delete_item(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM wishlist_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_group(
        &self,
        profile_id: Uuid,
        req: &CreateWishlistGroupRequest,
    ) -> anyhow::Result<WishlistGroup> {
        let group = sqlx::query_as::<_, WishlistGroup>(
            "INSERT INTO wishlist_groups (profile_id, name, emoji)
             VALUES ($1, $2, $3)
             RETURNING *",
        )
        .bind(profile_id)
        .bind(&req.name)
        .bind(&req.emoji)
        .fetch_one(&self.pool)
        .await?;
        Ok(group)
    }

    async fn get_group(&self, id: Uuid) -> anyhow::Result<Option<WishlistGroup>> {
        let group =
            sqlx::query_as::<_, WishlistGroup>("SELECT * FROM wishlist_groups WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(group)
    }

    async fn list_groups(&self, profile_id: Uuid) -> anyhow::Result<Vec<WishlistGroupSummary>> {
        let groups = sqlx::query_as::<_, WishlistGroupSummary>(
            "SELECT g.*, COUNT(ig.item_id)::BIGINT AS item_count
             FROM wishlist_groups g
             LEFT JOIN wishlist_item_groups ig ON ig.group_id = g.id
             WHERE g.profile_id = $1
             GROUP BY g.id
             ORDER BY g.name",
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    async fn update_group(
        &self,
        id: Uuid,
        req: &UpdateWishlistGroupRequest,
    ) -> anyhow::Result<Option<WishlistGroup>> {
        let group = sqlx::query_as::<_, WishlistGroup>(
            "UPDATE wishlist_groups
             SET name       = COALESCE($1, name),
                 emoji      = COALESCE($2, emoji),
                 updated_at = NOW()
             WHERE id = $3
             RETURNING *",
        )
        .bind(&req.name)
        .bind(&req.emoji)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(group)
    }

    async fn delete_group(&self, id: Uuid) -> anyhow::Result<bool> {
        // join rows go with the group (ON DELETE CASCADE); items stay
        let result = sqlx::query("DELETE FROM wishlist_groups WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_item_to_group(&self, item_id: Uuid, group_id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO wishlist_item_groups (item_id, group_id)
             VALUES ($1, $2)
             ON CONFLICT (item_id, group_id) DO NOTHING",
        )
        .bind(item_id)
        .bind(group_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_item_from_group(
        &self,
        item_id: Uuid,
        group_id: Uuid,
    ) -> anyhow::Result<bool> {
        let result =
            sqlx::query("DELETE FROM wishlist_item_groups WHERE item_id = $1 AND group_id = $2")
                .bind(item_id)
                .bind(group_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn memberships(&self, item_ids: &[Uuid]) -> anyhow::Result<Vec<WishlistItemGroup>> {
        if item_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, WishlistItemGroup>(
            "SELECT item_id, group_id FROM wishlist_item_groups WHERE item_id = ANY($1)",
        )
        .bind(item_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn group_items(&self, group_id: Uuid) -> anyhow::Result<Vec<WishlistItem>> {
        let items = sqlx::query_as::<_, WishlistItem>(
            "SELECT i.* FROM wishlist_items i
             JOIN wishlist_item_groups ig ON ig.item_id = i.id
             WHERE ig.group_id = $1
             ORDER BY i.created_at DESC",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }
}
