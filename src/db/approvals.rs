use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::PgStore;
use crate::models::approval::{
    ApprovalHistory, ApprovalStatus, ApprovalWithChild, NewApproval, NewApprovalHistory,
    ProductApproval, ProductFlag, StatusChange,
};

#[async_trait]
pub trait ApprovalRepository: Send + Sync {
    async fn create(&self, new: &NewApproval) -> anyhow::Result<ProductApproval>;

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<ProductApproval>>;

    async fn list_pending_for_parent(&self, parent_id: Uuid)
        -> anyhow::Result<Vec<ApprovalWithChild>>;

    async fn list_for_child(&self, child_id: Uuid) -> anyhow::Result<Vec<ProductApproval>>;

    async fn flags_for(&self, approval_ids: &[Uuid]) -> anyhow::Result<Vec<ProductFlag>>;

    /// Writes `change.to` only if the row is still in `change.from`.
    /// Returns `None` when another writer got there first.
    async fn set_status(
        &self,
        id: Uuid,
        change: &StatusChange,
    ) -> anyhow::Result<Option<ProductApproval>>;

    async fn insert_history(&self, entry: &NewApprovalHistory) -> anyhow::Result<ApprovalHistory>;

    async fn history_for(&self, approval_id: Uuid) -> anyhow::Result<Vec<ApprovalHistory>>;

    async fn list_stale_pending(
        &self,
        requested_before: DateTime<Utc>,
    ) -> anyhow::Result<Vec<ProductApproval>>;

    async fn pending_for_wishlist_item(
        &self,
        item_id: Uuid,
    ) -> anyhow::Result<Option<ProductApproval>>;
}

#[async_trait]
impl ApprovalRepository for PgStore {
    async fn create(&self, new: &NewApproval) -> anyhow::Result<ProductApproval> {
        let req = &new.request;
        let approval = sqlx::query_as::<_, ProductApproval>(
            "INSERT INTO product_approvals
                (child_id, parent_id, product_id, product_name, brand, barcode,
                 image_url, safety_score, wishlist_item_id, child_notes, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'pending')
             RETURNING *",
        )
        .bind(new.child_id)
        .bind(new.parent_id)
        .bind(req.product_id)
        .bind(&req.product_name)
        .bind(&req.brand)
        .bind(&req.barcode)
        .bind(&req.image_url)
        .bind(req.safety_score)
        .bind(req.wishlist_item_id)
        .bind(&req.child_notes)
        .fetch_one(&self.pool)
        .await?;
        Ok(approval)
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<ProductApproval>> {
        let approval = sqlx::query_as::<_, ProductApproval>(
            "SELECT * FROM product_approvals WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(approval)
    }

    async fn list_pending_for_parent(
        &self,
        parent_id: Uuid,
    ) -> anyhow::Result<Vec<ApprovalWithChild>> {
        let rows = sqlx::query_as::<_, ApprovalWithChild>(
            "SELECT a.*, c.display_name AS child_name
             FROM product_approvals a
             JOIN children c ON c.id = a.child_id
             WHERE a.status = 'pending'
               AND (c.parent_id = $1
                    OR EXISTS (SELECT 1 FROM managed_children mc
                               WHERE mc.child_id = c.id AND mc.parent_id = $1))
             ORDER BY a.requested_at DESC",
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_for_child(&self, child_id: Uuid) -> anyhow::Result<Vec<ProductApproval>> {
        let rows = sqlx::query_as::<_, ProductApproval>(
            "SELECT * FROM product_approvals WHERE child_id = $1 ORDER BY requested_at DESC",
        )
        .bind(child_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn flags_for(&self, approval_ids: &[Uuid]) -> anyhow::Result<Vec<ProductFlag>> {
        if approval_ids.is_empty() {
            return Ok(Vec::new());
        }
        let flags = sqlx::query_as::<_, ProductFlag>(
            "SELECT * FROM product_flags WHERE approval_id = ANY($1) ORDER BY created_at",
        )
        .bind(approval_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(flags)
    }

    async fn set_status(
        &self,
        id: Uuid,
        change: &StatusChange,
    ) -> anyhow::Result<Option<ProductApproval>> {
        let approval = sqlx::query_as::<_, ProductApproval>(
            "UPDATE product_approvals
             SET status       = $1,
                 reviewed_by  = COALESCE($2, reviewed_by),
                 reviewed_at  = $3,
                 parent_notes = COALESCE($4, parent_notes),
                 updated_at   = NOW()
             WHERE id = $5 AND status = $6
             RETURNING *",
        )
        .bind(change.to.as_str())
        .bind(change.reviewed_by)
        .bind(change.at)
        .bind(&change.parent_notes)
        .bind(id)
        .bind(change.from.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(approval)
    }

    async fn insert_history(&self, entry: &NewApprovalHistory) -> anyhow::Result<ApprovalHistory> {
        let row = sqlx::query_as::<_, ApprovalHistory>(
            "INSERT INTO approval_history (approval_id, action, actor_id, notes)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(entry.approval_id)
        .bind(entry.action.as_str())
        .bind(entry.actor_id)
        .bind(&entry.notes)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn history_for(&self, approval_id: Uuid) -> anyhow::Result<Vec<ApprovalHistory>> {
        let rows = sqlx::query_as::<_, ApprovalHistory>(
            "SELECT * FROM approval_history WHERE approval_id = $1 ORDER BY created_at",
        )
        .bind(approval_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_stale_pending(
        &self,
        requested_before: DateTime<Utc>,
    ) -> anyhow::Result<Vec<ProductApproval>> {
        let rows = sqlx::query_as::<_, ProductApproval>(
            "SELECT * FROM product_approvals
             WHERE status = $1 AND requested_at < $2
             ORDER BY requested_at",
        )
        .bind(ApprovalStatus::Pending.as_str())
        .bind(requested_before)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn pending_for_wishlist_item(
        &self,
        item_id: Uuid,
    ) -> anyhow::Result<Option<ProductApproval>> {
        let approval = sqlx::query_as::<_, ProductApproval>(
            "SELECT * FROM product_approvals
             WHERE wishlist_item_id = $1 AND status = $2
             ORDER BY requested_at DESC
             LIMIT 1",
        )
        .bind(item_id)
        .bind(ApprovalStatus::Pending.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(approval)
    }
}
