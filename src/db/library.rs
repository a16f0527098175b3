use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::PgStore;
use crate::models::shelf::{ChildProduct, NewChildProduct, UpdateChildProductRequest};

/// A child's product library, also shown as their shelf.
#[async_trait]
pub trait LibraryRepository: Send + Sync {
    async fn add_product(&self, new: &NewChildProduct) -> anyhow::Result<ChildProduct>;

    async fn get_product(&self, id: Uuid) -> anyhow::Result<Option<ChildProduct>>;

    async fn list_for_child(&self, child_id: Uuid) -> anyhow::Result<Vec<ChildProduct>>;

    /// Bumps usage_count, sets last_used_at and stamps opened_at on first use.
    async fn record_usage(&self, id: Uuid, at: DateTime<Utc>)
        -> anyhow::Result<Option<ChildProduct>>;

    async fn update_product(
        &self,
        id: Uuid,
        req: &UpdateChildProductRequest,
    ) -> anyhow::Result<Option<ChildProduct>>;

    async fn delete_product(&self, id: Uuid) -> anyhow::Result<bool>;
}

#[async_trait]
impl LibraryRepository for PgStore {
    async fn add_product(&self, new: &NewChildProduct) -> anyhow::Result<ChildProduct> {
        let product = sqlx::query_as::<_, ChildProduct>(
            "INSERT INTO child_products
                (child_id, product_id, product_name, brand, image_url, approval_id,
                 pao_months, expiry_date)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(new.child_id)
        .bind(new.product_id)
        .bind(&new.product_name)
        .bind(&new.brand)
        .bind(&new.image_url)
        .bind(new.approval_id)
        .bind(new.pao_months)
        .bind(new.expiry_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(product)
    }

    async fn get_product(&self, id: Uuid) -> anyhow::Result<Option<ChildProduct>> {
        let product =
            sqlx::query_as::<_, ChildProduct>("SELECT * FROM child_products WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(product)
    }

    async fn list_for_child(&self, child_id: Uuid) -> anyhow::Result<Vec<ChildProduct>> {
        let products = sqlx::query_as::<_, ChildProduct>(
            "SELECT * FROM child_products WHERE child_id = $1 ORDER BY created_at DESC",
        )
        .bind(child_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    async fn record_usage(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> anyhow::Result<Option<ChildProduct>> {
        let product = sqlx::query_as::<_, ChildProduct>(
            "UPDATE child_products
             SET usage_count  = usage_count + 1,
                 last_used_at = $1,
                 opened_at    = COALESCE(opened_at, $1::date),
                 updated_at   = NOW()
             WHERE id = $2
             RETURNING *",
        )
        .bind(at)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    async fn update_product(
        &self,
        id: Uuid,
        req: &UpdateChildProductRequest,
    ) -> anyhow::Result<Option<ChildProduct>> {
        let product = sqlx::query_as::<_, ChildProduct>(
            "UPDATE child_products
             SET opened_at   = COALESCE($1, opened_at),
                 pao_months  = COALESCE($2, pao_months),
                 expiry_date = COALESCE($3, expiry_date),
                 updated_at  = NOW()
             WHERE id = $4
             RETURNING *",
        )
        .bind(req.opened_at)
        .bind(req.pao_months)
        .bind(req.expiry_date)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    async fn delete_product(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM child_products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
