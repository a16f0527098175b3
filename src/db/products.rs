use async_trait::async_trait;
use uuid::Uuid;

use super::PgStore;
use crate::models::product::{Product, UpsertProductRequest};

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn search(&self, query: &str, limit: i64) -> anyhow::Result<Vec<Product>>;

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Product>>;

    async fn get_by_barcode(&self, barcode: &str) -> anyhow::Result<Option<Product>>;

    /// Inserts, or updates the row with the same barcode.
    async fn upsert(&self, req: &UpsertProductRequest) -> anyhow::Result<Product>;
}

#[async_trait]
impl ProductRepository for PgStore {
    async fn search(&self, query: &str, limit: i64) -> anyhow::Result<Vec<Product>> {
        let pattern = format!("%{}%", query.trim());
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products
             WHERE name ILIKE $1 OR brand ILIKE $1
             ORDER BY safety_score DESC NULLS LAST, name
             LIMIT $2",
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    async fn get_by_barcode(&self, barcode: &str) -> anyhow::Result<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE barcode = $1")
            .bind(barcode)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    async fn upsert(&self, req: &UpsertProductRequest) -> anyhow::Result<Product> {
        let product = sqlx::query_as::<_, Product>(
            "INSERT INTO products
                (barcode, name, brand, category, ingredients, image_url,
                 safety_score, rating, pao_months)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (barcode) DO UPDATE
             SET name         = EXCLUDED.name,
                 brand        = EXCLUDED.brand,
                 category     = EXCLUDED.category,
                 ingredients  = EXCLUDED.ingredients,
                 image_url    = EXCLUDED.image_url,
                 safety_score = EXCLUDED.safety_score,
                 rating       = EXCLUDED.rating,
                 pao_months   = EXCLUDED.pao_months,
                 updated_at   = NOW()
             RETURNING *",
        )
        .bind(&req.barcode)
        .bind(&req.name)
        .bind(&req.brand)
        .bind(&req.category)
        .bind(&req.ingredients)
        .bind(&req.image_url)
        .bind(req.safety_score)
        .bind(req.rating)
        .bind(req.pao_months)
        .fetch_one(&self.pool)
        .await?;
        Ok(product)
    }
}
