use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub barcode: Option<String>,
    pub name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub ingredients: Option<String>,
    pub image_url: Option<String>,
    pub safety_score: Option<i32>, // 0-100, higher is safer
    pub rating: Option<f64>,
    pub pao_months: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Catalog row as imported from CSV or created by an admin.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertProductRequest {
    pub barcode: Option<String>,
    pub name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub ingredients: Option<String>,
    pub image_url: Option<String>,
    pub safety_score: Option<i32>,
    pub rating: Option<f64>,
    pub pao_months: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ProductSearchQuery {
    pub q: String,
    pub limit: Option<i64>,
}
