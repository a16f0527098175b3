use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::{ProductRepository, Repositories},
    error::{AppError, AppResult},
    models::product::{Product, UpsertProductRequest},
};

const MAX_SEARCH_RESULTS: i64 = 50;

pub struct ProductService {
    repo: Arc<dyn ProductRepository>,
}

impl ProductService {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            repo: repos.products.clone(),
        }
    }

    pub async fn search(&self, query: &str, limit: Option<i64>) -> AppResult<Vec<Product>> {
        let query = query.trim();
        if query.len() < 2 {
            return Err(AppError::validation("search needs at least 2 characters"));
        }
        let limit = limit.unwrap_or(20).clamp(1, MAX_SEARCH_RESULTS);
        Ok(self.repo.search(query, limit).await?)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Product> {
        self.repo.get(id).await?.ok_or(AppError::NotFound("Product"))
    }

    /// Scan flow: look a product up by the code printed on the package.
    pub async fn get_by_barcode(&self, barcode: &str) -> AppResult<Product> {
        let code = normalize_barcode(barcode)
            .ok_or_else(|| AppError::validation("barcode must be 8 to 14 digits"))?;
        self.repo
            .get_by_barcode(&code)
            .await?
            .ok_or(AppError::NotFound("Product"))
    }

    pub async fn upsert(&self, req: &UpsertProductRequest) -> AppResult<Product> {
        if req.name.trim().is_empty() {
            return Err(AppError::validation("name is required"));
        }
        if matches!(req.safety_score, Some(s) if !(0..=100).contains(&s)) {
            return Err(AppError::validation("safety_score must be between 0 and 100"));
        }
        let mut req = req.clone();
        req.barcode = match req.barcode.as_deref() {
            Some(code) => Some(
                normalize_barcode(code)
                    .ok_or_else(|| AppError::validation("barcode must be 8 to 14 digits"))?,
            ),
            None => None,
        };
        Ok(self.repo.upsert(&req).await?)
    }
}

/// Strips spaces and dashes; EAN-8 through GTIN-14 are accepted.
pub fn normalize_barcode(raw: &str) -> Option<String> {
    let code: String = raw.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
    let valid = (8..=14).contains(&code.len()) && code.chars().all(|c| c.is_ascii_digit());
    valid.then_some(code)
}

#[cfg(test)]
mod tests {
    use super::normalize_barcode;

    #[test]
    fn barcode_normalization() {
        assert_eq!(normalize_barcode("3600 5233-0154 2").as_deref(), Some("3600523301542"));
        assert_eq!(normalize_barcode("12345678").as_deref(), Some("12345678"));
        assert_eq!(normalize_barcode("1234567"), None);
        assert_eq!(normalize_barcode("36005233015AB"), None);
    }
}
