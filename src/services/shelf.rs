use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    db::{LibraryRepository, Repositories},
    error::{AppError, AppResult},
    models::{
        auth::AuthenticatedUser,
        shelf::{get_expiry_status, ChildProduct, ExpiryStatus, ShelfItem, UpdateChildProductRequest},
    },
    services::family::FamilyService,
};

pub struct ShelfService {
    library: Arc<dyn LibraryRepository>,
    family: Arc<FamilyService>,
}

impl ShelfService {
    pub fn new(repos: &Repositories, family: Arc<FamilyService>) -> Self {
        Self {
            library: repos.library.clone(),
            family,
        }
    }

    /// Child's products with expiry annotations, expired and soon-to-expire first.
    pub async fn list_shelf(
        &self,
        user: &AuthenticatedUser,
        child_id: Uuid,
        today: NaiveDate,
    ) -> AppResult<Vec<ShelfItem>> {
        self.family.ensure_access(user, child_id).await?;
        let mut items: Vec<ShelfItem> = self
            .library
            .list_for_child(child_id)
            .await?
            .into_iter()
            .map(|p| ShelfItem::from_product(p, today))
            .collect();
        items.sort_by_key(|item| {
            let rank = match item.expiry_status {
                ExpiryStatus::Expired => 0,
                ExpiryStatus::ExpiringSoon => 1,
                ExpiryStatus::Ok => 2,
            };
            (rank, item.days_until_expiry.unwrap_or(i64::MAX))
        });
        Ok(items)
    }

    pub async fn get_expiry_status(
        &self,
        user: &AuthenticatedUser,
        product_id: Uuid,
        today: NaiveDate,
    ) -> AppResult<ExpiryStatus> {
        let product = self.owned_product(user, product_id).await?;
        Ok(get_expiry_status(&product, today))
    }

    pub async fn record_usage(
        &self,
        user: &AuthenticatedUser,
        product_id: Uuid,
    ) -> AppResult<ChildProduct> {
        self.owned_product(user, product_id).await?;
        self.library
            .record_usage(product_id, Utc::now())
            .await?
            .ok_or(AppError::NotFound("Product"))
    }

    pub async fn update_product(
        &self,
        user: &AuthenticatedUser,
        product_id: Uuid,
        req: &UpdateChildProductRequest,
    ) -> AppResult<ChildProduct> {
        if matches!(req.pao_months, Some(m) if m <= 0) {
            return Err(AppError::validation("pao_months must be positive"));
        }
        self.owned_product(user, product_id).await?;
        self.library
            .update_product(product_id, req)
            .await?
            .ok_or(AppError::NotFound("Product"))
    }

    pub async fn remove_product(&self, user: &AuthenticatedUser, product_id: Uuid) -> AppResult<()> {
        self.owned_product(user, product_id).await?;
        self.library.delete_product(product_id).await?;
        Ok(())
    }

    async fn owned_product(
        &self,
        user: &AuthenticatedUser,
        product_id: Uuid,
    ) -> AppResult<ChildProduct> {
        let product = self
            .library
            .get_product(product_id)
            .await?
            .ok_or(AppError::NotFound("Product"))?;
        self.family.ensure_access(user, product.child_id).await?;
        Ok(product)
    }
}
