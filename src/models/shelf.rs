use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Days before expiry at which a product starts showing as expiring soon.
pub const EXPIRING_SOON_DAYS: i64 = 30;

/// A product instance owned by a child (the child's "shelf").
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChildProduct {
    pub id: Uuid,
    pub child_id: Uuid,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub brand: Option<String>,
    pub image_url: Option<String>,
    pub approval_id: Option<Uuid>,
    pub usage_count: i32,
    pub last_used_at: Option<DateTime<Utc>>,
    pub opened_at: Option<NaiveDate>,
    pub pao_months: Option<i32>, // period after opening
    pub expiry_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewChildProduct {
    pub child_id: Uuid,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub brand: Option<String>,
    pub image_url: Option<String>,
    pub approval_id: Option<Uuid>,
    pub pao_months: Option<i32>,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateChildProductRequest {
    pub opened_at: Option<NaiveDate>,
    pub pao_months: Option<i32>,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryStatus {
    Expired,
    ExpiringSoon,
    Ok,
}

impl ChildProduct {
    /// Date the product goes off once opened, if both parts are known.
    pub fn pao_expiry(&self) -> Option<NaiveDate> {
        let opened = self.opened_at?;
        let months = u32::try_from(self.pao_months?).ok()?;
        opened.checked_add_months(Months::new(months))
    }

    /// Earlier of the printed expiry date and the PAO-derived date.
    pub fn effective_expiry(&self) -> Option<NaiveDate> {
        match (self.expiry_date, self.pao_expiry()) {
            (Some(hard), Some(pao)) => Some(hard.min(pao)),
            (hard, pao) => hard.or(pao),
        }
    }
}

pub fn get_expiry_status(product: &ChildProduct, today: NaiveDate) -> ExpiryStatus {
    match product.effective_expiry() {
        Some(expiry) if expiry < today => ExpiryStatus::Expired,
        Some(expiry) if (expiry - today).num_days() <= EXPIRING_SOON_DAYS => {
            ExpiryStatus::ExpiringSoon
        }
        _ => ExpiryStatus::Ok,
    }
}

/// Shelf entry as returned to the app.
#[derive(Debug, Clone, Serialize)]
pub struct ShelfItem {
    #[serde(flatten)]
    pub product: ChildProduct,
    pub effective_expiry: Option<NaiveDate>,
    pub expiry_status: ExpiryStatus,
    pub days_until_expiry: Option<i64>,
}

impl ShelfItem {
    pub fn from_product(product: ChildProduct, today: NaiveDate) -> Self {
        let effective_expiry = product.effective_expiry();
        let expiry_status = get_expiry_status(&product, today);
        Self {
            days_until_expiry: effective_expiry.map(|d| (d - today).num_days()),
            effective_expiry,
            expiry_status,
            product,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn product(expiry: Option<NaiveDate>, opened: Option<NaiveDate>, pao: Option<i32>) -> ChildProduct {
        ChildProduct {
            id: Uuid::new_v4(),
            child_id: Uuid::new_v4(),
            product_id: None,
            product_name: "Gentle Cleanser".into(),
            brand: None,
            image_url: None,
            approval_id: None,
            usage_count: 0,
            last_used_at: None,
            opened_at: opened,
            pao_months: pao,
            expiry_date: expiry,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn past_expiry_is_expired() {
        let today = date(2025, 6, 1);
        let p = product(Some(date(2025, 5, 31)), None, None);
        assert_eq!(get_expiry_status(&p, today), ExpiryStatus::Expired);
    }

    #[test]
    fn within_thirty_days_is_expiring_soon() {
        let today = date(2025, 6, 1);
        assert_eq!(
            get_expiry_status(&product(Some(date(2025, 6, 1)), None, None), today),
            ExpiryStatus::ExpiringSoon
        );
        assert_eq!(
            get_expiry_status(&product(Some(date(2025, 7, 1)), None, None), today),
            ExpiryStatus::ExpiringSoon
        );
        assert_eq!(
            get_expiry_status(&product(Some(date(2025, 7, 2)), None, None), today),
            ExpiryStatus::Ok
        );
    }

    #[test]
    fn no_dates_is_ok() {
        let p = product(None, Some(date(2025, 1, 1)), None);
        assert_eq!(p.effective_expiry(), None);
        assert_eq!(get_expiry_status(&p, date(2030, 1, 1)), ExpiryStatus::Ok);
    }

    #[test]
    fn earlier_of_hard_and_pao_expiry_wins() {
        // opened Jan 1 with 6M PAO -> Jul 1, printed expiry is later
        let p = product(Some(date(2026, 1, 1)), Some(date(2025, 1, 1)), Some(6));
        assert_eq!(p.pao_expiry(), Some(date(2025, 7, 1)));
        assert_eq!(p.effective_expiry(), Some(date(2025, 7, 1)));
        assert_eq!(get_expiry_status(&p, date(2025, 8, 1)), ExpiryStatus::Expired);

        // printed expiry comes first
        let p = product(Some(date(2025, 3, 1)), Some(date(2025, 1, 1)), Some(12));
        assert_eq!(p.effective_expiry(), Some(date(2025, 3, 1)));
    }

    #[test]
    fn shelf_item_reports_days_left() {
        let today = date(2025, 6, 1);
        let item = ShelfItem::from_product(product(Some(date(2025, 6, 11)), None, None), today);
        assert_eq!(item.days_until_expiry, Some(10));
        assert_eq!(item.expiry_status, ExpiryStatus::ExpiringSoon);
    }
}
