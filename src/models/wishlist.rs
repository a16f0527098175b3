use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WishlistStatus {
    Saved,
    AwaitingApproval,
    Approved,
    NotApproved,
    OnShelf,
}

impl WishlistStatus {
    pub const ALL: [WishlistStatus; 5] = [
        WishlistStatus::Saved,
        WishlistStatus::AwaitingApproval,
        WishlistStatus::Approved,
        WishlistStatus::NotApproved,
        WishlistStatus::OnShelf,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WishlistStatus::Saved => "saved",
            WishlistStatus::AwaitingApproval => "awaiting_approval",
            WishlistStatus::Approved => "approved",
            WishlistStatus::NotApproved => "not_approved",
            WishlistStatus::OnShelf => "on_shelf",
        }
    }

    /// States reachable from `self` in one step.
    ///
    /// `AwaitingApproval -> Saved` covers a withdrawn or expired request.
    /// `OnShelf` is terminal: shelf removal deletes the child product, not
    /// the wishlist history.
    pub fn allowed_transitions(&self) -> &'static [WishlistStatus] {
        use WishlistStatus::*;
        match self {
            Saved => &[AwaitingApproval],
            AwaitingApproval => &[Approved, NotApproved, Saved],
            NotApproved => &[Saved, AwaitingApproval],
            Approved => &[OnShelf],
            OnShelf => &[],
        }
    }

    pub fn can_transition_to(&self, next: WishlistStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }
}

impl std::fmt::Display for WishlistStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WishlistStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WishlistStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown wishlist status: {s}"))
    }
}

impl TryFrom<String> for WishlistStatus {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WishlistItem {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub brand: Option<String>,
    pub image_url: Option<String>,
    // copied from the product at save time
    pub safety_score: Option<i32>,
    pub rating: Option<f64>,
    pub notes: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: WishlistStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Wishlist item together with the groups it is filed under.
#[derive(Debug, Clone, Serialize)]
pub struct WishlistItemView {
    #[serde(flatten)]
    pub item: WishlistItem,
    pub group_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WishlistGroup {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub name: String,
    pub emoji: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WishlistGroupSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub group: WishlistGroup,
    pub item_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WishlistItemGroup {
    pub item_id: Uuid,
    pub group_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddWishlistItemRequest {
    pub product_id: Option<Uuid>,
    pub product_name: Option<String>,
    pub brand: Option<String>,
    pub image_url: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub group_ids: Vec<Uuid>,
}

/// Fully resolved insert for `wishlist_items`.
#[derive(Debug, Clone)]
pub struct NewWishlistItem {
    pub profile_id: Uuid,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub brand: Option<String>,
    pub image_url: Option<String>,
    pub safety_score: Option<i32>,
    pub rating: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateWishlistItemRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetWishlistStatusRequest {
    pub status: WishlistStatus,
}

#[derive(Debug, Deserialize)]
pub struct WishlistQuery {
    pub profile_id: Option<Uuid>,
    pub status: Option<WishlistStatus>,
}

#[derive(Debug, Deserialize)]
pub struct CreateWishlistGroupRequest {
    pub name: String,
    pub emoji: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateWishlistGroupRequest {
    pub name: Option<String>,
    pub emoji: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RequestApprovalBody {
    pub child_notes: Option<String>,
}
