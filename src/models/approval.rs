use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::routine::RoutineSlot;

/// Review state of a product approval. Rows are never deleted; they only
/// move forward from `pending`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Declined,
    Expired,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Declined => "declined",
            ApprovalStatus::Expired => "expired",
        }
    }

    /// Only a pending approval can be decided; every decision is final.
    pub fn can_transition_to(&self, next: ApprovalStatus) -> bool {
        matches!(
            (self, next),
            (
                ApprovalStatus::Pending,
                ApprovalStatus::Approved | ApprovalStatus::Declined | ApprovalStatus::Expired
            )
        )
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ApprovalStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ApprovalStatus::Pending),
            "approved" => Ok(ApprovalStatus::Approved),
            "declined" => Ok(ApprovalStatus::Declined),
            "expired" => Ok(ApprovalStatus::Expired),
            _ => Err(anyhow::anyhow!("Unknown approval status: {s}")),
        }
    }
}

impl TryFrom<String> for ApprovalStatus {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Ingredient-risk level attached to a flag. Declaration order is the
/// ranking: `Danger` is the most severe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Caution,
    Warning,
    Danger,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Caution => "caution",
            Severity::Warning => "warning",
            Severity::Danger => "danger",
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Severity::Info),
            "caution" => Ok(Severity::Caution),
            "warning" => Ok(Severity::Warning),
            "danger" => Ok(Severity::Danger),
            _ => Err(anyhow::anyhow!("Unknown severity: {s}")),
        }
    }
}

impl TryFrom<String> for Severity {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Highest severity across a set of flags, `Info` when there are none.
pub fn get_highest_severity<'a, I>(severities: I) -> Severity
where
    I: IntoIterator<Item = &'a Severity>,
{
    severities.into_iter().copied().max().unwrap_or(Severity::Info)
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProductApproval {
    pub id: Uuid,
    pub child_id: Uuid,
    pub parent_id: Uuid,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub brand: Option<String>,
    pub barcode: Option<String>,
    pub image_url: Option<String>,
    pub safety_score: Option<i32>,
    pub wishlist_item_id: Option<Uuid>,
    #[sqlx(try_from = "String")]
    pub status: ApprovalStatus,
    pub child_notes: Option<String>,
    pub parent_notes: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Pending approval row joined with the child's display name.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApprovalWithChild {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub approval: ProductApproval,
    pub child_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProductFlag {
    pub id: Uuid,
    pub approval_id: Uuid,
    pub ingredient: Option<String>,
    #[sqlx(try_from = "String")]
    pub severity: Severity,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// What the parent review queue shows for one approval.
#[derive(Debug, Clone, Serialize)]
pub struct PendingApproval {
    #[serde(flatten)]
    pub approval: ProductApproval,
    pub child_name: String,
    pub flags: Vec<ProductFlag>,
    pub highest_severity: Severity,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Requested,
    Approved,
    Declined,
    Expired,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::Requested => "requested",
            HistoryAction::Approved => "approved",
            HistoryAction::Declined => "declined",
            HistoryAction::Expired => "expired",
        }
    }
}

impl std::str::FromStr for HistoryAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requested" => Ok(HistoryAction::Requested),
            "approved" => Ok(HistoryAction::Approved),
            "declined" => Ok(HistoryAction::Declined),
            "expired" => Ok(HistoryAction::Expired),
            _ => Err(anyhow::anyhow!("Unknown history action: {s}")),
        }
    }
}

impl TryFrom<String> for HistoryAction {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ApprovalStatus> for HistoryAction {
    fn from(status: ApprovalStatus) -> Self {
        match status {
            ApprovalStatus::Pending => HistoryAction::Requested,
            ApprovalStatus::Approved => HistoryAction::Approved,
            ApprovalStatus::Declined => HistoryAction::Declined,
            ApprovalStatus::Expired => HistoryAction::Expired,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApprovalHistory {
    pub id: Uuid,
    pub approval_id: Uuid,
    #[sqlx(try_from = "String")]
    pub action: HistoryAction,
    pub actor_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewApprovalHistory {
    pub approval_id: Uuid,
    pub action: HistoryAction,
    pub actor_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Full approval detail for the parent review screen.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalDetail {
    #[serde(flatten)]
    pub approval: ProductApproval,
    pub flags: Vec<ProductFlag>,
    pub highest_severity: Severity,
    pub history: Vec<ApprovalHistory>,
}

/// Body for POST /approvals/request (child scan or search).
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewRequest {
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub brand: Option<String>,
    pub barcode: Option<String>,
    pub image_url: Option<String>,
    pub safety_score: Option<i32>,
    pub child_notes: Option<String>,
    #[serde(default)]
    pub wishlist_item_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewApproval {
    pub child_id: Uuid,
    pub parent_id: Uuid,
    pub request: ReviewRequest,
}

/// Reviewer metadata written together with a status change.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub from: ApprovalStatus,
    pub to: ApprovalStatus,
    pub reviewed_by: Option<Uuid>,
    pub parent_notes: Option<String>,
    pub at: DateTime<Utc>,
}

/// Body for POST /approvals/{id}/approve.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApproveRequest {
    pub parent_notes: Option<String>,
    #[serde(default)]
    pub add_to_routine: bool,
    pub routine_slot: Option<RoutineSlot>,
}

/// Body for POST /approvals/{id}/decline.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeclineRequest {
    pub parent_notes: Option<String>,
}

/// A parent's decision on one approval, as handed to the service.
#[derive(Debug, Clone)]
pub struct ApprovalAction {
    pub approval_id: Uuid,
    pub parent_id: Uuid,
    pub parent_notes: Option<String>,
    pub add_to_routine: bool,
    pub routine_slot: RoutineSlot,
}

impl ApprovalAction {
    pub fn approve(approval_id: Uuid, parent_id: Uuid, req: ApproveRequest) -> Self {
        Self {
            approval_id,
            parent_id,
            parent_notes: req.parent_notes,
            add_to_routine: req.add_to_routine,
            routine_slot: req.routine_slot.unwrap_or_default(),
        }
    }

    pub fn decline(approval_id: Uuid, parent_id: Uuid, req: DeclineRequest) -> Self {
        Self {
            approval_id,
            parent_id,
            parent_notes: req.parent_notes,
            add_to_routine: false,
            routine_slot: RoutineSlot::default(),
        }
    }
}
