use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Child {
    pub id: Uuid, // doubles as the child's profile id
    pub parent_id: Uuid,
    pub display_name: String,
    pub birth_year: Option<i32>,
    pub avatar_emoji: Option<String>,
    pub requires_approval: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Extra guardian with the same rights as the owning parent.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ManagedChild {
    pub child_id: Uuid,
    pub parent_id: Uuid,
    pub relationship: String, // "parent", "guardian", etc.
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateChildRequest {
    pub display_name: String,
    pub birth_year: Option<i32>,
    pub avatar_emoji: Option<String>,
    pub requires_approval: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateChildRequest {
    pub display_name: Option<String>,
    pub birth_year: Option<i32>,
    pub avatar_emoji: Option<String>,
    pub requires_approval: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct AddGuardianRequest {
    pub parent_id: Uuid,
    pub relationship: String,
}
