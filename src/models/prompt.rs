use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One version of a system prompt. At most one version per key is active.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PromptVersion {
    pub id: Uuid,
    pub prompt_key: String,
    pub version: i32,
    pub content: String,
    pub model: Option<String>,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePromptVersionRequest {
    pub content: String,
    pub model: Option<String>,
    #[serde(default)]
    pub activate: bool,
}
