use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RoutineSlot {
    #[default]
    Morning,
    Evening,
}

impl RoutineSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutineSlot::Morning => "morning",
            RoutineSlot::Evening => "evening",
        }
    }
}

impl std::str::FromStr for RoutineSlot {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "morning" => Ok(RoutineSlot::Morning),
            "evening" => Ok(RoutineSlot::Evening),
            _ => Err(anyhow::anyhow!("Unknown routine slot: {s}")),
        }
    }
}

impl TryFrom<String> for RoutineSlot {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RoutineStep {
    pub id: Uuid,
    pub child_id: Uuid,
    pub child_product_id: Uuid,
    #[sqlx(try_from = "String")]
    pub slot: RoutineSlot,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddRoutineStepRequest {
    pub child_product_id: Uuid,
    #[serde(default)]
    pub slot: RoutineSlot,
}

#[derive(Debug, Deserialize)]
pub struct RoutineQuery {
    pub slot: Option<RoutineSlot>,
}
