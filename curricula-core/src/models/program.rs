use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Program {
    pub id: Uuid,
    pub title: String,
    pub total_weeks: i64,
    pub description: Option<String>,
    pub archived_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Program {
    pub fn lifecycle(&self) -> ProgramLifecycle {
        if self.archived_at.is_some() {
            ProgramLifecycle::Archived
        } else {
            ProgramLifecycle::Active
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgramLifecycle {
    Active,
    Archived,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProgramInput {
    pub title: String,
    pub total_weeks: i64,
    pub description: Option<String>,
}
