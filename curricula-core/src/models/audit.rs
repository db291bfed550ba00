use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Attach,
    Detach,
    UpdateMetadata,
    Reorder,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attach => "attach",
            Self::Detach => "detach",
            Self::UpdateMetadata => "update_metadata",
            Self::Reorder => "reorder",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "attach" => Some(Self::Attach),
            "detach" => Some(Self::Detach),
            "update_metadata" => Some(Self::UpdateMetadata),
            "reorder" => Some(Self::Reorder),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub actor: Uuid,
    pub action: AuditAction,
    pub program_id: Uuid,
    pub template_id: Option<Uuid>,
    pub detail: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    #[serde(flatten)]
    pub entry: AuditEntry,
    pub created_at: DateTime<Utc>,
}
