use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Template {
    pub id: Uuid,
    pub week_number: i64,
    pub label: String,
    pub notes: Option<String>,
    pub sort_order: Option<i64>,
    pub status: TemplateStatus,
    pub external_link: Option<String>,
    pub category: Option<String>,
    pub estimated_minutes: Option<i64>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Template {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn summary(&self) -> TemplateSummary {
        TemplateSummary {
            id: self.id,
            week_number: self.week_number,
            label: self.label.clone(),
            status: self.status,
            sort_order: self.sort_order,
            category: self.category.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TemplateStatus {
    Draft,
    Published,
    Deprecated,
    Archived,
}

impl TemplateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Deprecated => "deprecated",
            Self::Archived => "archived",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "published" => Some(Self::Published),
            "deprecated" => Some(Self::Deprecated),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

/// Picker entry for a template that is not yet linked to a program.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplateSummary {
    pub id: Uuid,
    pub week_number: i64,
    pub label: String,
    pub status: TemplateStatus,
    pub sort_order: Option<i64>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTemplateInput {
    pub week_number: i64,
    pub label: String,
    pub notes: Option<String>,
    pub sort_order: Option<i64>,
    pub status: Option<TemplateStatus>,
    pub external_link: Option<String>,
    pub category: Option<String>,
    pub estimated_minutes: Option<i64>,
}

impl CreateTemplateInput {
    pub fn new(week_number: i64, label: impl Into<String>) -> Self {
        Self {
            week_number,
            label: label.into(),
            notes: None,
            sort_order: None,
            status: None,
            external_link: None,
            category: None,
            estimated_minutes: None,
        }
    }
}
