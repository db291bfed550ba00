use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::program::Program;
use super::template::{Template, TemplateStatus, TemplateSummary};

/// Association row connecting a program to a template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Link {
    pub link_id: Uuid,
    pub program_id: Uuid,
    pub template_id: Uuid,
    pub overrides: LinkOverrides,
    pub visible: bool,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-link override columns. `None` means "inherit from the template".
///
/// `due_offset_days`, `required` and `visibility` are legacy columns: still
/// sanitized and stored, but nothing reads them beyond the effective view.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LinkOverrides {
    pub notes: Option<String>,
    pub hyperlink: Option<String>,
    pub sort_order: Option<i64>,
    pub due_offset_days: Option<i64>,
    pub required: Option<bool>,
    pub visibility: Option<String>,
}

impl LinkOverrides {
    pub fn overridden_fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        if self.notes.is_some() {
            fields.push("notes".to_string());
        }
        if self.hyperlink.is_some() {
            fields.push("hyperlink".to_string());
        }
        if self.sort_order.is_some() {
            fields.push("sort_order".to_string());
        }
        if self.due_offset_days.is_some() {
            fields.push("due_offset_days".to_string());
        }
        if self.required.is_some() {
            fields.push("required".to_string());
        }
        if self.visibility.is_some() {
            fields.push("visibility".to_string());
        }
        fields
    }
}

/// Read-time merge of a link's overrides onto its template defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EffectiveTemplate {
    pub link_id: Uuid,
    pub program_id: Uuid,
    pub template_id: Uuid,
    pub week_number: i64,
    pub label: String,
    pub status: TemplateStatus,
    /// The template has been soft-deleted; the link is kept for history.
    pub archived: bool,
    pub visible: bool,
    pub notes: Option<String>,
    pub hyperlink: Option<String>,
    pub sort_order: Option<i64>,
    pub due_offset_days: Option<i64>,
    pub required: Option<bool>,
    pub visibility: Option<String>,
    pub category: Option<String>,
    pub estimated_minutes: Option<i64>,
    pub overrides: Vec<String>,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EffectiveTemplate {
    /// Each field resolves independently as `override ?? template default ?? null`.
    pub fn merge(template: &Template, link: &Link) -> Self {
        let overrides = &link.overrides;
        Self {
            link_id: link.link_id,
            program_id: link.program_id,
            template_id: template.id,
            week_number: template.week_number,
            label: template.label.clone(),
            status: template.status,
            archived: template.is_deleted(),
            visible: link.visible,
            notes: overrides.notes.clone().or_else(|| template.notes.clone()),
            hyperlink: overrides
                .hyperlink
                .clone()
                .or_else(|| template.external_link.clone()),
            sort_order: overrides.sort_order.or(template.sort_order),
            due_offset_days: overrides.due_offset_days,
            required: overrides.required,
            visibility: overrides.visibility.clone(),
            category: template.category.clone(),
            estimated_minutes: template.estimated_minutes,
            overrides: overrides.overridden_fields(),
            created_by: link.created_by,
            updated_by: link.updated_by,
            created_at: link.created_at,
            updated_at: link.updated_at,
        }
    }

    /// Panel ordering: week first, then effective sort order, then label.
    pub fn panel_order(a: &Self, b: &Self) -> Ordering {
        a.week_number
            .cmp(&b.week_number)
            .then_with(|| {
                a.sort_order
                    .unwrap_or(i64::MAX)
                    .cmp(&b.sort_order.unwrap_or(i64::MAX))
            })
            .then_with(|| a.label.cmp(&b.label))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListTemplatesQuery {
    #[serde(default)]
    pub include_deleted: bool,
    pub status: Option<TemplateStatus>,
}

/// Assigned effective views plus unlinked published templates for the picker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgramTemplates {
    pub program: Program,
    pub assigned: Vec<EffectiveTemplate>,
    pub available: Vec<TemplateSummary>,
}

#[derive(Debug, Clone)]
pub struct AttachOutcome {
    pub template: EffectiveTemplate,
    pub already_attached: bool,
}

#[derive(Debug, Clone)]
pub struct DetachOutcome {
    pub template: Template,
    pub was_attached: bool,
}

#[derive(Debug, Clone)]
pub struct MetadataOutcome {
    pub updated: bool,
    pub template: EffectiveTemplate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttachResponse {
    pub attached: bool,
    #[serde(rename = "alreadyAttached")]
    pub already_attached: bool,
    pub template: EffectiveTemplate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetachResponse {
    pub detached: bool,
    #[serde(rename = "wasAttached")]
    pub was_attached: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdateMetadataResponse {
    pub updated: bool,
    pub template: EffectiveTemplate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReorderResponse {
    pub updated: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default)]
    pub message: Option<String>,
}
