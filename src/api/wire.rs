//! Request normalization: every external naming variant (camelCase keys,
//! nested `template.id`, link objects inside `order`) is folded into the
//! canonical snake_case schema here, and nowhere else.

use curricula_core::models::{ListTemplatesQuery, MetadataPatch, TemplateStatus};
use curricula_core::LinkError;
use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::error::ApiError;

fn canonical_key(key: &str) -> Option<&'static str> {
    match key {
        "notes" => Some("notes"),
        "hyperlink" | "external_link" | "externalLink" => Some("hyperlink"),
        "sort_order" | "sortOrder" => Some("sort_order"),
        "due_offset_days" | "dueOffsetDays" => Some("due_offset_days"),
        "required" => Some("required"),
        "visibility" => Some("visibility"),
        "visible" => Some("visible"),
        _ => None,
    }
}

/// Keeps only known override keys, renamed to their canonical form. When both
/// spellings are sent, the canonical one wins.
pub fn canonical_fields(body: &Map<String, Value>) -> Map<String, Value> {
    let mut fields = Map::new();
    for (key, value) in body {
        let Some(canonical) = canonical_key(key) else {
            continue;
        };
        if key != canonical && body.contains_key(canonical) {
            continue;
        }
        fields.insert(canonical.to_string(), value.clone());
    }
    fields
}

fn as_object(body: Value) -> Result<Map<String, Value>, ApiError> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::InvalidBody("expected a JSON object".into())),
    }
}

fn id_value(value: &Value) -> Option<Uuid> {
    value.as_str().and_then(|s| Uuid::parse_str(s.trim()).ok())
}

pub struct AttachRequest {
    pub template_id: Uuid,
    pub overrides: MetadataPatch,
}

impl AttachRequest {
    pub fn from_body(body: Value) -> Result<Self, ApiError> {
        let body = as_object(body)?;
        let template_id = body
            .get("template_id")
            .or_else(|| body.get("templateId"))
            .or_else(|| body.get("template").and_then(|t| t.get("id")))
            .ok_or_else(|| ApiError::InvalidBody("template_id is required".into()))?;
        let template_id = id_value(template_id)
            .ok_or_else(|| ApiError::InvalidBody("template_id must be a UUID".into()))?;
        let overrides = MetadataPatch::sanitize(&canonical_fields(&body))?;
        Ok(Self {
            template_id,
            overrides,
        })
    }
}

pub fn metadata_patch(body: Value) -> Result<MetadataPatch, ApiError> {
    let body = as_object(body)?;
    let patch = MetadataPatch::sanitize(&canonical_fields(&body))?;
    if patch.is_empty() {
        return Err(LinkError::NoFields.into());
    }
    Ok(patch)
}

/// Accepts `{"order": [...]}` where entries are link-id strings or objects
/// carrying `link_id`, `linkId` or `id`.
pub fn reorder_ids(body: Value) -> Result<Vec<Uuid>, ApiError> {
    let invalid = |reason: &str| ApiError::from(LinkError::InvalidOrder(reason.to_string()));
    let Value::Object(body) = body else {
        return Err(invalid("expected an object with an `order` array"));
    };
    let Some(Value::Array(entries)) = body.get("order") else {
        return Err(invalid("`order` must be an array of link ids"));
    };
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let raw = match entry {
                Value::Object(obj) => obj
                    .get("link_id")
                    .or_else(|| obj.get("linkId"))
                    .or_else(|| obj.get("id")),
                other => Some(other),
            };
            raw.and_then(id_value)
                .ok_or_else(|| invalid(&format!("entry {index} is not a link id")))
        })
        .collect()
}

pub fn path_id(raw: &str, missing: LinkError) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| missing.into())
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default, alias = "includeDeleted")]
    pub include_deleted: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl ListParams {
    pub fn into_query(self) -> Result<ListTemplatesQuery, ApiError> {
        let include_deleted = matches!(
            self.include_deleted.as_deref().map(str::trim),
            Some("" | "1" | "true" | "yes")
        );
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(raw) => Some(
                TemplateStatus::from_str(raw)
                    .ok_or_else(|| LinkError::InvalidStatus(raw.to_string()))?,
            ),
        };
        Ok(ListTemplatesQuery {
            include_deleted,
            status,
        })
    }
}
