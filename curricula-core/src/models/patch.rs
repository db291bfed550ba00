use serde_json::{Map, Number, Value};

use super::link::LinkOverrides;
use crate::error::{LinkError, LinkResult};

/// Canonical names of the link fields a patch may touch.
pub const PATCH_FIELDS: &[&str] = &[
    "notes",
    "hyperlink",
    "sort_order",
    "due_offset_days",
    "required",
    "visibility",
    "visible",
];

/// Field-level change set for a link.
///
/// The outer `Option` is presence in the request; the inner one is the new
/// override value, where `None` clears the override and restores the template
/// default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataPatch {
    pub notes: Option<Option<String>>,
    pub hyperlink: Option<Option<String>>,
    pub sort_order: Option<Option<i64>>,
    pub due_offset_days: Option<Option<i64>>,
    pub required: Option<Option<bool>>,
    pub visibility: Option<Option<String>>,
    pub visible: Option<bool>,
}

impl MetadataPatch {
    /// Builds a patch from a request body, sanitizing only the keys present.
    ///
    /// Blank strings become `null`; a value that is not an in-range integer
    /// where a number is expected fails with `invalid_number`, and an
    /// unrecognised flag fails with `invalid_boolean`. Unknown keys are
    /// ignored.
    pub fn sanitize(body: &Map<String, Value>) -> LinkResult<Self> {
        let mut patch = Self::default();
        for (key, value) in body {
            match key.as_str() {
                "notes" => patch.notes = Some(text(value)),
                "hyperlink" => patch.hyperlink = Some(text(value)),
                "visibility" => patch.visibility = Some(text(value)),
                "sort_order" => patch.sort_order = Some(number(value, "sort_order")?),
                "due_offset_days" => {
                    patch.due_offset_days = Some(number(value, "due_offset_days")?)
                }
                "required" => {
                    patch.required = match value {
                        Value::Null => Some(None),
                        other => Some(Some(flag(other, "required")?)),
                    }
                }
                "visible" => patch.visible = Some(flag(value, "visible")?),
                _ => {}
            }
        }
        Ok(patch)
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_none()
            && self.hyperlink.is_none()
            && self.sort_order.is_none()
            && self.due_offset_days.is_none()
            && self.required.is_none()
            && self.visibility.is_none()
            && self.visible.is_none()
    }

    /// Last-writer-wins per field: anything present in `newer` replaces ours.
    pub fn merge(&mut self, newer: MetadataPatch) {
        if newer.notes.is_some() {
            self.notes = newer.notes;
        }
        if newer.hyperlink.is_some() {
            self.hyperlink = newer.hyperlink;
        }
        if newer.sort_order.is_some() {
            self.sort_order = newer.sort_order;
        }
        if newer.due_offset_days.is_some() {
            self.due_offset_days = newer.due_offset_days;
        }
        if newer.required.is_some() {
            self.required = newer.required;
        }
        if newer.visibility.is_some() {
            self.visibility = newer.visibility;
        }
        if newer.visible.is_some() {
            self.visible = newer.visible;
        }
    }

    pub fn apply_to(&self, overrides: &mut LinkOverrides, visible: &mut bool) {
        if let Some(notes) = &self.notes {
            overrides.notes = notes.clone();
        }
        if let Some(hyperlink) = &self.hyperlink {
            overrides.hyperlink = hyperlink.clone();
        }
        if let Some(sort_order) = self.sort_order {
            overrides.sort_order = sort_order;
        }
        if let Some(days) = self.due_offset_days {
            overrides.due_offset_days = days;
        }
        if let Some(required) = self.required {
            overrides.required = required;
        }
        if let Some(visibility) = &self.visibility {
            overrides.visibility = visibility.clone();
        }
        if let Some(flag) = self.visible {
            *visible = flag;
        }
    }

    /// JSON body carrying only the present fields; cleared overrides are `null`.
    pub fn to_json(&self) -> Map<String, Value> {
        let mut body = Map::new();
        if let Some(notes) = &self.notes {
            body.insert("notes".into(), opt_string(notes));
        }
        if let Some(hyperlink) = &self.hyperlink {
            body.insert("hyperlink".into(), opt_string(hyperlink));
        }
        if let Some(sort_order) = self.sort_order {
            body.insert("sort_order".into(), opt_number(sort_order));
        }
        if let Some(days) = self.due_offset_days {
            body.insert("due_offset_days".into(), opt_number(days));
        }
        if let Some(required) = self.required {
            body.insert(
                "required".into(),
                required.map(Value::Bool).unwrap_or(Value::Null),
            );
        }
        if let Some(visibility) = &self.visibility {
            body.insert("visibility".into(), opt_string(visibility));
        }
        if let Some(flag) = self.visible {
            body.insert("visible".into(), Value::Bool(flag));
        }
        body
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        other => Some(other.to_string()),
    }
}

fn number(value: &Value, field: &'static str) -> LinkResult<Option<i64>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => integral(n)
            .map(Some)
            .ok_or(LinkError::InvalidNumber { field }),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            if let Ok(n) = trimmed.parse::<i64>() {
                return Ok(Some(n));
            }
            trimmed
                .parse::<f64>()
                .ok()
                .and_then(whole)
                .map(Some)
                .ok_or(LinkError::InvalidNumber { field })
        }
        _ => Err(LinkError::InvalidNumber { field }),
    }
}

fn integral(n: &Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    n.as_f64().and_then(whole)
}

/// Integral floats inside the `i64` range; `as` would saturate anything else.
fn whole(f: f64) -> Option<i64> {
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.is_finite() && f.fract() == 0.0 && in_range).then_some(f as i64)
}

fn flag(value: &Value, field: &'static str) -> LinkResult<bool> {
    let parsed = match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    };
    parsed.ok_or(LinkError::InvalidBoolean { field })
}

fn opt_string(value: &Option<String>) -> Value {
    value.clone().map(Value::String).unwrap_or(Value::Null)
}

fn opt_number(value: Option<i64>) -> Value {
    value.map(|n| Value::Number(n.into())).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn blank_strings_clear_overrides() {
        let patch = MetadataPatch::sanitize(&body(json!({"notes": "   ", "hyperlink": ""}))).unwrap();
        assert_eq!(patch.notes, Some(None));
        assert_eq!(patch.hyperlink, Some(None));
        assert_eq!(patch.sort_order, None);
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let patch = MetadataPatch::sanitize(&body(json!({"sort_order": " 7 ", "due_offset_days": 3.0}))).unwrap();
        assert_eq!(patch.sort_order, Some(Some(7)));
        assert_eq!(patch.due_offset_days, Some(Some(3)));
    }

    #[test]
    fn non_numeric_sort_order_is_rejected() {
        let err = MetadataPatch::sanitize(&body(json!({"sort_order": "soon"}))).unwrap_err();
        assert_eq!(err.code(), "invalid_number");

        let err = MetadataPatch::sanitize(&body(json!({"due_offset_days": 1.5}))).unwrap_err();
        assert_eq!(err.code(), "invalid_number");
    }

    #[test]
    fn out_of_range_numbers_are_rejected() {
        let err = MetadataPatch::sanitize(&body(json!({"sort_order": 1e20}))).unwrap_err();
        assert_eq!(err.code(), "invalid_number");

        let err = MetadataPatch::sanitize(&body(json!({"due_offset_days": "1e30"}))).unwrap_err();
        assert_eq!(err.code(), "invalid_number");

        let patch = MetadataPatch::sanitize(&body(json!({"sort_order": "1e3"}))).unwrap();
        assert_eq!(patch.sort_order, Some(Some(1000)));
    }

    #[test]
    fn unrecognised_flags_are_rejected() {
        let err = MetadataPatch::sanitize(&body(json!({"visible": "maybe"}))).unwrap_err();
        assert_eq!(err.code(), "invalid_boolean");

        let err = MetadataPatch::sanitize(&body(json!({"required": "sometimes"}))).unwrap_err();
        assert_eq!(err.code(), "invalid_boolean");

        let patch = MetadataPatch::sanitize(&body(json!({"required": null, "visible": "off"}))).unwrap();
        assert_eq!(patch.required, Some(None));
        assert_eq!(patch.visible, Some(false));
    }

    #[test]
    fn unknown_keys_leave_patch_empty() {
        let patch = MetadataPatch::sanitize(&body(json!({"color": "red"}))).unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn merge_keeps_latest_value_per_field() {
        let mut first = MetadataPatch {
            notes: Some(Some("draft".into())),
            sort_order: Some(Some(2)),
            ..Default::default()
        };
        first.merge(MetadataPatch {
            notes: Some(Some("final".into())),
            hyperlink: Some(None),
            ..Default::default()
        });

        assert_eq!(first.notes, Some(Some("final".into())));
        assert_eq!(first.sort_order, Some(Some(2)));
        assert_eq!(first.hyperlink, Some(None));
        assert_eq!(
            Value::Object(first.to_json()),
            json!({"notes": "final", "sort_order": 2, "hyperlink": null})
        );
    }
}
