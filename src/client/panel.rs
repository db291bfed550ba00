//! Client-side cache of each program's assigned/available lists.
//!
//! Every transition here is a pure `&Panel -> Panel` function. Optimistic
//! edits, server confirmations and reverts all go through them, so a revert is
//! just [`apply_snapshot`] on an immutable [`Snapshot`] taken before the edit.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use curricula_core::models::{
    EffectiveTemplate, MetadataPatch, ProgramTemplates, TemplateStatus, TemplateSummary,
};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Panel {
    pub assigned: Vec<EffectiveTemplate>,
    pub available: Vec<TemplateSummary>,
}

/// Prior state of whatever one queued edit touches.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Entity {
        template_id: Uuid,
        assigned: Option<EffectiveTemplate>,
        available: Option<TemplateSummary>,
    },
    Order(Vec<(Uuid, Option<i64>)>),
}

/// Server-confirmed result of one queued edit.
#[derive(Debug, Clone, PartialEq)]
pub enum Confirmation {
    Linked(EffectiveTemplate),
    Unlinked(Uuid),
    Reordered { order: Vec<Uuid>, updated: usize },
}

impl From<ProgramTemplates> for Panel {
    fn from(templates: ProgramTemplates) -> Self {
        Self {
            assigned: templates.assigned,
            available: templates.available,
        }
        .sorted()
    }
}

fn summary_order(a: &TemplateSummary, b: &TemplateSummary) -> std::cmp::Ordering {
    a.week_number
        .cmp(&b.week_number)
        .then_with(|| {
            a.sort_order
                .unwrap_or(i64::MAX)
                .cmp(&b.sort_order.unwrap_or(i64::MAX))
        })
        .then_with(|| a.label.cmp(&b.label))
}

/// Placeholder shown between an optimistic attach and its confirmation.
/// Its nil link id marks it as not yet known to the server.
fn provisional(program_id: Uuid, summary: &TemplateSummary) -> EffectiveTemplate {
    let now = Utc::now();
    EffectiveTemplate {
        link_id: Uuid::nil(),
        program_id,
        template_id: summary.id,
        week_number: summary.week_number,
        label: summary.label.clone(),
        status: summary.status,
        archived: false,
        visible: true,
        notes: None,
        hyperlink: None,
        sort_order: summary.sort_order,
        due_offset_days: None,
        required: None,
        visibility: None,
        category: summary.category.clone(),
        estimated_minutes: None,
        overrides: Vec::new(),
        created_by: None,
        updated_by: None,
        created_at: now,
        updated_at: now,
    }
}

impl Panel {
    fn sorted(mut self) -> Self {
        self.assigned.sort_by(EffectiveTemplate::panel_order);
        self.available.sort_by(summary_order);
        self
    }

    pub fn assigned(&self, template_id: Uuid) -> Option<&EffectiveTemplate> {
        self.assigned.iter().find(|t| t.template_id == template_id)
    }

    pub fn is_assigned(&self, template_id: Uuid) -> bool {
        self.assigned(template_id).is_some()
    }

    /// Confirmed link ids in display order; provisional rows are skipped.
    pub fn link_order(&self) -> Vec<Uuid> {
        self.assigned
            .iter()
            .map(|t| t.link_id)
            .filter(|id| !id.is_nil())
            .collect()
    }

    pub fn entity_snapshot(&self, template_id: Uuid) -> Snapshot {
        Snapshot::Entity {
            template_id,
            assigned: self.assigned(template_id).cloned(),
            available: self.available.iter().find(|t| t.id == template_id).cloned(),
        }
    }

    pub fn order_snapshot(&self) -> Snapshot {
        Snapshot::Order(
            self.assigned
                .iter()
                .map(|t| (t.link_id, t.sort_order))
                .collect(),
        )
    }

    pub fn with_attached(&self, program_id: Uuid, template_id: Uuid) -> Panel {
        if self.is_assigned(template_id) {
            return self.clone();
        }
        let mut next = self.clone();
        if let Some(pos) = next.available.iter().position(|t| t.id == template_id) {
            let summary = next.available.remove(pos);
            next.assigned.push(provisional(program_id, &summary));
        }
        next.sorted()
    }

    pub fn with_detached(&self, template_id: Uuid) -> Panel {
        let mut next = self.clone();
        let Some(pos) = next.assigned.iter().position(|t| t.template_id == template_id) else {
            return next;
        };
        let view = next.assigned.remove(pos);
        let pickable = view.status == TemplateStatus::Published && !view.archived;
        if pickable && !next.available.iter().any(|t| t.id == template_id) {
            next.available.push(TemplateSummary {
                id: view.template_id,
                week_number: view.week_number,
                label: view.label,
                status: view.status,
                sort_order: view.sort_order,
                category: view.category,
            });
        }
        next.sorted()
    }

    /// Local guess of the patched view. A cleared override shows as empty
    /// until the server answers with the template default.
    pub fn with_metadata(&self, template_id: Uuid, patch: &MetadataPatch) -> Panel {
        let mut next = self.clone();
        if let Some(view) = next
            .assigned
            .iter_mut()
            .find(|t| t.template_id == template_id)
        {
            if let Some(notes) = &patch.notes {
                view.notes = notes.clone();
            }
            if let Some(hyperlink) = &patch.hyperlink {
                view.hyperlink = hyperlink.clone();
            }
            if let Some(sort_order) = patch.sort_order {
                view.sort_order = sort_order;
            }
            if let Some(days) = patch.due_offset_days {
                view.due_offset_days = days;
            }
            if let Some(required) = patch.required {
                view.required = required;
            }
            if let Some(visibility) = &patch.visibility {
                view.visibility = visibility.clone();
            }
            if let Some(visible) = patch.visible {
                view.visible = visible;
            }
        }
        next.sorted()
    }

    pub fn with_order(&self, order: &[Uuid]) -> Panel {
        let mut next = self.clone();
        for view in next.assigned.iter_mut() {
            if let Some(pos) = order.iter().position(|id| *id == view.link_id) {
                view.sort_order = Some(pos as i64 + 1);
            }
        }
        next.sorted()
    }

    /// Replaces the optimistic guess with the server's record.
    pub fn with_confirmation(&self, confirmation: &Confirmation) -> Panel {
        match confirmation {
            Confirmation::Linked(view) => {
                let mut next = self.clone();
                next.available.retain(|t| t.id != view.template_id);
                next.assigned.retain(|t| t.template_id != view.template_id);
                next.assigned.push(view.clone());
                next.sorted()
            }
            Confirmation::Unlinked(template_id) => self.with_detached(*template_id),
            Confirmation::Reordered { order, .. } => self.with_order(order),
        }
    }
}

/// Restores what `snapshot` captured, leaving everything else untouched.
pub fn apply_snapshot(panel: &Panel, snapshot: &Snapshot) -> Panel {
    let mut next = panel.clone();
    match snapshot {
        Snapshot::Entity {
            template_id,
            assigned,
            available,
        } => {
            next.assigned.retain(|t| t.template_id != *template_id);
            next.available.retain(|t| t.id != *template_id);
            next.assigned.extend(assigned.iter().cloned());
            next.available.extend(available.iter().cloned());
        }
        Snapshot::Order(orders) => {
            for view in next.assigned.iter_mut() {
                if let Some((_, sort_order)) = orders.iter().find(|(id, _)| *id == view.link_id) {
                    view.sort_order = *sort_order;
                }
            }
        }
    }
    next.sorted()
}

/// Panels for every program the session has opened, keyed by program id.
///
/// Queues write back into the panel of the program they were created for,
/// whichever program is currently on screen.
#[derive(Clone, Default)]
pub struct PanelStore {
    panels: Arc<Mutex<HashMap<Uuid, Panel>>>,
}

impl PanelStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Panel>> {
        self.panels.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, program_id: Uuid) -> Option<Panel> {
        self.lock().get(&program_id).cloned()
    }

    pub fn replace(&self, program_id: Uuid, panel: Panel) {
        self.lock().insert(program_id, panel);
    }

    /// Runs a pure transition on one program's panel and returns the result.
    pub fn update(&self, program_id: Uuid, f: impl FnOnce(&Panel) -> Panel) -> Panel {
        self.transition(program_id, |panel| {
            let next = f(panel);
            (next.clone(), next)
        })
    }

    /// Like [`PanelStore::update`], also handing back a value computed from
    /// the panel as it was before the transition.
    pub fn transition<R>(&self, program_id: Uuid, f: impl FnOnce(&Panel) -> (Panel, R)) -> R {
        let mut panels = self.lock();
        let current = panels.get(&program_id).cloned().unwrap_or_default();
        let (next, out) = f(&current);
        panels.insert(program_id, next);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(week: i64, label: &str) -> TemplateSummary {
        TemplateSummary {
            id: Uuid::new_v4(),
            week_number: week,
            label: label.into(),
            status: TemplateStatus::Published,
            sort_order: None,
            category: None,
        }
    }

    fn confirmed(program_id: Uuid, summary: &TemplateSummary) -> EffectiveTemplate {
        EffectiveTemplate {
            link_id: Uuid::new_v4(),
            ..provisional(program_id, summary)
        }
    }

    #[test]
    fn attach_then_revert_restores_both_lists() {
        let program_id = Uuid::new_v4();
        let t1 = summary(1, "Laptop");
        let panel = Panel {
            assigned: vec![],
            available: vec![t1.clone()],
        };

        let snapshot = panel.entity_snapshot(t1.id);
        let optimistic = panel.with_attached(program_id, t1.id);
        assert!(optimistic.is_assigned(t1.id));
        assert!(optimistic.available.is_empty());
        assert!(optimistic.link_order().is_empty());

        assert_eq!(apply_snapshot(&optimistic, &snapshot), panel);
    }

    #[test]
    fn confirmation_replaces_provisional_row() {
        let program_id = Uuid::new_v4();
        let t1 = summary(1, "Laptop");
        let panel = Panel {
            assigned: vec![],
            available: vec![t1.clone()],
        }
        .with_attached(program_id, t1.id);

        let server = confirmed(program_id, &t1);
        let next = panel.with_confirmation(&Confirmation::Linked(server.clone()));
        assert_eq!(next.assigned, vec![server]);
    }

    #[test]
    fn order_snapshot_reverts_reorder() {
        let program_id = Uuid::new_v4();
        let a = confirmed(program_id, &summary(1, "A"));
        let b = confirmed(program_id, &summary(1, "B"));
        let panel = Panel {
            assigned: vec![a.clone(), b.clone()],
            available: vec![],
        };

        let snapshot = panel.order_snapshot();
        let reordered = panel.with_order(&[b.link_id, a.link_id]);
        assert_eq!(reordered.assigned[0].template_id, b.template_id);

        let reverted = apply_snapshot(&reordered, &snapshot);
        assert_eq!(reverted.assigned[0].template_id, a.template_id);
        assert_eq!(reverted.assigned[0].sort_order, None);
    }

    #[test]
    fn detach_returns_published_template_to_picker() {
        let program_id = Uuid::new_v4();
        let t1 = summary(2, "Docs");
        let panel = Panel {
            assigned: vec![confirmed(program_id, &t1)],
            available: vec![],
        };

        let next = panel.with_detached(t1.id);
        assert!(next.assigned.is_empty());
        assert_eq!(next.available.len(), 1);
        assert_eq!(next.available[0].id, t1.id);
    }

    #[test]
    fn store_keeps_panels_per_program() {
        let store = PanelStore::new();
        let p1 = Uuid::new_v4();
        let p2 = Uuid::new_v4();
        store.replace(p1, Panel::default());

        store.update(p1, |panel| Panel {
            available: vec![summary(1, "x")],
            ..panel.clone()
        });

        assert_eq!(store.get(p1).unwrap().available.len(), 1);
        assert!(store.get(p2).is_none());
    }
}
