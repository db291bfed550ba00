//! Bridges a multi-select tag widget to the membership queue.

use uuid::Uuid;

use super::ops::{Membership, MembershipOp};
use super::panel::PanelStore;
use super::queue::OptimisticQueue;
use curricula_core::models::MetadataPatch;

/// Who produced a widget change. Programmatic changes come from the adapter
/// syncing the widget to the panel and never reach the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    User,
    Programmatic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagChange {
    Added(Uuid),
    Removed(Uuid),
}

/// What the adapter did with a change.
#[derive(Debug, Clone, PartialEq)]
pub enum TagAction {
    Ignored,
    Enqueued(Membership),
    Cancelled,
    NoOp,
}

/// Model of the multi-select: the selectable options and the selected tags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagWidget {
    pub options: Vec<(Uuid, String)>,
    pub selected: Vec<Uuid>,
}

impl TagWidget {
    fn apply(&mut self, change: TagChange) {
        match change {
            TagChange::Added(id) => {
                if !self.selected.contains(&id) {
                    self.selected.push(id);
                }
            }
            TagChange::Removed(id) => self.selected.retain(|s| *s != id),
        }
    }
}

pub struct TagSyncAdapter {
    queue: OptimisticQueue<MembershipOp>,
    panels: PanelStore,
    widget: TagWidget,
}

impl TagSyncAdapter {
    pub fn new(queue: OptimisticQueue<MembershipOp>, panels: PanelStore) -> Self {
        let mut adapter = Self {
            queue,
            panels,
            widget: TagWidget::default(),
        };
        adapter.refresh_widget();
        adapter
    }

    pub fn widget(&self) -> &TagWidget {
        &self.widget
    }

    fn is_assigned(&self, template_id: Uuid) -> bool {
        self.panels
            .get(self.queue.scope())
            .is_some_and(|panel| panel.is_assigned(template_id))
    }

    /// Handles one widget change. Must run inside a tokio runtime, since
    /// enqueueing arms the debounce timer.
    pub fn on_change(&mut self, change: TagChange, origin: ChangeOrigin) -> TagAction {
        if origin == ChangeOrigin::Programmatic {
            return TagAction::Ignored;
        }
        self.widget.apply(change);

        let action = match change {
            TagChange::Added(id) => match self.queue.pending(&id) {
                Some(Membership::Detach) => {
                    self.queue.cancel(&id);
                    TagAction::Cancelled
                }
                // A failed attach waiting for retry was reverted on screen;
                // re-adding it shows it again.
                Some(Membership::Attach(_)) if !self.is_assigned(id) => {
                    self.enqueue(id, Membership::Attach(MetadataPatch::default()))
                }
                Some(Membership::Attach(_)) => TagAction::NoOp,
                None if self.is_assigned(id) => TagAction::NoOp,
                None => self.enqueue(id, Membership::Attach(MetadataPatch::default())),
            },
            TagChange::Removed(id) => match self.queue.pending(&id) {
                Some(Membership::Attach(_)) => {
                    self.queue.cancel(&id);
                    TagAction::Cancelled
                }
                Some(Membership::Detach) => TagAction::NoOp,
                None if self.is_assigned(id) => self.enqueue(id, Membership::Detach),
                None => TagAction::NoOp,
            },
        };

        self.refresh_widget();
        action
    }

    fn enqueue(&self, template_id: Uuid, intent: Membership) -> TagAction {
        self.queue.enqueue(template_id, intent.clone());
        TagAction::Enqueued(intent)
    }

    /// Re-derives options and selection from the panel. Returns the changes
    /// it made, all of them programmatic.
    pub fn refresh_widget(&mut self) -> Vec<(TagChange, ChangeOrigin)> {
        let panel = self.panels.get(self.queue.scope()).unwrap_or_default();

        let selected: Vec<Uuid> = panel
            .assigned
            .iter()
            .filter(|t| !t.archived)
            .map(|t| t.template_id)
            .collect();
        self.widget.options = panel
            .assigned
            .iter()
            .filter(|t| !t.archived)
            .map(|t| (t.template_id, t.label.clone()))
            .chain(panel.available.iter().map(|t| (t.id, t.label.clone())))
            .collect();

        let mut changes = Vec::new();
        for id in self.widget.selected.clone() {
            if !selected.contains(&id) {
                changes.push(TagChange::Removed(id));
            }
        }
        for id in &selected {
            if !self.widget.selected.contains(id) {
                changes.push(TagChange::Added(*id));
            }
        }
        for change in &changes {
            self.widget.apply(*change);
        }

        changes
            .into_iter()
            .map(|change| (change, ChangeOrigin::Programmatic))
            .collect()
    }
}
