//! Per-scope optimistic mutation queue.
//!
//! ```text
//! idle -> pending -> scheduled -> flushing -> idle
//!                                          -> pending (edits arrived mid-flight)
//! ```
//!
//! Edits are applied to the [`PanelStore`] immediately, buffered per key,
//! debounced, and sent by one flush at a time. Each queue is bound to one
//! program for its whole life. Failed edits are reverted on screen and
//! rescheduled after `debounce * attempts` until `max_attempts` is reached.

use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::error::ClientError;
use super::panel::{apply_snapshot, Confirmation, Panel, PanelStore, Snapshot};

/// One operation class (attach/detach, metadata, reorder).
#[async_trait]
pub trait QueueOp: Send + Sync + 'static {
    type Key: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static;
    type Payload: Clone + fmt::Debug + Send + Sync + 'static;

    fn name(&self) -> &'static str;

    /// Captures the panel state the edit for `key` is about to change.
    fn snapshot(&self, panel: &Panel, key: &Self::Key) -> Snapshot;

    fn apply_optimistic(
        &self,
        scope: Uuid,
        panel: &Panel,
        key: &Self::Key,
        payload: &Self::Payload,
    ) -> Panel;

    /// Folds a newer edit into one that is still buffered.
    fn merge(&self, pending: &mut Self::Payload, newer: Self::Payload);

    /// Sends every item of the batch and reports one outcome per item, in
    /// order. A failing item must not stop the remaining ones.
    async fn send(
        &self,
        scope: Uuid,
        batch: &[(Self::Key, Self::Payload)],
    ) -> Vec<Result<Confirmation, ClientError>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Idle,
    Pending,
    Scheduled,
    Flushing,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub succeeded: usize,
    pub failed: usize,
    /// Failed items put back for the next flush.
    pub requeued: usize,
    /// Failed items that ran out of attempts; their edit is reverted for good.
    pub dropped: usize,
    pub errors: Vec<String>,
}

impl FlushReport {
    /// Aggregated user-facing message, only when something failed.
    pub fn message(&self) -> Option<String> {
        (self.failed > 0).then(|| format!("{} succeeded, {} failed", self.succeeded, self.failed))
    }
}

#[derive(Debug)]
struct Entry<P> {
    payload: P,
    revert: Snapshot,
    attempts: u32,
}

struct Slots<O: QueueOp> {
    pending: Vec<(O::Key, Entry<O::Payload>)>,
    timer: Option<JoinHandle<()>>,
    /// Bumped on every re-arm so a superseded timer can tell it is stale.
    generation: u64,
    flushing: bool,
    last_report: Option<FlushReport>,
}

impl<O: QueueOp> Slots<O> {
    fn position(&self, key: &O::Key) -> Option<usize> {
        self.pending.iter().position(|(k, _)| k == key)
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

struct Inner<O: QueueOp> {
    op: O,
    scope: Uuid,
    panels: PanelStore,
    debounce: Duration,
    max_attempts: u32,
    slots: Mutex<Slots<O>>,
    /// Held for the whole of a flush; a second flush waits on it.
    flight: tokio::sync::Mutex<()>,
}

impl<O: QueueOp> Drop for Inner<O> {
    fn drop(&mut self) {
        if let Ok(mut slots) = self.slots.lock() {
            slots.cancel_timer();
        }
    }
}

pub struct OptimisticQueue<O: QueueOp> {
    inner: Arc<Inner<O>>,
}

impl<O: QueueOp> Clone for OptimisticQueue<O> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<O: QueueOp> OptimisticQueue<O> {
    pub fn new(
        op: O,
        scope: Uuid,
        panels: PanelStore,
        debounce: Duration,
        max_attempts: u32,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                op,
                scope,
                panels,
                debounce,
                max_attempts: max_attempts.max(1),
                slots: Mutex::new(Slots {
                    pending: Vec::new(),
                    timer: None,
                    generation: 0,
                    flushing: false,
                    last_report: None,
                }),
                flight: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// The program every request from this queue targets.
    pub fn scope(&self) -> Uuid {
        self.inner.scope
    }

    fn slots(&self) -> MutexGuard<'_, Slots<O>> {
        self.inner
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> QueueState {
        let slots = self.slots();
        if slots.flushing {
            QueueState::Flushing
        } else if slots.timer.is_some() {
            QueueState::Scheduled
        } else if !slots.pending.is_empty() {
            QueueState::Pending
        } else {
            QueueState::Idle
        }
    }

    pub fn pending(&self, key: &O::Key) -> Option<O::Payload> {
        let slots = self.slots();
        slots
            .position(key)
            .map(|idx| slots.pending[idx].1.payload.clone())
    }

    pub fn pending_len(&self) -> usize {
        self.slots().pending.len()
    }

    pub fn last_report(&self) -> Option<FlushReport> {
        self.slots().last_report.clone()
    }

    /// Applies the edit locally, buffers it, and (re)arms the debounce timer.
    pub fn enqueue(&self, key: O::Key, payload: O::Payload) {
        let inner = &self.inner;
        let mut slots = self.slots();

        let revert = inner.panels.transition(inner.scope, |panel| {
            let next = inner.op.apply_optimistic(inner.scope, panel, &key, &payload);
            (next, inner.op.snapshot(panel, &key))
        });

        match slots.position(&key) {
            // The first edit's snapshot is the baseline; later ones only merge.
            Some(idx) => inner.op.merge(&mut slots.pending[idx].1.payload, payload),
            None => slots.pending.push((
                key,
                Entry {
                    payload,
                    revert,
                    attempts: 0,
                },
            )),
        }

        self.arm(&mut slots);
    }

    /// Drops a buffered edit before it is sent and restores the prior UI
    /// state. Edits already in flight cannot be cancelled.
    pub fn cancel(&self, key: &O::Key) -> bool {
        let mut slots = self.slots();
        let Some(idx) = slots.position(key) else {
            return false;
        };
        let (_, entry) = slots.pending.remove(idx);
        self.inner
            .panels
            .update(self.inner.scope, |panel| apply_snapshot(panel, &entry.revert));
        if slots.pending.is_empty() {
            slots.cancel_timer();
        }
        tracing::debug!(queue = self.inner.op.name(), ?key, "cancelled queued edit");
        true
    }

    fn arm(&self, slots: &mut Slots<O>) {
        self.arm_in(slots, self.inner.debounce);
    }

    /// Schedules a flush after `delay`, replacing any pending timer.
    fn arm_in(&self, slots: &mut Slots<O>, delay: Duration) {
        slots.cancel_timer();
        slots.generation += 1;
        let generation = slots.generation;
        let weak: Weak<Inner<O>> = Arc::downgrade(&self.inner);
        slots.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let queue = OptimisticQueue { inner };
            {
                let mut slots = queue.slots();
                if slots.generation != generation {
                    return;
                }
                // Forget our own handle so a later edit cannot abort this flush.
                slots.timer = None;
            }
            queue.flush().await;
        }));
    }

    /// Sends everything buffered. Waits for any flush already in flight
    /// first, then sends whatever is still pending at that point.
    pub async fn flush(&self) -> FlushReport {
        let _flight = self.inner.flight.lock().await;
        let inner = &self.inner;

        let batch = {
            let mut slots = self.slots();
            if slots.pending.is_empty() {
                return FlushReport::default();
            }
            slots.cancel_timer();
            slots.flushing = true;
            std::mem::take(&mut slots.pending)
        };

        let items: Vec<(O::Key, O::Payload)> = batch
            .iter()
            .map(|(key, entry)| (key.clone(), entry.payload.clone()))
            .collect();
        tracing::debug!(queue = inner.op.name(), scope = %inner.scope, items = items.len(), "flushing");
        let outcomes = inner.op.send(inner.scope, &items).await;

        let mut report = FlushReport::default();
        let mut retry_after = 0;
        let mut slots = self.slots();
        let mut outcomes = outcomes.into_iter();
        for (key, mut entry) in batch {
            let outcome = outcomes
                .next()
                .unwrap_or_else(|| Err(ClientError::Decode("missing outcome".into())));
            let newer = slots.position(&key);
            match outcome {
                Ok(confirmation) => {
                    report.succeeded += 1;
                    match newer {
                        None => {
                            inner.panels.update(inner.scope, |panel| {
                                panel.with_confirmation(&confirmation)
                            });
                        }
                        // The newer edit stays on screen, but a revert must
                        // land on the confirmed record, not on our guess.
                        Some(idx) => {
                            let confirmed = inner
                                .panels
                                .get(inner.scope)
                                .unwrap_or_default()
                                .with_confirmation(&confirmation);
                            slots.pending[idx].1.revert = inner.op.snapshot(&confirmed, &key);
                        }
                    }
                }
                Err(err) => {
                    report.failed += 1;
                    report.errors.push(format!("{key:?}: {err}"));
                    entry.attempts += 1;
                    match newer {
                        // A newer edit is buffered: keep it on top of the
                        // failed one and revert to the older baseline later.
                        Some(idx) => {
                            let (_, pending) = &mut slots.pending[idx];
                            let newer_payload = pending.payload.clone();
                            inner.op.merge(&mut entry.payload, newer_payload);
                            pending.payload = entry.payload;
                            pending.revert = entry.revert;
                            pending.attempts = entry.attempts;
                            report.requeued += 1;
                        }
                        None => {
                            inner
                                .panels
                                .update(inner.scope, |panel| apply_snapshot(panel, &entry.revert));
                            if entry.attempts < inner.max_attempts {
                                retry_after = retry_after.max(entry.attempts);
                                slots.pending.push((key, entry));
                                report.requeued += 1;
                            } else {
                                tracing::warn!(queue = inner.op.name(), ?key, "giving up on edit after {} attempts", entry.attempts);
                                report.dropped += 1;
                            }
                        }
                    }
                }
            }
        }
        slots.flushing = false;
        if retry_after > 0 && slots.timer.is_none() {
            self.arm_in(&mut slots, inner.debounce * retry_after);
        }

        if let Some(message) = report.message() {
            tracing::warn!(queue = inner.op.name(), scope = %inner.scope, "{}", message);
        }
        slots.last_report = Some(report.clone());
        report
    }

    /// Flushes outstanding edits as the owning view goes away.
    pub async fn close(self) -> FlushReport {
        self.slots().cancel_timer();
        self.flush().await
    }
}
