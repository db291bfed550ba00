use std::sync::Arc;

use async_trait::async_trait;
use curricula_core::models::MetadataPatch;
use uuid::Uuid;

use super::error::ClientError;
use super::panel::{Confirmation, Panel, Snapshot};
use super::queue::QueueOp;
use super::transport::LinkTransport;

#[derive(Debug, Clone, PartialEq)]
pub enum Membership {
    Attach(MetadataPatch),
    Detach,
}

/// Attach/detach per template. Each item is its own request, so one failure
/// leaves the rest of the batch standing.
pub struct MembershipOp {
    transport: Arc<dyn LinkTransport>,
}

impl MembershipOp {
    pub fn new(transport: Arc<dyn LinkTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl QueueOp for MembershipOp {
    type Key = Uuid;
    type Payload = Membership;

    fn name(&self) -> &'static str {
        "membership"
    }

    fn snapshot(&self, panel: &Panel, template_id: &Uuid) -> Snapshot {
        panel.entity_snapshot(*template_id)
    }

    fn apply_optimistic(
        &self,
        scope: Uuid,
        panel: &Panel,
        template_id: &Uuid,
        payload: &Membership,
    ) -> Panel {
        match payload {
            Membership::Attach(_) => panel.with_attached(scope, *template_id),
            Membership::Detach => panel.with_detached(*template_id),
        }
    }

    fn merge(&self, pending: &mut Membership, newer: Membership) {
        *pending = newer;
    }

    async fn send(
        &self,
        scope: Uuid,
        batch: &[(Uuid, Membership)],
    ) -> Vec<Result<Confirmation, ClientError>> {
        let mut outcomes = Vec::with_capacity(batch.len());
        for (template_id, intent) in batch {
            let outcome = match intent {
                Membership::Attach(overrides) => self
                    .transport
                    .attach(scope, *template_id, overrides)
                    .await
                    .map(|res| Confirmation::Linked(res.template)),
                Membership::Detach => self
                    .transport
                    .detach(scope, *template_id)
                    .await
                    .map(|_| Confirmation::Unlinked(*template_id)),
            };
            if let Err(e) = &outcome {
                tracing::debug!(%scope, %template_id, "membership change failed: {}", e);
            }
            outcomes.push(outcome);
        }
        outcomes
    }
}

/// Link override edits, one PATCH per template carrying every buffered field.
pub struct MetadataOp {
    transport: Arc<dyn LinkTransport>,
}

impl MetadataOp {
    pub fn new(transport: Arc<dyn LinkTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl QueueOp for MetadataOp {
    type Key = Uuid;
    type Payload = MetadataPatch;

    fn name(&self) -> &'static str {
        "metadata"
    }

    fn snapshot(&self, panel: &Panel, template_id: &Uuid) -> Snapshot {
        panel.entity_snapshot(*template_id)
    }

    fn apply_optimistic(
        &self,
        _scope: Uuid,
        panel: &Panel,
        template_id: &Uuid,
        patch: &MetadataPatch,
    ) -> Panel {
        panel.with_metadata(*template_id, patch)
    }

    fn merge(&self, pending: &mut MetadataPatch, newer: MetadataPatch) {
        pending.merge(newer);
    }

    async fn send(
        &self,
        scope: Uuid,
        batch: &[(Uuid, MetadataPatch)],
    ) -> Vec<Result<Confirmation, ClientError>> {
        let mut outcomes = Vec::with_capacity(batch.len());
        for (template_id, patch) in batch {
            let outcome = self
                .transport
                .update_metadata(scope, *template_id, patch)
                .await
                .map(|res| Confirmation::Linked(res.template));
            outcomes.push(outcome);
        }
        outcomes
    }
}

/// Whole-program ordering by link id. Only the latest order is ever sent.
pub struct ReorderOp {
    transport: Arc<dyn LinkTransport>,
}

impl ReorderOp {
    pub fn new(transport: Arc<dyn LinkTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl QueueOp for ReorderOp {
    type Key = ();
    type Payload = Vec<Uuid>;

    fn name(&self) -> &'static str {
        "reorder"
    }

    fn snapshot(&self, panel: &Panel, _key: &()) -> Snapshot {
        panel.order_snapshot()
    }

    fn apply_optimistic(&self, _scope: Uuid, panel: &Panel, _key: &(), order: &Vec<Uuid>) -> Panel {
        panel.with_order(order)
    }

    fn merge(&self, pending: &mut Vec<Uuid>, newer: Vec<Uuid>) {
        *pending = newer;
    }

    async fn send(
        &self,
        scope: Uuid,
        batch: &[((), Vec<Uuid>)],
    ) -> Vec<Result<Confirmation, ClientError>> {
        let mut outcomes = Vec::with_capacity(batch.len());
        for (_, order) in batch {
            let order: Vec<Uuid> = order.iter().copied().filter(|id| !id.is_nil()).collect();
            let result = self.transport.reorder(scope, &order).await;
            outcomes.push(result.map(|res| Confirmation::Reordered {
                order,
                updated: res.updated,
            }));
        }
        outcomes
    }
}
