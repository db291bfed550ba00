//! Client-side sync engine: optimistic queues per operation class, the
//! per-program panel cache they write into, and the tag widget adapter.

mod error;
mod ops;
mod panel;
mod queue;
mod tags;
mod transport;

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

pub use error::ClientError;
pub use ops::{Membership, MembershipOp, MetadataOp, ReorderOp};
pub use panel::{apply_snapshot, Confirmation, Panel, PanelStore, Snapshot};
pub use queue::{FlushReport, OptimisticQueue, QueueOp, QueueState};
pub use tags::{ChangeOrigin, TagAction, TagChange, TagSyncAdapter, TagWidget};
pub use transport::{HttpTransport, LinkTransport};

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub attach_debounce: Duration,
    pub metadata_debounce: Duration,
    pub reorder_debounce: Duration,
    /// Sends per edit before a failing edit is reverted for good.
    pub max_attempts: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            attach_debounce: Duration::from_millis(600),
            metadata_debounce: Duration::from_millis(600),
            reorder_debounce: Duration::from_millis(400),
            max_attempts: 3,
        }
    }
}

/// Fetches the authoritative panel and replaces the cached one.
pub async fn load_panel(
    transport: &dyn LinkTransport,
    panels: &PanelStore,
    program_id: Uuid,
) -> Result<Panel, ClientError> {
    let panel = Panel::from(transport.load_panel(program_id).await?);
    panels.replace(program_id, panel.clone());
    Ok(panel)
}

/// The three queues of one program view. Created when the view opens and
/// closed with it; nothing here is process-wide.
pub struct ProgramQueues {
    pub membership: OptimisticQueue<MembershipOp>,
    pub metadata: OptimisticQueue<MetadataOp>,
    pub reorder: OptimisticQueue<ReorderOp>,
}

impl ProgramQueues {
    pub fn new(
        program_id: Uuid,
        transport: Arc<dyn LinkTransport>,
        panels: PanelStore,
        config: &QueueConfig,
    ) -> Self {
        Self {
            membership: OptimisticQueue::new(
                MembershipOp::new(Arc::clone(&transport)),
                program_id,
                panels.clone(),
                config.attach_debounce,
                config.max_attempts,
            ),
            metadata: OptimisticQueue::new(
                MetadataOp::new(Arc::clone(&transport)),
                program_id,
                panels.clone(),
                config.metadata_debounce,
                config.max_attempts,
            ),
            reorder: OptimisticQueue::new(
                ReorderOp::new(transport),
                program_id,
                panels,
                config.reorder_debounce,
                config.max_attempts,
            ),
        }
    }

    /// Queues a new order for the program's links, in display order.
    pub fn reorder(&self, link_ids: Vec<Uuid>) {
        self.reorder.enqueue((), link_ids);
    }

    pub async fn flush_all(&self) -> FlushReport {
        let mut total = FlushReport::default();
        for report in [
            self.membership.flush().await,
            self.metadata.flush().await,
            self.reorder.flush().await,
        ] {
            total.succeeded += report.succeeded;
            total.failed += report.failed;
            total.requeued += report.requeued;
            total.dropped += report.dropped;
            total.errors.extend(report.errors);
        }
        total
    }
}
