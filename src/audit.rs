use curricula_core::models::AuditEntry;
use curricula_core::Database;

/// Fire-and-forget writer for mutation audit events. Writes run on the
/// blocking pool; a failed write is logged and dropped.
#[derive(Clone)]
pub struct AuditWriter {
    db: Database,
}

impl AuditWriter {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn record(&self, entry: AuditEntry) {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = db.insert_audit(&entry) {
                tracing::warn!(
                    action = entry.action.as_str(),
                    program_id = %entry.program_id,
                    "failed to write audit event: {}",
                    e
                );
            }
        });
    }
}
