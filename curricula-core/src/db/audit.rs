use rusqlite::params;
use uuid::Uuid;

use super::{conversion_error, datetime_at, now, opt_uuid_at, uuid_at, Database};
use crate::error::LinkResult;
use crate::models::{AuditAction, AuditEntry, AuditEvent};

impl Database {
    pub fn insert_audit(&self, entry: &AuditEntry) -> LinkResult<Uuid> {
        let id = Uuid::new_v4();
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO audit_events (id, actor, action, program_id, template_id, detail, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id.to_string(),
                    entry.actor.to_string(),
                    entry.action.as_str(),
                    entry.program_id.to_string(),
                    entry.template_id.map(|t| t.to_string()),
                    entry.detail.to_string(),
                    now(),
                ],
            )?;
            Ok(id)
        })
    }

    pub fn list_audit(&self, program_id: Uuid) -> LinkResult<Vec<AuditEvent>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, actor, action, program_id, template_id, detail, created_at
                 FROM audit_events WHERE program_id = ?1 ORDER BY created_at, rowid",
            )?;
            let events = stmt
                .query_map(params![program_id.to_string()], |row| {
                    let action: String = row.get(2)?;
                    let action = AuditAction::from_str(&action)
                        .ok_or_else(|| conversion_error(2, format!("unknown action {action}")))?;
                    let detail: String = row.get(5)?;
                    let detail = serde_json::from_str(&detail)
                        .map_err(|e| conversion_error(5, e.to_string()))?;
                    Ok(AuditEvent {
                        id: uuid_at(row, 0)?,
                        entry: AuditEntry {
                            actor: uuid_at(row, 1)?,
                            action,
                            program_id: uuid_at(row, 3)?,
                            template_id: opt_uuid_at(row, 4)?,
                            detail,
                        },
                        created_at: datetime_at(row, 6)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(events)
        })
    }
}
