use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{conversion_error, datetime_at, now, opt_datetime_at, uuid_at, Database};
use crate::error::{LinkError, LinkResult};
use crate::models::{CreateTemplateInput, Template, TemplateStatus};

pub(crate) const TEMPLATE_COLUMNS: &str = "t.id, t.week_number, t.label, t.notes, t.sort_order, \
     t.status, t.external_link, t.category, t.estimated_minutes, t.deleted_at, t.created_at, \
     t.updated_at";

/// Number of columns in [`TEMPLATE_COLUMNS`].
pub(crate) const TEMPLATE_COLUMN_COUNT: usize = 12;

pub(crate) fn template_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Template> {
    let status: String = row.get(offset + 5)?;
    let status = TemplateStatus::from_str(&status)
        .ok_or_else(|| conversion_error(offset + 5, format!("unknown template status {status}")))?;
    Ok(Template {
        id: uuid_at(row, offset)?,
        week_number: row.get(offset + 1)?,
        label: row.get(offset + 2)?,
        notes: row.get(offset + 3)?,
        sort_order: row.get(offset + 4)?,
        status,
        external_link: row.get(offset + 6)?,
        category: row.get(offset + 7)?,
        estimated_minutes: row.get(offset + 8)?,
        deleted_at: opt_datetime_at(row, offset + 9)?,
        created_at: datetime_at(row, offset + 10)?,
        updated_at: datetime_at(row, offset + 11)?,
    })
}

/// Looks up a template. Soft-deleted rows are only returned with `include_deleted`.
pub(crate) fn find_template(
    conn: &Connection,
    id: Uuid,
    include_deleted: bool,
) -> LinkResult<Option<Template>> {
    let template = conn
        .query_row(
            &format!("SELECT {TEMPLATE_COLUMNS} FROM templates t WHERE t.id = ?1"),
            params![id.to_string()],
            |row| template_from_row(row, 0),
        )
        .optional()?;
    Ok(template.filter(|t| include_deleted || !t.is_deleted()))
}

impl Database {
    pub fn create_template(&self, input: CreateTemplateInput) -> LinkResult<Template> {
        let id = Uuid::new_v4();
        let status = input.status.unwrap_or(TemplateStatus::Draft);
        self.transaction(|tx| {
            let ts = now();
            tx.execute(
                "INSERT INTO templates (id, week_number, label, notes, sort_order, status,
                     external_link, category, estimated_minutes, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
                params![
                    id.to_string(),
                    input.week_number,
                    input.label,
                    input.notes,
                    input.sort_order,
                    status.as_str(),
                    input.external_link,
                    input.category,
                    input.estimated_minutes,
                    ts,
                ],
            )?;
            find_template(tx, id, false)?.ok_or(LinkError::TemplateNotFound)
        })
    }

    pub fn get_template(&self, id: Uuid) -> LinkResult<Option<Template>> {
        self.with_connection(|conn| find_template(conn, id, false))
    }

    pub fn get_template_including_deleted(&self, id: Uuid) -> LinkResult<Option<Template>> {
        self.with_connection(|conn| find_template(conn, id, true))
    }

    /// Accepts the raw status name so callers get `invalid_status` for typos.
    pub fn set_template_status(&self, id: Uuid, status: &str) -> LinkResult<Template> {
        let status = TemplateStatus::from_str(status)
            .ok_or_else(|| LinkError::InvalidStatus(status.to_string()))?;
        self.transaction(|tx| {
            let changed = tx.execute(
                "UPDATE templates SET status = ?1, updated_at = ?2
                 WHERE id = ?3 AND deleted_at IS NULL",
                params![status.as_str(), now(), id.to_string()],
            )?;
            if changed == 0 {
                return Err(LinkError::TemplateNotFound);
            }
            find_template(tx, id, false)?.ok_or(LinkError::TemplateNotFound)
        })
    }

    /// Marks the template deleted. Existing links are left in place.
    pub fn soft_delete_template(&self, id: Uuid) -> LinkResult<Template> {
        self.transaction(|tx| {
            let ts = now();
            tx.execute(
                "UPDATE templates SET deleted_at = ?1, updated_at = ?1
                 WHERE id = ?2 AND deleted_at IS NULL",
                params![ts, id.to_string()],
            )?;
            find_template(tx, id, true)?.ok_or(LinkError::TemplateNotFound)
        })
    }

    pub fn restore_template(&self, id: Uuid) -> LinkResult<Template> {
        self.transaction(|tx| {
            tx.execute(
                "UPDATE templates SET deleted_at = NULL, updated_at = ?1 WHERE id = ?2",
                params![now(), id.to_string()],
            )?;
            find_template(tx, id, false)?.ok_or(LinkError::TemplateNotFound)
        })
    }
}
