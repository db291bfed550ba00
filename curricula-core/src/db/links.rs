use std::collections::HashSet;

use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::programs::require_program;
use super::templates::{find_template, template_from_row, TEMPLATE_COLUMNS, TEMPLATE_COLUMN_COUNT};
use super::{datetime_at, now, opt_uuid_at, uuid_at, Database};
use crate::error::{LinkError, LinkResult};
use crate::models::{
    AttachOutcome, DetachOutcome, EffectiveTemplate, Link, LinkOverrides, ListTemplatesQuery,
    MetadataOutcome, MetadataPatch, ProgramTemplates, Template, TemplateStatus,
};

const LINK_COLUMNS: &str = "l.link_id, l.program_id, l.template_id, l.notes, l.hyperlink, \
     l.sort_order, l.due_offset_days, l.required, l.visibility, l.visible, l.created_by, \
     l.updated_by, l.created_at, l.updated_at";

fn link_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Link> {
    Ok(Link {
        link_id: uuid_at(row, offset)?,
        program_id: uuid_at(row, offset + 1)?,
        template_id: uuid_at(row, offset + 2)?,
        overrides: LinkOverrides {
            notes: row.get(offset + 3)?,
            hyperlink: row.get(offset + 4)?,
            sort_order: row.get(offset + 5)?,
            due_offset_days: row.get(offset + 6)?,
            required: row.get(offset + 7)?,
            visibility: row.get(offset + 8)?,
        },
        visible: row.get(offset + 9)?,
        created_by: opt_uuid_at(row, offset + 10)?,
        updated_by: opt_uuid_at(row, offset + 11)?,
        created_at: datetime_at(row, offset + 12)?,
        updated_at: datetime_at(row, offset + 13)?,
    })
}

fn find_link(conn: &Connection, program_id: Uuid, template_id: Uuid) -> LinkResult<Option<Link>> {
    let link = conn
        .query_row(
            &format!(
                "SELECT {LINK_COLUMNS} FROM program_template_links l
                 WHERE l.program_id = ?1 AND l.template_id = ?2"
            ),
            params![program_id.to_string(), template_id.to_string()],
            |row| link_from_row(row, 0),
        )
        .optional()?;
    Ok(link)
}

fn effective_rows(conn: &Connection, program_id: Uuid) -> LinkResult<Vec<(Template, Link)>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TEMPLATE_COLUMNS}, {LINK_COLUMNS}
         FROM program_template_links l
         JOIN templates t ON t.id = l.template_id
         WHERE l.program_id = ?1"
    ))?;
    let rows = stmt
        .query_map(params![program_id.to_string()], |row| {
            Ok((
                template_from_row(row, 0)?,
                link_from_row(row, TEMPLATE_COLUMN_COUNT)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

impl Database {
    /// Links a template into a program, or reports the existing link.
    ///
    /// A template that is already linked is grandfathered regardless of its
    /// status; a new link requires a published, non-deleted template.
    pub fn attach_template(
        &self,
        program_id: Uuid,
        template_id: Uuid,
        overrides: &MetadataPatch,
        actor: Option<Uuid>,
    ) -> LinkResult<AttachOutcome> {
        self.transaction(|tx| {
            require_program(tx, program_id)?;
            let template =
                find_template(tx, template_id, false)?.ok_or(LinkError::TemplateNotFound)?;

            if let Some(link) = find_link(tx, program_id, template_id)? {
                return Ok(AttachOutcome {
                    template: EffectiveTemplate::merge(&template, &link),
                    already_attached: true,
                });
            }

            if template.status != TemplateStatus::Published {
                return Err(LinkError::InvalidStatus(format!(
                    "template is {}, only published templates can be attached",
                    template.status.as_str()
                )));
            }

            let mut fields = LinkOverrides::default();
            let mut visible = true;
            overrides.apply_to(&mut fields, &mut visible);

            let ts = now();
            let actor = actor.map(|id| id.to_string());
            let inserted = tx.execute(
                "INSERT INTO program_template_links (link_id, program_id, template_id, notes,
                     hyperlink, sort_order, due_offset_days, required, visibility, visible,
                     created_by, updated_by, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11, ?12, ?12)
                 ON CONFLICT(program_id, template_id) DO NOTHING",
                params![
                    Uuid::new_v4().to_string(),
                    program_id.to_string(),
                    template_id.to_string(),
                    fields.notes,
                    fields.hyperlink,
                    fields.sort_order,
                    fields.due_offset_days,
                    fields.required,
                    fields.visibility,
                    visible,
                    actor,
                    ts,
                ],
            )?;

            let link = find_link(tx, program_id, template_id)?.ok_or(LinkError::NotFound)?;
            tracing::debug!(%program_id, %template_id, link_id = %link.link_id, "attached template");
            Ok(AttachOutcome {
                template: EffectiveTemplate::merge(&template, &link),
                already_attached: inserted == 0,
            })
        })
    }

    /// Removes a link if present. Soft-deleted templates can still be detached.
    pub fn detach_template(&self, program_id: Uuid, template_id: Uuid) -> LinkResult<DetachOutcome> {
        self.transaction(|tx| {
            require_program(tx, program_id)?;
            let template =
                find_template(tx, template_id, true)?.ok_or(LinkError::TemplateNotFound)?;
            let deleted = tx.execute(
                "DELETE FROM program_template_links WHERE program_id = ?1 AND template_id = ?2",
                params![program_id.to_string(), template_id.to_string()],
            )?;
            tracing::debug!(%program_id, %template_id, deleted, "detached template");
            Ok(DetachOutcome {
                template,
                was_attached: deleted > 0,
            })
        })
    }

    /// Applies the present fields of `patch` to one link's overrides.
    pub fn update_link_metadata(
        &self,
        program_id: Uuid,
        template_id: Uuid,
        patch: &MetadataPatch,
        actor: Option<Uuid>,
    ) -> LinkResult<MetadataOutcome> {
        if patch.is_empty() {
            return Err(LinkError::NoFields);
        }
        self.transaction(|tx| {
            require_program(tx, program_id)?;
            let mut link = find_link(tx, program_id, template_id)?.ok_or(LinkError::NotFound)?;
            let template = find_template(tx, template_id, true)?.ok_or(LinkError::NotFound)?;

            patch.apply_to(&mut link.overrides, &mut link.visible);
            let fields = &link.overrides;
            let changed = tx.execute(
                "UPDATE program_template_links
                 SET notes = ?1, hyperlink = ?2, sort_order = ?3, due_offset_days = ?4,
                     required = ?5, visibility = ?6, visible = ?7, updated_by = ?8,
                     updated_at = ?9
                 WHERE link_id = ?10",
                params![
                    fields.notes,
                    fields.hyperlink,
                    fields.sort_order,
                    fields.due_offset_days,
                    fields.required,
                    fields.visibility,
                    link.visible,
                    actor.map(|id| id.to_string()),
                    now(),
                    link.link_id.to_string(),
                ],
            )?;

            let link = find_link(tx, program_id, template_id)?.ok_or(LinkError::NotFound)?;
            Ok(MetadataOutcome {
                updated: changed > 0,
                template: EffectiveTemplate::merge(&template, &link),
            })
        })
    }

    /// Rewrites sort_order to position + 1 for each link id that belongs to
    /// `program_id`. Ids from other programs or unknown ids are skipped.
    pub fn reorder_links(
        &self,
        program_id: Uuid,
        order: &[Uuid],
        actor: Option<Uuid>,
    ) -> LinkResult<usize> {
        let mut seen = HashSet::with_capacity(order.len());
        if let Some(dup) = order.iter().find(|id| !seen.insert(**id)) {
            return Err(LinkError::InvalidOrder(format!("duplicate link id {dup}")));
        }

        self.transaction(|tx| {
            require_program(tx, program_id)?;
            let ts = now();
            let actor = actor.map(|id| id.to_string());
            let mut stmt = tx.prepare(
                "UPDATE program_template_links
                 SET sort_order = ?1, updated_by = ?2, updated_at = ?3
                 WHERE link_id = ?4 AND program_id = ?5",
            )?;
            let mut updated = 0;
            for (index, link_id) in order.iter().enumerate() {
                updated += stmt.execute(params![
                    index as i64 + 1,
                    actor,
                    ts,
                    link_id.to_string(),
                    program_id.to_string(),
                ])?;
            }
            tracing::debug!(%program_id, submitted = order.len(), updated, "reordered links");
            Ok(updated)
        })
    }

    pub fn get_effective_template(
        &self,
        program_id: Uuid,
        template_id: Uuid,
    ) -> LinkResult<Option<EffectiveTemplate>> {
        self.with_connection(|conn| {
            let Some(link) = find_link(conn, program_id, template_id)? else {
                return Ok(None);
            };
            let template = find_template(conn, template_id, true)?;
            Ok(template.map(|t| EffectiveTemplate::merge(&t, &link)))
        })
    }

    /// Effective views of a program's links plus the published templates it
    /// could still pick from.
    pub fn list_program_templates(
        &self,
        program_id: Uuid,
        query: &ListTemplatesQuery,
    ) -> LinkResult<ProgramTemplates> {
        self.with_connection(|conn| {
            let program = require_program(conn, program_id)?;

            let mut assigned: Vec<EffectiveTemplate> = effective_rows(conn, program_id)?
                .iter()
                .filter(|(template, _)| query.include_deleted || !template.is_deleted())
                .filter(|(template, _)| query.status.map_or(true, |s| template.status == s))
                .map(|(template, link)| EffectiveTemplate::merge(template, link))
                .collect();
            assigned.sort_by(EffectiveTemplate::panel_order);

            let mut stmt = conn.prepare(&format!(
                "SELECT {TEMPLATE_COLUMNS} FROM templates t
                 WHERE t.status = 'published' AND t.deleted_at IS NULL
                   AND t.id NOT IN (
                       SELECT template_id FROM program_template_links WHERE program_id = ?1
                   )
                 ORDER BY t.week_number, t.sort_order IS NULL, t.sort_order, t.label"
            ))?;
            let available = stmt
                .query_map(params![program_id.to_string()], |row| template_from_row(row, 0))?
                .map(|row| row.map(|t| t.summary()))
                .collect::<Result<Vec<_>, _>>()?;

            Ok(ProgramTemplates {
                program,
                assigned,
                available,
            })
        })
    }
}
