use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{datetime_at, now, opt_datetime_at, uuid_at, Database};
use crate::error::{LinkError, LinkResult};
use crate::models::{CreateProgramInput, Program};

const PROGRAM_COLUMNS: &str = "id, title, total_weeks, description, archived_at, created_at";

fn program_from_row(row: &Row<'_>) -> rusqlite::Result<Program> {
    Ok(Program {
        id: uuid_at(row, 0)?,
        title: row.get(1)?,
        total_weeks: row.get(2)?,
        description: row.get(3)?,
        archived_at: opt_datetime_at(row, 4)?,
        created_at: datetime_at(row, 5)?,
    })
}

pub(crate) fn find_program(conn: &Connection, id: Uuid) -> LinkResult<Option<Program>> {
    let program = conn
        .query_row(
            &format!("SELECT {PROGRAM_COLUMNS} FROM programs WHERE id = ?1"),
            params![id.to_string()],
            program_from_row,
        )
        .optional()?;
    Ok(program)
}

/// Fails with `program_not_found` unless the program exists.
pub(crate) fn require_program(conn: &Connection, id: Uuid) -> LinkResult<Program> {
    find_program(conn, id)?.ok_or(LinkError::ProgramNotFound)
}

impl Database {
    pub fn create_program(&self, input: CreateProgramInput) -> LinkResult<Program> {
        let id = Uuid::new_v4();
        self.transaction(|tx| {
            tx.execute(
                "INSERT INTO programs (id, title, total_weeks, description, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id.to_string(),
                    input.title,
                    input.total_weeks,
                    input.description,
                    now()
                ],
            )?;
            require_program(tx, id)
        })
    }

    pub fn get_program(&self, id: Uuid) -> LinkResult<Option<Program>> {
        self.with_connection(|conn| find_program(conn, id))
    }

    /// Archiving is a lifecycle flag only; links are untouched.
    pub fn archive_program(&self, id: Uuid) -> LinkResult<Program> {
        self.transaction(|tx| {
            let changed = tx.execute(
                "UPDATE programs SET archived_at = ?1 WHERE id = ?2 AND archived_at IS NULL",
                params![now(), id.to_string()],
            )?;
            let program = require_program(tx, id)?;
            if changed == 0 {
                tracing::debug!(program_id = %id, "program already archived");
            }
            Ok(program)
        })
    }

    /// Gives `user_id` manager scope over one program. Idempotent.
    pub fn grant_manager(&self, program_id: Uuid, user_id: Uuid) -> LinkResult<bool> {
        self.transaction(|tx| {
            require_program(tx, program_id)?;
            let inserted = tx.execute(
                "INSERT INTO program_managers (program_id, user_id, created_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(program_id, user_id) DO NOTHING",
                params![program_id.to_string(), user_id.to_string(), now()],
            )?;
            Ok(inserted > 0)
        })
    }

    pub fn is_program_manager(&self, program_id: Uuid, user_id: Uuid) -> LinkResult<bool> {
        self.with_connection(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM program_managers WHERE program_id = ?1 AND user_id = ?2",
                    params![program_id.to_string(), user_id.to_string()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }
}
