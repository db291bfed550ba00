//! Authorization gate evaluated before any link handler runs.

use curricula_core::models::{ResourceKind, Role, User};
use curricula_core::{Database, LinkError};
use uuid::Uuid;

/// Resource-level read check. Admin bypasses it.
pub fn can_read(user: &User, kind: ResourceKind) -> bool {
    user.can_read(kind)
}

/// Mutation check: admin, or a manager scoped to `program_id`.
pub fn can_manage(db: &Database, user: &User, program_id: Uuid) -> Result<bool, LinkError> {
    if user.is_admin() {
        return Ok(true);
    }
    if !user.has_role(Role::Manager) {
        return Ok(false);
    }
    db.is_program_manager(program_id, user.id)
}
