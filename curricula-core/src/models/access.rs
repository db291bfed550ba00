use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Viewer,
    Trainee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Viewer => "viewer",
            Self::Trainee => "trainee",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Self::Admin),
            "manager" => Some(Self::Manager),
            "viewer" => Some(Self::Viewer),
            "trainee" => Some(Self::Trainee),
            _ => None,
        }
    }

    fn can_read(&self, kind: ResourceKind) -> bool {
        match self {
            Self::Admin | Self::Manager | Self::Viewer => true,
            Self::Trainee => kind == ResourceKind::Programs,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Programs,
    Templates,
}

/// Authenticated caller as supplied by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub roles: BTreeSet<Role>,
}

impl User {
    pub fn new(id: Uuid, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            id,
            roles: roles.into_iter().collect(),
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    /// Resource-level read permission. Admin bypasses the check.
    pub fn can_read(&self, kind: ResourceKind) -> bool {
        self.is_admin() || self.roles.iter().any(|role| role.can_read(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trainee_reads_programs_but_not_templates() {
        let user = User::new(Uuid::new_v4(), [Role::Trainee]);
        assert!(user.can_read(ResourceKind::Programs));
        assert!(!user.can_read(ResourceKind::Templates));
    }

    #[test]
    fn no_roles_means_no_reads() {
        let user = User::new(Uuid::new_v4(), []);
        assert!(!user.can_read(ResourceKind::Programs));
    }

    #[test]
    fn admin_reads_everything() {
        let user = User::new(Uuid::new_v4(), [Role::Admin]);
        assert!(user.can_read(ResourceKind::Programs));
        assert!(user.can_read(ResourceKind::Templates));
    }
}
