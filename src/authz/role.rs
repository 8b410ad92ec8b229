use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Privilege level of a user. Exactly one role is active per user.
///
/// The derived ordering is part of the contract: `Banned < Reader < Writer < Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Banned,
    Reader,
    Writer,
    Admin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Banned, Role::Reader, Role::Writer, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Banned => "banned",
            Role::Reader => "reader",
            Role::Writer => "writer",
            Role::Admin => "admin",
        }
    }

    /// Parse a stored role value. Unknown values degrade to `Reader` rather
    /// than failing the lookup.
    pub fn from_db(value: &str) -> Role {
        match value {
            "banned" => Role::Banned,
            "writer" => Role::Writer,
            "admin" => Role::Admin,
            _ => Role::Reader,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four capabilities derived from a role. Never persisted; always
/// recomputed through [`PermissionSet::for_role`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PermissionSet {
    pub can_read: bool,
    pub can_write: bool,
    pub can_delete: bool,
    pub can_comment: bool,
}

impl PermissionSet {
    /// The capability table. Total over `Role`; each role maps to exactly one row.
    pub const fn for_role(role: Role) -> PermissionSet {
        match role {
            Role::Admin => PermissionSet {
                can_read: true,
                can_write: true,
                can_delete: true,
                can_comment: true,
            },
            Role::Writer => PermissionSet {
                can_read: true,
                can_write: true,
                can_delete: false,
                can_comment: true,
            },
            Role::Reader => PermissionSet {
                can_read: true,
                can_write: false,
                can_delete: false,
                can_comment: true,
            },
            Role::Banned => PermissionSet {
                can_read: true,
                can_write: false,
                can_delete: false,
                can_comment: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_table_is_exact() {
        let expect = |role| match role {
            Role::Admin => (true, true, true, true),
            Role::Writer => (true, true, false, true),
            Role::Reader => (true, false, false, true),
            Role::Banned => (true, false, false, false),
        };

        for role in Role::ALL {
            let perms = PermissionSet::for_role(role);
            let (read, write, delete, comment) = expect(role);
            assert_eq!(perms.can_read, read, "can_read for {role}");
            assert_eq!(perms.can_write, write, "can_write for {role}");
            assert_eq!(perms.can_delete, delete, "can_delete for {role}");
            assert_eq!(perms.can_comment, comment, "can_comment for {role}");
        }
    }

    #[test]
    fn role_ordering_is_total() {
        assert!(Role::Banned < Role::Reader);
        assert!(Role::Reader < Role::Writer);
        assert!(Role::Writer < Role::Admin);
    }

    #[test]
    fn unknown_stored_role_degrades_to_reader() {
        assert_eq!(Role::from_db("moderator"), Role::Reader);
        assert_eq!(Role::from_db(""), Role::Reader);
        assert_eq!(Role::from_db("admin"), Role::Admin);
        assert_eq!(Role::from_db("banned"), Role::Banned);
    }
}
