use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::fmt;

/// Actions gated per role. Ownership of a record is checked by the query,
/// not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    SubmitRecords,
    ViewOwnRecords,
    ExportOwnRecords,

    ViewAllRecords,
    ExportAllRecords,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

static FILER_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    HashSet::from([
        Permission::SubmitRecords,
        Permission::ViewOwnRecords,
        Permission::ExportOwnRecords,
    ])
});

static ADMIN_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    FILER_PERMISSIONS
        .iter()
        .copied()
        .chain([Permission::ViewAllRecords, Permission::ExportAllRecords])
        .collect()
});

impl Role {
    /// Users table stores a boolean; admins get the wider permission set.
    pub fn from_admin_flag(is_admin: bool) -> Self {
        if is_admin { Role::Admin } else { Role::User }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        let granted = match self {
            Role::User => &*FILER_PERMISSIONS,
            Role::Admin => &*ADMIN_PERMISSIONS,
        };
        granted.contains(&permission)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::User => "user",
            Role::Admin => "admin",
        })
    }
}
