//! Permissions and roles

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// An action on a kind of resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "environment::create")]
    EnvironmentCreate,
    #[serde(rename = "environment::read")]
    EnvironmentRead,
    #[serde(rename = "environment::update")]
    EnvironmentUpdate,
    #[serde(rename = "environment::delete")]
    EnvironmentDelete,
    #[serde(rename = "build::delete")]
    BuildDelete,
}

impl Permission {
    /// Every permission
    pub const ALL: [Permission; 5] = [
        Permission::EnvironmentCreate,
        Permission::EnvironmentRead,
        Permission::EnvironmentUpdate,
        Permission::EnvironmentDelete,
        Permission::BuildDelete,
    ];

    /// Wire name, `<resource>::<action>`
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EnvironmentCreate => "environment::create",
            Self::EnvironmentRead => "environment::read",
            Self::EnvironmentUpdate => "environment::update",
            Self::EnvironmentDelete => "environment::delete",
            Self::BuildDelete => "build::delete",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of permissions
///
/// # Example
///
/// ```rust
/// use envstore_server::auth::{Permission, PermissionSet, Role};
///
/// let granted = Role::Developer.permissions();
/// assert!(granted.contains(Permission::EnvironmentUpdate));
/// assert!(granted.is_superset(&PermissionSet::from([Permission::EnvironmentRead])));
/// assert!(!granted.contains(Permission::BuildDelete));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    /// Whether every permission in `required` is in this set
    pub fn is_superset(&self, required: &PermissionSet) -> bool {
        self.0.is_superset(&required.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Add all permissions of `other`
    pub fn extend(&mut self, other: &PermissionSet) {
        self.0.extend(other.0.iter().copied());
    }

    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }
}

impl<const N: usize> From<[Permission; N]> for PermissionSet {
    fn from(permissions: [Permission; N]) -> Self {
        Self(BTreeSet::from(permissions))
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(Permission::as_str).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

/// Named bundle of permissions granted through a role binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Read environments
    Viewer,
    /// Read, create and update environments
    Developer,
    /// Everything
    Admin,
}

impl Role {
    /// Permissions the role grants
    pub fn permissions(self) -> PermissionSet {
        match self {
            Self::Viewer => PermissionSet::from([Permission::EnvironmentRead]),
            Self::Developer => PermissionSet::from([
                Permission::EnvironmentCreate,
                Permission::EnvironmentRead,
                Permission::EnvironmentUpdate,
            ]),
            Self::Admin => Permission::ALL.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_are_nested() {
        let viewer = Role::Viewer.permissions();
        let developer = Role::Developer.permissions();
        let admin = Role::Admin.permissions();
        assert!(developer.is_superset(&viewer));
        assert!(admin.is_superset(&developer));
        assert!(!viewer.is_superset(&developer));
    }

    #[test]
    fn test_empty_requirement_is_always_met() {
        assert!(PermissionSet::new().is_superset(&PermissionSet::new()));
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(
            serde_json::to_value(Permission::BuildDelete).unwrap(),
            "build::delete"
        );
        assert_eq!(
            serde_json::from_str::<Role>("\"developer\"").unwrap(),
            Role::Developer
        );
        for permission in Permission::ALL {
            assert_eq!(
                serde_json::to_value(permission).unwrap(),
                permission.as_str()
            );
        }
    }

    #[test]
    fn test_display_set() {
        let set = PermissionSet::from([Permission::EnvironmentRead, Permission::BuildDelete]);
        assert_eq!(set.to_string(), "{environment::read, build::delete}");
    }
}
