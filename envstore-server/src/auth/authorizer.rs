//! Authorization of list and single-resource operations

use std::sync::Arc;

use super::bindings::RoleBindings;
use super::permissions::{Permission, PermissionSet};
use crate::error::{Error, Result};
use crate::store::{Build, CollectionQuery, Environment, Namespace};

/// What a record is protected by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    /// A namespace as a whole
    Namespace(&'a str),
    /// One `namespace/name` resource
    Resource { namespace: &'a str, name: &'a str },
}

impl<'a> Scope<'a> {
    /// Parse a resource path; a path without `/` scopes a namespace
    pub fn parse(path: &'a str) -> Self {
        match path.split_once('/') {
            Some((namespace, name)) => Scope::Resource { namespace, name },
            None => Scope::Namespace(path),
        }
    }
}

/// Records subject to permission filtering
pub trait Protected {
    fn scope(&self) -> Scope<'_>;
}

impl Protected for Namespace {
    fn scope(&self) -> Scope<'_> {
        Scope::Namespace(&self.name)
    }
}

impl Protected for Environment {
    fn scope(&self) -> Scope<'_> {
        Scope::Resource {
            namespace: &self.namespace.name,
            name: &self.name,
        }
    }
}

impl Protected for Build {
    fn scope(&self) -> Scope<'_> {
        Scope::Resource {
            namespace: &self.namespace,
            name: &self.environment,
        }
    }
}

/// Decides what the current caller may see and do
pub trait Authorizer {
    /// Permissions the caller holds on `scope`
    fn permissions(&self, scope: Scope<'_>) -> PermissionSet;

    /// Whether the caller is anonymous
    fn is_anonymous(&self) -> bool;

    /// Narrow `query` to records the caller may read
    fn filter<R: Protected + 'static>(&self, query: &CollectionQuery<R>) -> CollectionQuery<R>;

    fn filter_namespaces(&self, query: &CollectionQuery<Namespace>) -> CollectionQuery<Namespace> {
        self.filter(query)
    }

    fn filter_environments(
        &self,
        query: &CollectionQuery<Environment>,
    ) -> CollectionQuery<Environment> {
        self.filter(query)
    }

    fn filter_builds(&self, query: &CollectionQuery<Build>) -> CollectionQuery<Build> {
        self.filter(query)
    }

    /// Check `required` against the caller's permissions on `resource_path`
    ///
    /// Returns `Ok(false)` when denied and `require` is false. When `require`
    /// is true a denial is an error: [`Error::Unauthorized`] for anonymous
    /// callers, [`Error::Forbidden`] otherwise.
    fn authorize_request(
        &self,
        resource_path: &str,
        required: &PermissionSet,
        require: bool,
    ) -> Result<bool> {
        let granted = self.permissions(Scope::parse(resource_path));
        if granted.is_superset(required) {
            return Ok(true);
        }

        tracing::warn!(
            resource = resource_path,
            required = %required,
            granted = %granted,
            anonymous = self.is_anonymous(),
            "Authorization denied"
        );

        if !require {
            return Ok(false);
        }
        if self.is_anonymous() {
            Err(Error::Unauthorized(format!(
                "authentication required for {resource_path}"
            )))
        } else {
            Err(Error::Forbidden(format!(
                "missing permissions {required} on {resource_path}"
            )))
        }
    }
}

/// Authorizer backed by the caller's compiled role bindings
///
/// Usually obtained as an extractor, see [`crate::auth::Authenticator`].
#[derive(Debug, Clone)]
pub struct RoleBindingAuthorizer {
    principal: Option<String>,
    bindings: Arc<RoleBindings>,
}

impl RoleBindingAuthorizer {
    /// Authorizer for an anonymous caller
    pub fn anonymous(bindings: Arc<RoleBindings>) -> Self {
        Self {
            principal: None,
            bindings,
        }
    }

    /// Authorizer for an authenticated principal
    pub fn principal(name: impl Into<String>, bindings: Arc<RoleBindings>) -> Self {
        Self {
            principal: Some(name.into()),
            bindings,
        }
    }

    /// Authenticated principal name, if any
    pub fn principal_name(&self) -> Option<&str> {
        self.principal.as_deref()
    }
}

fn scope_permissions(bindings: &RoleBindings, scope: Scope<'_>) -> PermissionSet {
    match scope {
        Scope::Namespace(namespace) => bindings.namespace_permissions(namespace),
        Scope::Resource { namespace, name } => bindings.permissions_for(namespace, name),
    }
}

impl Authorizer for RoleBindingAuthorizer {
    fn permissions(&self, scope: Scope<'_>) -> PermissionSet {
        scope_permissions(&self.bindings, scope)
    }

    fn is_anonymous(&self) -> bool {
        self.principal.is_none()
    }

    fn filter<R: Protected + 'static>(&self, query: &CollectionQuery<R>) -> CollectionQuery<R> {
        let bindings = Arc::clone(&self.bindings);
        query.filter(move |record: &R| {
            scope_permissions(&bindings, record.scope()).contains(Permission::EnvironmentRead)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::config::RoleBindingsConfig;
    use std::collections::{BTreeMap, BTreeSet};

    fn compiled(entries: &[(&str, Role)]) -> Arc<RoleBindings> {
        let config: RoleBindingsConfig = entries
            .iter()
            .map(|&(pattern, role)| (pattern.to_string(), BTreeSet::from([role])))
            .collect::<BTreeMap<_, _>>();
        Arc::new(RoleBindings::compile(&config).unwrap())
    }

    fn namespaces(names: &'static [&'static str]) -> CollectionQuery<Namespace> {
        CollectionQuery::from_fn(move || {
            names
                .iter()
                .enumerate()
                .map(|(i, name)| Namespace {
                    id: i as u64 + 1,
                    name: name.to_string(),
                })
                .collect()
        })
    }

    #[test]
    fn test_scope_parse() {
        assert_eq!(
            Scope::parse("default/web"),
            Scope::Resource {
                namespace: "default",
                name: "web"
            }
        );
        assert_eq!(Scope::parse("default"), Scope::Namespace("default"));
    }

    #[test]
    fn test_filter_applies_before_count() {
        let authz = RoleBindingAuthorizer::anonymous(compiled(&[("default/*", Role::Viewer)]));
        let visible = authz.filter_namespaces(&namespaces(&["default", "private", "other"]));
        assert_eq!(visible.count(), 1);
        assert_eq!(visible.all()[0].name, "default");
    }

    #[test]
    fn test_authorize_granted() {
        let authz =
            RoleBindingAuthorizer::principal("alice", compiled(&[("alice/*", Role::Admin)]));
        let required = PermissionSet::from([Permission::BuildDelete]);
        assert!(authz.authorize_request("alice/web", &required, true).unwrap());
    }

    #[test]
    fn test_denied_without_require_is_false() {
        let authz = RoleBindingAuthorizer::anonymous(compiled(&[("default/*", Role::Viewer)]));
        let required = PermissionSet::from([Permission::EnvironmentUpdate]);
        assert!(!authz.authorize_request("default/web", &required, false).unwrap());
    }

    #[test]
    fn test_anonymous_denial_is_unauthorized() {
        let authz = RoleBindingAuthorizer::anonymous(compiled(&[("default/*", Role::Viewer)]));
        let required = PermissionSet::from([Permission::EnvironmentDelete]);
        assert!(matches!(
            authz.authorize_request("default/web", &required, true),
            Err(Error::Unauthorized(_))
        ));
    }

    #[test]
    fn test_authenticated_denial_is_forbidden() {
        let authz = RoleBindingAuthorizer::principal("bob", compiled(&[("bob/*", Role::Viewer)]));
        let required = PermissionSet::from([Permission::EnvironmentRead]);
        assert!(matches!(
            authz.authorize_request("alice/web", &required, true),
            Err(Error::Forbidden(_))
        ));
        assert_eq!(authz.principal_name(), Some("bob"));
    }
}
