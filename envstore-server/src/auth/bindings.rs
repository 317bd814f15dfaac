//! Role binding patterns
//!
//! A binding maps a `namespace/name` pattern to roles. `*` matches any run of
//! characters within one segment, so `default/*` covers every environment in
//! `default` and `*/*` covers everything. A pattern without `/` binds the
//! whole namespace.

use regex::Regex;

use super::permissions::PermissionSet;
use crate::config::RoleBindingsConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
struct CompiledBinding {
    /// Original pattern string for debugging
    pattern: String,
    namespace: Regex,
    name: Regex,
    permissions: PermissionSet,
}

/// Compiled role bindings of one caller
#[derive(Debug, Clone, Default)]
pub struct RoleBindings {
    bindings: Vec<CompiledBinding>,
}

impl RoleBindings {
    /// Compile configured bindings
    ///
    /// Roles bound to the same pattern are merged into one permission set.
    pub fn compile(config: &RoleBindingsConfig) -> Result<Self> {
        let bindings = config
            .iter()
            .map(|(pattern, roles)| {
                let (namespace, name) = pattern.split_once('/').unwrap_or((pattern.as_str(), "*"));
                let mut permissions = PermissionSet::new();
                for role in roles {
                    permissions.extend(&role.permissions());
                }
                Ok(CompiledBinding {
                    pattern: pattern.clone(),
                    namespace: compile_segment(namespace, pattern)?,
                    name: compile_segment(name, pattern)?,
                    permissions,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { bindings })
    }

    /// Union of permissions granted on `namespace/name`
    pub fn permissions_for(&self, namespace: &str, name: &str) -> PermissionSet {
        let mut granted = PermissionSet::new();
        for binding in &self.bindings {
            if binding.namespace.is_match(namespace) && binding.name.is_match(name) {
                tracing::trace!(
                    pattern = %binding.pattern,
                    namespace,
                    name,
                    "Role binding matched"
                );
                granted.extend(&binding.permissions);
            }
        }
        granted
    }

    /// Union of permissions granted on any resource inside `namespace`
    pub fn namespace_permissions(&self, namespace: &str) -> PermissionSet {
        let mut granted = PermissionSet::new();
        for binding in &self.bindings {
            if binding.namespace.is_match(namespace) {
                granted.extend(&binding.permissions);
            }
        }
        granted
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Compile one pattern segment to an anchored regex
fn compile_segment(segment: &str, pattern: &str) -> Result<Regex> {
    if segment.contains('/') {
        return Err(Error::InvalidConfig(format!(
            "role binding pattern {pattern:?} has more than two segments"
        )));
    }

    let mut regex_str = String::from("^");
    for (i, literal) in segment.split('*').enumerate() {
        if i > 0 {
            regex_str.push_str("[^/]*");
        }
        regex_str.push_str(&regex::escape(literal));
    }
    regex_str.push('$');

    Regex::new(&regex_str).map_err(|e| {
        Error::InvalidConfig(format!("invalid role binding pattern {pattern:?}: {e}"))
    })
}
