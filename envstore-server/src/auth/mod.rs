//! Caller identification and authorization
//!
//! Requests are authenticated by an optional bearer token. Each known token
//! resolves to a principal with its own role bindings; requests without a
//! token get the configured unauthenticated bindings. Handlers receive a
//! [`RoleBindingAuthorizer`] through its extractor and use the [`Authorizer`]
//! trait to filter list queries and authorize single-resource operations.

mod authorizer;
mod bindings;
mod extract;
mod permissions;

pub use authorizer::{Authorizer, Protected, RoleBindingAuthorizer, Scope};
pub use bindings::RoleBindings;
pub use extract::extract_bearer;
pub use permissions::{Permission, PermissionSet, Role};

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::AuthConfig;
use crate::error::{Error, Result};

#[derive(Debug)]
struct Principal {
    name: String,
    bindings: Arc<RoleBindings>,
}

/// Resolves bearer tokens to authorizers
#[derive(Debug)]
pub struct Authenticator {
    anonymous: Arc<RoleBindings>,
    tokens: HashMap<String, Principal>,
}

impl Authenticator {
    /// Compile every configured binding up front
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let anonymous = Arc::new(RoleBindings::compile(&config.unauthenticated_role_bindings)?);
        if anonymous.is_empty() {
            tracing::info!("No unauthenticated role bindings, anonymous callers see nothing");
        }

        let tokens = config
            .tokens
            .iter()
            .map(|(token, entry)| {
                let bindings = Arc::new(RoleBindings::compile(&entry.role_bindings)?);
                Ok((
                    token.clone(),
                    Principal {
                        name: entry.principal.clone(),
                        bindings,
                    },
                ))
            })
            .collect::<Result<HashMap<_, _>>>()?;

        Ok(Self { anonymous, tokens })
    }

    /// Authorizer for the caller presenting `token`
    ///
    /// No token means an anonymous caller; an unknown token is rejected.
    pub fn authenticate(&self, token: Option<&str>) -> Result<RoleBindingAuthorizer> {
        match token {
            None => Ok(RoleBindingAuthorizer::anonymous(Arc::clone(&self.anonymous))),
            Some(token) => {
                let principal = self
                    .tokens
                    .get(token)
                    .ok_or_else(|| Error::Unauthorized("invalid token".to_string()))?;
                tracing::debug!(principal = %principal.name, "Authenticated request");
                Ok(RoleBindingAuthorizer::principal(
                    principal.name.clone(),
                    Arc::clone(&principal.bindings),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenConfig;
    use std::collections::{BTreeMap, BTreeSet};

    fn config() -> AuthConfig {
        AuthConfig {
            tokens: BTreeMap::from([(
                "s3cret".to_string(),
                TokenConfig {
                    principal: "alice".to_string(),
                    role_bindings: BTreeMap::from([(
                        "alice/*".to_string(),
                        BTreeSet::from([Role::Admin]),
                    )]),
                },
            )]),
            ..AuthConfig::default()
        }
    }

    #[test]
    fn test_no_token_is_anonymous() {
        let authn = Authenticator::from_config(&config()).unwrap();
        let authz = authn.authenticate(None).unwrap();
        assert!(authz.is_anonymous());
        assert!(authz
            .permissions(Scope::parse("default/web"))
            .contains(Permission::EnvironmentRead));
    }

    #[test]
    fn test_known_token_resolves_principal() {
        let authn = Authenticator::from_config(&config()).unwrap();
        let authz = authn.authenticate(Some("s3cret")).unwrap();
        assert_eq!(authz.principal_name(), Some("alice"));
        assert!(authz
            .permissions(Scope::parse("alice/web"))
            .contains(Permission::BuildDelete));
        // Token bindings replace the anonymous ones
        assert!(authz.permissions(Scope::parse("default/web")).is_empty());
    }

    #[test]
    fn test_unknown_token_rejected() {
        let authn = Authenticator::from_config(&config()).unwrap();
        assert!(matches!(
            authn.authenticate(Some("nope")),
            Err(Error::Unauthorized(_))
        ));
    }
}
