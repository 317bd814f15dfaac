//! Environment endpoints

use std::cmp::Ordering;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use super::envelope::{Ack, Item, Paginated};
use super::params::ListParams;
use super::projection::{EnvironmentSummary, Projection};
use super::sorting::{SortField, SortSpec};
use crate::auth::{Authorizer, Permission, PermissionSet, RoleBindingAuthorizer};
use crate::error::{Error, Result};
use crate::state::AppState;
use crate::store::{Environment, EnvironmentFilter, Id, OrderDirection};

/// Sortable environment fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentSort {
    Namespace,
    Name,
}

impl SortField<Environment> for EnvironmentSort {
    fn compare(self, a: &Environment, b: &Environment) -> Ordering {
        match self {
            Self::Namespace => a.namespace.name.cmp(&b.namespace.name),
            Self::Name => a.name.cmp(&b.name),
        }
    }
}

pub const ENVIRONMENT_SORT: SortSpec<EnvironmentSort> = SortSpec {
    allowed: &[
        ("namespace", EnvironmentSort::Namespace),
        ("name", EnvironmentSort::Name),
    ],
    default_sort_by: &["namespace", "name"],
    default_order: OrderDirection::Ascending,
};

/// `GET /api/v1/environment/`
pub async fn list_environments(
    State(state): State<AppState>,
    authz: RoleBindingAuthorizer,
    params: ListParams,
) -> Result<Paginated<EnvironmentSummary>> {
    let filter = EnvironmentFilter {
        search: params.search(),
    };
    let query = authz.filter_environments(&state.store().list_environments(&filter));
    state.responder().respond(&query, &params, &ENVIRONMENT_SORT)
}

fn find_environment(state: &AppState, namespace: &str, name: &str) -> Result<Environment> {
    state
        .store()
        .get_environment(namespace, name)
        .ok_or_else(|| Error::NotFound("environment does not exist".to_string()))
}

/// `GET /api/v1/environment/{namespace}/{name}/`
pub async fn get_environment(
    State(state): State<AppState>,
    authz: RoleBindingAuthorizer,
    Path((namespace, name)): Path<(String, String)>,
) -> Result<Item<EnvironmentSummary>> {
    authz.authorize_request(
        &format!("{namespace}/{name}"),
        &PermissionSet::from([Permission::EnvironmentRead]),
        true,
    )?;

    let environment = find_environment(&state, &namespace, &name)?;

    Ok(Item::new(EnvironmentSummary::from_record(environment)))
}

#[derive(Debug, Deserialize)]
struct UpdateEnvironmentBuild {
    #[serde(rename = "buildId")]
    build_id: Id,
}

/// `PUT /api/v1/environment/{namespace}/{name}/`
///
/// Body: `{"buildId": <int>}`
pub async fn update_environment_build(
    State(state): State<AppState>,
    authz: RoleBindingAuthorizer,
    Path((namespace, name)): Path<(String, String)>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Ack> {
    authz.authorize_request(
        &format!("{namespace}/{name}"),
        &PermissionSet::from([Permission::EnvironmentUpdate]),
        true,
    )?;
    find_environment(&state, &namespace, &name)?;

    let Json(body) = body.map_err(|_| Error::BadRequest("build id not specified".to_string()))?;
    if body.get("buildId").is_none() {
        return Err(Error::BadRequest("build id not specified".to_string()));
    }
    let request: UpdateEnvironmentBuild = serde_json::from_value(body)
        .map_err(|_| Error::BadRequest("build id must be an integer".to_string()))?;

    state
        .store()
        .update_environment_build(&namespace, &name, request.build_id)?;
    Ok(Ack::ok())
}

/// `DELETE /api/v1/environment/{namespace}/{name}/`
pub async fn delete_environment(
    State(state): State<AppState>,
    authz: RoleBindingAuthorizer,
    Path((namespace, name)): Path<(String, String)>,
) -> Result<Ack> {
    authz.authorize_request(
        &format!("{namespace}/{name}"),
        &PermissionSet::from([Permission::EnvironmentDelete]),
        true,
    )?;
    find_environment(&state, &namespace, &name)?;

    state.store().delete_environment(&namespace, &name)?;
    Ok(Ack::ok())
}
