//! Build endpoints
//!
//! Single-build routes look the build up before authorizing, against the
//! path of the environment that owns it.

use std::cmp::Ordering;

use axum::{
    extract::{Path, State},
    http::{header::LOCATION, StatusCode},
    response::{IntoResponse, Response},
};

use super::envelope::{Ack, Item, Paginated};
use super::params::ListParams;
use super::projection::{BuildDetail, BuildSummary, Projection};
use super::sorting::{SortField, SortSpec};
use crate::auth::{Authorizer, Permission, PermissionSet, RoleBindingAuthorizer};
use crate::error::{Error, Result};
use crate::state::AppState;
use crate::store::{Build, Id, OrderDirection};

/// Sortable build fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildSort {
    Id,
}

impl SortField<Build> for BuildSort {
    fn compare(self, a: &Build, b: &Build) -> Ordering {
        match self {
            Self::Id => a.id.cmp(&b.id),
        }
    }
}

pub const BUILD_SORT: SortSpec<BuildSort> = SortSpec {
    allowed: &[("id", BuildSort::Id)],
    default_sort_by: &["id"],
    default_order: OrderDirection::Ascending,
};

/// Look up a build by its raw path id
///
/// Ids that are not integers cannot name a build, so they miss the same way.
fn find_build(state: &AppState, raw_id: &str) -> Result<Build> {
    raw_id
        .parse::<Id>()
        .ok()
        .and_then(|id| state.store().get_build(id))
        .ok_or_else(|| Error::NotFound("build id does not exist".to_string()))
}

fn authorize_build(
    authz: &RoleBindingAuthorizer,
    build: &Build,
    permission: Permission,
) -> Result<()> {
    authz.authorize_request(
        &build.resource_path(),
        &PermissionSet::from([permission]),
        true,
    )?;
    Ok(())
}

/// `GET /api/v1/build/`
pub async fn list_builds(
    State(state): State<AppState>,
    authz: RoleBindingAuthorizer,
    params: ListParams,
) -> Result<Paginated<BuildSummary>> {
    let query = authz.filter_builds(&state.store().list_builds());
    state.responder().respond(&query, &params, &BUILD_SORT)
}

/// `GET /api/v1/build/{build_id}/`
pub async fn get_build(
    State(state): State<AppState>,
    authz: RoleBindingAuthorizer,
    Path(build_id): Path<String>,
) -> Result<Item<BuildDetail>> {
    let build = find_build(&state, &build_id)?;
    authorize_build(&authz, &build, Permission::EnvironmentRead)?;
    Ok(Item::new(BuildDetail::from_record(build)))
}

/// `PUT /api/v1/build/{build_id}/`, queue a rebuild of the same specification
pub async fn rebuild(
    State(state): State<AppState>,
    authz: RoleBindingAuthorizer,
    Path(build_id): Path<String>,
) -> Result<Ack> {
    let build = find_build(&state, &build_id)?;
    authorize_build(&authz, &build, Permission::EnvironmentUpdate)?;

    let queued = state
        .store()
        .create_build(build.environment_id, &build.specification.content_key)?;
    tracing::info!(source_build = build.id, build_id = queued.id, "Rebuild triggered");
    Ok(Ack::with_message("rebuild triggered"))
}

/// `DELETE /api/v1/build/{build_id}/`
pub async fn delete_build(
    State(state): State<AppState>,
    authz: RoleBindingAuthorizer,
    Path(build_id): Path<String>,
) -> Result<Ack> {
    let build = find_build(&state, &build_id)?;
    authorize_build(&authz, &build, Permission::BuildDelete)?;

    state.store().delete_build(build.id)?;
    Ok(Ack::ok())
}

/// `GET /api/v1/build/{build_id}/logs/`, redirect to the stored log
pub async fn get_build_logs(
    State(state): State<AppState>,
    authz: RoleBindingAuthorizer,
    Path(build_id): Path<String>,
) -> Result<Response> {
    let build = find_build(&state, &build_id)?;
    authorize_build(&authz, &build, Permission::EnvironmentRead)?;

    let url = state.storage().get_url(&build.log_key());
    Ok((StatusCode::FOUND, [(LOCATION, url)]).into_response())
}
