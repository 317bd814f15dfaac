//! Namespace endpoints

use std::cmp::Ordering;

use axum::extract::State;

use super::envelope::Paginated;
use super::params::ListParams;
use super::projection::NamespaceView;
use super::sorting::{SortField, SortSpec};
use crate::auth::{Authorizer, RoleBindingAuthorizer};
use crate::error::Result;
use crate::state::AppState;
use crate::store::{Namespace, OrderDirection};

/// Sortable namespace fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceSort {
    Name,
}

impl SortField<Namespace> for NamespaceSort {
    fn compare(self, a: &Namespace, b: &Namespace) -> Ordering {
        match self {
            Self::Name => a.name.cmp(&b.name),
        }
    }
}

pub const NAMESPACE_SORT: SortSpec<NamespaceSort> = SortSpec {
    allowed: &[("name", NamespaceSort::Name)],
    default_sort_by: &["name"],
    default_order: OrderDirection::Ascending,
};

/// `GET /api/v1/namespace/`
pub async fn list_namespaces(
    State(state): State<AppState>,
    authz: RoleBindingAuthorizer,
    params: ListParams,
) -> Result<Paginated<NamespaceView>> {
    let query = authz.filter_namespaces(&state.store().list_namespaces());
    state.responder().respond(&query, &params, &NAMESPACE_SORT)
}
