//! Channel and package endpoints
//!
//! Channels and packages are public catalog data and are not permission
//! filtered.

use std::cmp::Ordering;

use axum::extract::State;

use super::envelope::Paginated;
use super::params::ListParams;
use super::projection::{ChannelView, PackageView};
use super::sorting::{SortField, SortSpec};
use crate::error::Result;
use crate::state::AppState;
use crate::store::{CondaChannel, CondaPackage, OrderDirection, PackageFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelSort {
    Name,
}

impl SortField<CondaChannel> for ChannelSort {
    fn compare(self, a: &CondaChannel, b: &CondaChannel) -> Ordering {
        match self {
            Self::Name => a.name.cmp(&b.name),
        }
    }
}

pub const CHANNEL_SORT: SortSpec<ChannelSort> = SortSpec {
    allowed: &[("name", ChannelSort::Name)],
    default_sort_by: &["name"],
    default_order: OrderDirection::Ascending,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageSort {
    Channel,
    Name,
}

impl SortField<CondaPackage> for PackageSort {
    fn compare(self, a: &CondaPackage, b: &CondaPackage) -> Ordering {
        match self {
            Self::Channel => a.channel.cmp(&b.channel),
            Self::Name => a.name.cmp(&b.name),
        }
    }
}

pub const PACKAGE_SORT: SortSpec<PackageSort> = SortSpec {
    allowed: &[("channel", PackageSort::Channel), ("name", PackageSort::Name)],
    default_sort_by: &["channel", "name"],
    default_order: OrderDirection::Ascending,
};

/// `GET /api/v1/channel/`
pub async fn list_channels(
    State(state): State<AppState>,
    params: ListParams,
) -> Result<Paginated<ChannelView>> {
    let query = state.store().list_channels();
    state.responder().respond(&query, &params, &CHANNEL_SORT)
}

/// `GET /api/v1/package/`
pub async fn list_packages(
    State(state): State<AppState>,
    params: ListParams,
) -> Result<Paginated<PackageView>> {
    let filter = PackageFilter {
        search: params.search(),
        build: params.build_id()?,
    };
    let query = state.store().list_packages(&filter);
    state.responder().respond(&query, &params, &PACKAGE_SORT)
}
