//! Paginated list responses
//!
//! Every list endpoint funnels through [`Responder::respond`]: resolve paging
//! and sorting, order then window the query, execute it, count the unwindowed
//! query separately, project each record and wrap the result in a
//! [`Paginated`] envelope.

use super::envelope::Paginated;
use super::paging::PageRequest;
use super::params::ListParams;
use super::projection::Projection;
use super::sorting::{SortField, SortSpec};
use crate::config::PaginationConfig;
use crate::error::{Error, Result};
use crate::store::CollectionQuery;

/// Builds paginated envelopes within the server's paging limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Responder {
    pagination: PaginationConfig,
}

impl Responder {
    /// Responder enforcing `pagination.max_page_size`
    pub fn new(pagination: PaginationConfig) -> Result<Self> {
        if pagination.max_page_size == 0 {
            return Err(Error::InvalidConfig(
                "pagination.max_page_size must be at least 1".to_string(),
            ));
        }
        Ok(Self { pagination })
    }

    pub fn max_page_size(&self) -> u64 {
        self.pagination.max_page_size
    }

    /// Run `query` for the requested page and wrap it in an envelope
    ///
    /// `query` should already be permission filtered: `count` is taken from
    /// it directly. The page fetch and the count are separate reads.
    pub fn respond<R, F, V>(
        &self,
        query: &CollectionQuery<R>,
        params: &ListParams,
        sort: &SortSpec<F>,
    ) -> Result<Paginated<V>>
    where
        R: 'static,
        F: SortField<R>,
        V: Projection<R>,
    {
        let page = PageRequest::resolve(
            params.page.as_deref(),
            params.size.as_deref(),
            self.pagination.max_page_size,
        )?;
        let directive = sort.resolve(&params.sort_by, params.order.as_deref());
        let offset = page.offset();

        let records = directive
            .apply(query)
            .limit(page.size)
            .offset(offset)
            .all();
        let count = query.count();

        let data = records.into_iter().map(V::from_record).collect();
        let envelope = Paginated::new(data, offset / page.size + 1, page.size, count);

        tracing::debug!(
            page = envelope.page,
            size = envelope.size,
            count = envelope.count,
            sort_fields = directive.fields.len(),
            direction = %directive.direction,
            total_pages = envelope.total_pages(),
            has_next = envelope.has_next(),
            "Resolved list page"
        );

        Ok(envelope)
    }
}
