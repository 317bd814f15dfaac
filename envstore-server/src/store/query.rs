//! Composable collection queries
//!
//! A [`CollectionQuery`] describes a read over a homogeneous set of records:
//! a source, a chain of filters, an ordering, and an optional window
//! (limit/offset). Refinement methods take `&self` and return a new query, so
//! a handle can be shared and refined in several directions without one
//! refinement leaking into another.
//!
//! # Example
//!
//! ```rust
//! use envstore_server::store::{CollectionQuery, OrderDirection};
//!
//! let base = CollectionQuery::from_fn(|| vec![5, 3, 9, 1, 7]);
//! let odd_desc = base
//!     .filter(|n| n % 2 == 1)
//!     .order_by(|a: &i32, b: &i32| a.cmp(b), OrderDirection::Descending);
//!
//! assert_eq!(odd_desc.limit(2).all(), vec![9, 7]);
//! assert_eq!(odd_desc.count(), 5);
//! // The base handle is untouched
//! assert_eq!(base.all(), vec![5, 3, 9, 1, 7]);
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Direction for ordering results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Sort in ascending order (A-Z, 0-9)
    #[default]
    Ascending,
    /// Sort in descending order (Z-A, 9-0)
    Descending,
}

impl OrderDirection {
    /// Parse the wire token; only exactly `asc` and `desc` are recognized
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "asc" => Some(Self::Ascending),
            "desc" => Some(Self::Descending),
            _ => None,
        }
    }

    /// Apply this direction to an ascending comparison result
    #[must_use]
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

/// Produces the unrefined records of a collection
///
/// Each call is an independent read, so two calls may observe different
/// snapshots if the backing store changes in between.
pub trait RecordSource<R>: Send + Sync {
    /// Read every record of the collection in natural store order
    fn scan(&self) -> Vec<R>;
}

impl<R, F> RecordSource<R> for F
where
    F: Fn() -> Vec<R> + Send + Sync,
{
    fn scan(&self) -> Vec<R> {
        self()
    }
}

type Predicate<R> = Arc<dyn Fn(&R) -> bool + Send + Sync>;
type Comparator<R> = Arc<dyn Fn(&R, &R) -> Ordering + Send + Sync>;

/// Immutable, composable query over a collection of `R`
pub struct CollectionQuery<R> {
    source: Arc<dyn RecordSource<R>>,
    filters: Vec<Predicate<R>>,
    ordering: Vec<Comparator<R>>,
    limit: Option<u64>,
    offset: u64,
}

impl<R> Clone for CollectionQuery<R> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            filters: self.filters.clone(),
            ordering: self.ordering.clone(),
            limit: self.limit,
            offset: self.offset,
        }
    }
}

impl<R> fmt::Debug for CollectionQuery<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionQuery")
            .field("filters", &self.filters.len())
            .field("ordering", &self.ordering.len())
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .finish()
    }
}

impl<R: 'static> CollectionQuery<R> {
    /// Query every record the source produces
    pub fn new(source: impl RecordSource<R> + 'static) -> Self {
        Self {
            source: Arc::new(source),
            filters: Vec::new(),
            ordering: Vec::new(),
            limit: None,
            offset: 0,
        }
    }

    /// Query backed by a closure
    pub fn from_fn<F>(scan: F) -> Self
    where
        F: Fn() -> Vec<R> + Send + Sync + 'static,
    {
        Self::new(scan)
    }

    /// Keep only records matching `predicate`, in addition to existing filters
    #[must_use]
    pub fn filter<P>(&self, predicate: P) -> Self
    where
        P: Fn(&R) -> bool + Send + Sync + 'static,
    {
        let mut next = self.clone();
        next.filters.push(Arc::new(predicate));
        next
    }

    /// Append an ordering key; earlier keys take precedence
    #[must_use]
    pub fn order_by<C>(&self, compare: C, direction: OrderDirection) -> Self
    where
        C: Fn(&R, &R) -> Ordering + Send + Sync + 'static,
    {
        let mut next = self.clone();
        next.ordering
            .push(Arc::new(move |a: &R, b: &R| direction.apply(compare(a, b))));
        next
    }

    /// Return at most `limit` records
    #[must_use]
    pub fn limit(&self, limit: u64) -> Self {
        let mut next = self.clone();
        next.limit = Some(limit);
        next
    }

    /// Skip the first `offset` records of the ordered result
    #[must_use]
    pub fn offset(&self, offset: u64) -> Self {
        let mut next = self.clone();
        next.offset = offset;
        next
    }

    /// Execute the query
    ///
    /// Filters are applied first, then the ordering (stable, so ties keep
    /// natural store order), then offset and limit.
    pub fn all(&self) -> Vec<R> {
        let mut records = self.filtered();

        if !self.ordering.is_empty() {
            records.sort_by(|a, b| {
                self.ordering
                    .iter()
                    .map(|compare| compare(a, b))
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(Ordering::Equal)
            });
        }

        let skip = usize::try_from(self.offset).unwrap_or(usize::MAX);
        let take = self
            .limit
            .map_or(usize::MAX, |n| usize::try_from(n).unwrap_or(usize::MAX));

        records.into_iter().skip(skip).take(take).collect()
    }

    /// Number of records matching the filters
    ///
    /// Ordering, limit and offset do not affect the count. This is a separate
    /// read from [`all`](Self::all).
    pub fn count(&self) -> u64 {
        self.filtered().len() as u64
    }

    /// First record of the executed query, if any
    pub fn first(&self) -> Option<R> {
        self.limit(1).all().into_iter().next()
    }

    fn filtered(&self) -> Vec<R> {
        self.source
            .scan()
            .into_iter()
            .filter(|record| self.filters.iter().all(|keep| keep(record)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Row {
        group: &'static str,
        n: u32,
    }

    fn rows() -> CollectionQuery<Row> {
        CollectionQuery::from_fn(|| {
            vec![
                Row { group: "b", n: 2 },
                Row { group: "a", n: 3 },
                Row { group: "b", n: 1 },
                Row { group: "a", n: 1 },
            ]
        })
    }

    #[test]
    fn test_parse_direction() {
        assert_eq!(OrderDirection::parse("asc"), Some(OrderDirection::Ascending));
        assert_eq!(OrderDirection::parse("desc"), Some(OrderDirection::Descending));
        assert_eq!(OrderDirection::parse("DESC"), None);
        assert_eq!(OrderDirection::parse("sideways"), None);
    }

    #[test]
    fn test_natural_order_without_ordering() {
        let ns: Vec<u32> = rows().all().into_iter().map(|r| r.n).collect();
        assert_eq!(ns, vec![2, 3, 1, 1]);
    }

    #[test]
    fn test_multi_key_ordering() {
        let sorted = rows()
            .order_by(|a: &Row, b: &Row| a.group.cmp(b.group), OrderDirection::Ascending)
            .order_by(|a: &Row, b: &Row| a.n.cmp(&b.n), OrderDirection::Descending)
            .all();

        let keys: Vec<(&str, u32)> = sorted.iter().map(|r| (r.group, r.n)).collect();
        assert_eq!(keys, vec![("a", 3), ("a", 1), ("b", 2), ("b", 1)]);
    }

    #[test]
    fn test_window_applies_after_ordering() {
        let query = rows().order_by(|a: &Row, b: &Row| a.n.cmp(&b.n), OrderDirection::Ascending);
        let page: Vec<u32> = query.offset(1).limit(2).all().into_iter().map(|r| r.n).collect();
        assert_eq!(page, vec![1, 2]);
    }

    #[test]
    fn test_offset_past_end_is_empty() {
        assert!(rows().offset(10).all().is_empty());
    }

    #[test]
    fn test_refinement_does_not_mutate_original() {
        let base = rows();
        let _narrow = base.filter(|r| r.group == "a").limit(1);
        assert_eq!(base.all().len(), 4);
        assert_eq!(base.count(), 4);
    }

    #[test]
    fn test_count_ignores_window_and_ordering() {
        let query = rows()
            .filter(|r| r.group == "b")
            .order_by(|a: &Row, b: &Row| a.n.cmp(&b.n), OrderDirection::Descending)
            .offset(1)
            .limit(1);
        assert_eq!(query.all().len(), 1);
        assert_eq!(query.count(), 2);
    }

    #[test]
    fn test_each_execution_rescans_source() {
        let scans = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&scans);
        let query = CollectionQuery::from_fn(move || {
            counter.fetch_add(1, AtomicOrdering::SeqCst);
            vec![1, 2, 3]
        });

        query.all();
        query.count();
        assert_eq!(scans.load(AtomicOrdering::SeqCst), 2);
    }

    #[test]
    fn test_first() {
        assert_eq!(rows().first().map(|r| r.n), Some(2));
        assert_eq!(rows().filter(|_| false).first(), None);
    }
}
