//! Sort directive resolution
//!
//! Each list endpoint declares a static [`SortSpec`]: the tokens callers may
//! sort by, each mapped to a typed [`SortField`], plus defaults. Unknown tokens
//! are dropped rather than rejected.

use std::cmp::Ordering;

use crate::store::{CollectionQuery, OrderDirection};

/// A sortable field of records of type `R`
pub trait SortField<R>: Copy + Send + Sync + 'static {
    /// Ascending comparison of `a` and `b` on this field
    fn compare(self, a: &R, b: &R) -> Ordering;
}

/// Per-endpoint sorting whitelist and defaults
#[derive(Debug, Clone, Copy)]
pub struct SortSpec<F: 'static> {
    /// Accepted `sort_by` tokens
    pub allowed: &'static [(&'static str, F)],
    /// Tokens used when the request names no usable field
    pub default_sort_by: &'static [&'static str],
    /// Direction used when `order` is absent or not `asc`/`desc`
    pub default_order: OrderDirection,
}

/// Ordered fields and a single direction applied to all of them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortDirective<F> {
    pub fields: Vec<F>,
    pub direction: OrderDirection,
}

impl<F: Copy + 'static> SortSpec<F> {
    fn lookup(&self, token: &str) -> Option<F> {
        self.allowed
            .iter()
            .find(|(name, _)| *name == token)
            .map(|&(_, field)| field)
    }

    /// Resolve requested `sort_by` tokens and `order` against this spec
    ///
    /// Requested tokens keep their order with unknown ones removed. When none
    /// survive, the default list is used the same way; an empty result means
    /// natural store order.
    pub fn resolve(&self, requested: &[String], order: Option<&str>) -> SortDirective<F> {
        let mut fields: Vec<F> = requested
            .iter()
            .filter_map(|token| self.lookup(token))
            .collect();

        if fields.is_empty() {
            if !requested.is_empty() {
                tracing::debug!(?requested, "No sortable fields requested, using defaults");
            }
            fields = self
                .default_sort_by
                .iter()
                .filter_map(|token| self.lookup(token))
                .collect();
        }

        let direction = order
            .and_then(OrderDirection::parse)
            .unwrap_or(self.default_order);

        SortDirective { fields, direction }
    }
}

impl<F> SortDirective<F> {
    /// Refine `query` with this ordering
    pub fn apply<R: 'static>(&self, query: &CollectionQuery<R>) -> CollectionQuery<R>
    where
        F: SortField<R>,
    {
        self.fields
            .iter()
            .fold(query.clone(), |ordered, &field| {
                ordered.order_by(move |a: &R, b: &R| field.compare(a, b), self.direction)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum PairSort {
        Left,
        Right,
    }

    impl SortField<(u8, u8)> for PairSort {
        fn compare(self, a: &(u8, u8), b: &(u8, u8)) -> Ordering {
            match self {
                Self::Left => a.0.cmp(&b.0),
                Self::Right => a.1.cmp(&b.1),
            }
        }
    }

    const SPEC: SortSpec<PairSort> = SortSpec {
        allowed: &[("left", PairSort::Left), ("right", PairSort::Right)],
        default_sort_by: &["left"],
        default_order: OrderDirection::Ascending,
    };

    fn tokens(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_requested_order_preserved() {
        let directive = SPEC.resolve(&tokens(&["right", "left"]), Some("desc"));
        assert_eq!(directive.fields, vec![PairSort::Right, PairSort::Left]);
        assert_eq!(directive.direction, OrderDirection::Descending);
    }

    #[test]
    fn test_unknown_tokens_dropped() {
        let directive = SPEC.resolve(&tokens(&["bogus", "right"]), None);
        assert_eq!(directive.fields, vec![PairSort::Right]);
    }

    #[test]
    fn test_all_unknown_falls_back_to_default() {
        let directive = SPEC.resolve(&tokens(&["bogus"]), None);
        assert_eq!(directive.fields, vec![PairSort::Left]);
    }

    #[test]
    fn test_invalid_order_uses_default() {
        let directive = SPEC.resolve(&[], Some("sideways"));
        assert_eq!(directive.direction, OrderDirection::Ascending);
        let directive = SPEC.resolve(&[], Some("DESC"));
        assert_eq!(directive.direction, OrderDirection::Ascending);
    }

    #[test]
    fn test_empty_default_is_natural_order() {
        let spec: SortSpec<PairSort> = SortSpec {
            allowed: &[("left", PairSort::Left)],
            default_sort_by: &[],
            default_order: OrderDirection::Ascending,
        };
        let directive = spec.resolve(&tokens(&["nope"]), None);
        assert!(directive.fields.is_empty());

        let query = CollectionQuery::from_fn(|| vec![(2u8, 0u8), (1, 0)]);
        assert_eq!(directive.apply(&query).all(), vec![(2, 0), (1, 0)]);
    }

    #[test]
    fn test_apply_multi_key() {
        let query = CollectionQuery::from_fn(|| vec![(1u8, 1u8), (2, 0), (1, 0)]);
        let directive = SPEC.resolve(&tokens(&["left", "right"]), Some("asc"));
        assert_eq!(directive.apply(&query).all(), vec![(1, 0), (1, 1), (2, 0)]);
    }
}
