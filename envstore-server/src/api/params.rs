//! List query parameters
//!
//! `sort_by` may repeat (`?sort_by=namespace&sort_by=name`), so parameters are
//! read as ordered pairs rather than into a flat struct.

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;

use crate::error::Error;
use crate::store::Id;

/// Raw list endpoint parameters
///
/// Values stay unparsed here; paging and sorting resolve them against the
/// endpoint's limits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    pub page: Option<String>,
    pub size: Option<String>,
    pub sort_by: Vec<String>,
    pub order: Option<String>,
    pub search: Option<String>,
    pub build: Option<String>,
}

impl ListParams {
    /// Collect known parameters from query pairs; unknown keys are ignored
    ///
    /// For single-valued keys the last occurrence wins.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "page" => params.page = Some(value),
                "size" => params.size = Some(value),
                "sort_by" => params.sort_by.push(value),
                "order" => params.order = Some(value),
                "search" => params.search = Some(value),
                "build" => params.build = Some(value),
                _ => {}
            }
        }
        params
    }

    /// Non-empty `search` term
    pub fn search(&self) -> Option<String> {
        self.search.clone().filter(|term| !term.is_empty())
    }

    /// `build` filter as an id
    pub fn build_id(&self) -> crate::error::Result<Option<Id>> {
        self.build
            .as_deref()
            .map(|raw| {
                raw.trim().parse::<Id>().map_err(|_| {
                    Error::BadRequest(format!("build must be an integer, got {raw:?}"))
                })
            })
            .transpose()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for ListParams {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::from_request_parts(parts, state)
            .await
            .map_err(|e| Error::BadRequest(e.body_text()))?;
        Ok(Self::from_pairs(pairs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_repeated_sort_by_kept_in_order() {
        let params = ListParams::from_pairs(pairs(&[
            ("sort_by", "namespace"),
            ("page", "2"),
            ("sort_by", "name"),
            ("unknown", "x"),
        ]));
        assert_eq!(params.sort_by, vec!["namespace", "name"]);
        assert_eq!(params.page.as_deref(), Some("2"));
    }

    #[test]
    fn test_empty_search_ignored() {
        let params = ListParams::from_pairs(pairs(&[("search", "")]));
        assert_eq!(params.search(), None);
    }

    #[test]
    fn test_build_id() {
        let params = ListParams::from_pairs(pairs(&[("build", "7")]));
        assert_eq!(params.build_id().unwrap(), Some(7));
        let params = ListParams::from_pairs(pairs(&[("build", "seven")]));
        assert!(params.build_id().is_err());
    }
}
