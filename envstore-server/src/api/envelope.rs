//! Response envelopes
//!
//! Every successful response is wrapped with a `status` field. List endpoints
//! add paging metadata:
//!
//! ```json
//! { "status": "ok", "data": [...], "page": 2, "size": 10, "count": 25 }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Envelope status marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Request succeeded
    Ok,
    /// Request failed, see `error` or `message`
    Error,
}

/// Paginated list response
///
/// `count` is the number of records matching the (permission-filtered) query
/// across all pages, not the length of `data`.
///
/// # Example
///
/// ```rust
/// use envstore_server::api::envelope::Paginated;
///
/// let page = Paginated::new(vec!["a", "b"], 1, 2, 7);
/// assert_eq!(page.total_pages(), 4);
/// assert!(page.has_next());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Paginated<T> {
    /// Always `ok`
    pub status: Status,
    /// Projected records of the current page
    pub data: Vec<T>,
    /// Current page number (1-indexed)
    pub page: u64,
    /// Effective page size
    pub size: u64,
    /// Total number of matching records
    pub count: u64,
}

impl<T> Paginated<T> {
    /// Create a new paginated envelope
    pub fn new(data: Vec<T>, page: u64, size: u64, count: u64) -> Self {
        Self {
            status: Status::Ok,
            data,
            page,
            size,
            count,
        }
    }

    /// Number of pages needed to show `count` records, rounding up
    #[must_use]
    pub fn total_pages(&self) -> u64 {
        if self.size == 0 {
            return 0;
        }
        self.count.div_ceil(self.size)
    }

    /// Whether a page after this one holds records
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }
}

impl<T: Serialize> IntoResponse for Paginated<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Single record response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item<T> {
    /// Always `ok`
    pub status: Status,
    /// The projected record
    pub data: T,
}

impl<T> Item<T> {
    /// Wrap a single projected record
    pub fn new(data: T) -> Self {
        Self {
            status: Status::Ok,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for Item<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Acknowledgement for mutations, optionally with a message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ack {
    /// Always `ok`
    pub status: Status,
    /// Optional human-readable note
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Ack {
    /// Plain `{"status": "ok"}`
    pub fn ok() -> Self {
        Self {
            status: Status::Ok,
            message: None,
        }
    }

    /// `{"status": "ok", "message": ...}`
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            status: Status::Ok,
            message: Some(message.into()),
        }
    }
}

impl IntoResponse for Ack {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_paginated_shape() {
        let page = Paginated::new(vec![1, 2, 3], 2, 3, 8);
        assert_eq!(
            serde_json::to_value(&page).unwrap(),
            json!({"status": "ok", "data": [1, 2, 3], "page": 2, "size": 3, "count": 8})
        );
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(Paginated::<u8>::new(vec![], 1, 10, 0).total_pages(), 0);
        assert_eq!(Paginated::<u8>::new(vec![], 1, 10, 10).total_pages(), 1);
        assert_eq!(Paginated::<u8>::new(vec![], 1, 10, 25).total_pages(), 3);
    }

    #[test]
    fn test_has_next() {
        assert!(Paginated::<u8>::new(vec![], 2, 10, 25).has_next());
        assert!(!Paginated::<u8>::new(vec![], 3, 10, 25).has_next());
    }

    #[test]
    fn test_item_shape() {
        assert_eq!(
            serde_json::to_value(Item::new("x")).unwrap(),
            json!({"status": "ok", "data": "x"})
        );
    }

    #[test]
    fn test_ack_shape() {
        assert_eq!(serde_json::to_value(Ack::ok()).unwrap(), json!({"status": "ok"}));
        assert_eq!(
            serde_json::to_value(Ack::with_message("rebuild triggered")).unwrap(),
            json!({"status": "ok", "message": "rebuild triggered"})
        );
    }
}
