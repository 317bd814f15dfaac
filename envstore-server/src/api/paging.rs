//! Page parameter resolution

use crate::error::{Error, Result};

/// Resolved page window
///
/// # Example
///
/// ```rust
/// use envstore_server::api::PageRequest;
///
/// let page = PageRequest::resolve(Some("3"), Some("20"), 100).unwrap();
/// assert_eq!(page.offset(), 40);
///
/// // Size defaults to the maximum and never exceeds it
/// let page = PageRequest::resolve(None, Some("500"), 100).unwrap();
/// assert_eq!((page.page, page.size), (1, 100));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Page number (1-indexed)
    pub page: u64,
    /// Records per page, within `[1, max_page_size]`
    pub size: u64,
}

impl PageRequest {
    /// Resolve raw `page` and `size` parameters against `max_page_size`
    ///
    /// Missing `page` is 1, missing `size` is `max_page_size`. Page 0 is
    /// treated as page 1 and size is clamped into `[1, max_page_size]`.
    /// Anything that is not a non-negative integer is a bad request, as is a
    /// page whose offset does not fit in a `u64`.
    pub fn resolve(page: Option<&str>, size: Option<&str>, max_page_size: u64) -> Result<Self> {
        let page = parse_param("page", page)?.unwrap_or(1).max(1);
        let size = parse_param("size", size)?
            .unwrap_or(max_page_size)
            .clamp(1, max_page_size.max(1));

        if (page - 1).checked_mul(size).is_none() {
            return Err(Error::BadRequest(format!(
                "page {page} is out of range for size {size}"
            )));
        }
        Ok(Self { page, size })
    }

    /// Number of records before this page
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.size)
    }
}

fn parse_param(name: &str, raw: Option<&str>) -> Result<Option<u64>> {
    raw.map(|value| {
        value.trim().parse::<u64>().map_err(|_| {
            Error::BadRequest(format!("{name} must be a non-negative integer, got {value:?}"))
        })
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let page = PageRequest::resolve(None, None, 100).unwrap();
        assert_eq!(page, PageRequest { page: 1, size: 100 });
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_offset() {
        let page = PageRequest::resolve(Some("2"), Some("10"), 100).unwrap();
        assert_eq!(page.offset(), 10);
    }

    #[test]
    fn test_size_clamped_to_max() {
        let page = PageRequest::resolve(None, Some("500"), 100).unwrap();
        assert_eq!(page.size, 100);
    }

    #[test]
    fn test_zero_values_clamped_up() {
        let page = PageRequest::resolve(Some("0"), Some("0"), 100).unwrap();
        assert_eq!(page, PageRequest { page: 1, size: 1 });
    }

    #[test]
    fn test_non_numeric_rejected() {
        for (page, size) in [(Some("two"), None), (None, Some("1.5")), (Some("-1"), None)] {
            assert!(matches!(
                PageRequest::resolve(page, size, 100),
                Err(Error::BadRequest(_))
            ));
        }
    }

    #[test]
    fn test_overflowing_offset_rejected() {
        let max = u64::MAX.to_string();
        assert!(matches!(
            PageRequest::resolve(Some(&max), Some("10"), 100),
            Err(Error::BadRequest(_))
        ));
    }

    #[test]
    fn test_page_recoverable_from_offset() {
        let max = u64::MAX.to_string();
        for (page, size) in [("1", "1"), ("7", "10"), (max.as_str(), "1")] {
            let resolved = PageRequest::resolve(Some(page), Some(size), 100).unwrap();
            assert_eq!(resolved.offset() / resolved.size + 1, resolved.page);
        }
    }
}
