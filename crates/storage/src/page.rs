//! Pagination types shared by all paged queries.

use serde::{Deserialize, Serialize};

const DEFAULT_PAGE_NO: u32 = 1;
const DEFAULT_PAGE_SIZE: u32 = 4;

/// A 1-based page request. Zero or missing values fall back to the
/// defaults (page 1, 4 rows per page) instead of erroring.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageRequest {
    pub page_no: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// Builds a request, normalizing out-of-range values to defaults.
    pub fn new(page_no: Option<u32>, page_size: Option<u32>) -> Self {
        Self {
            page_no: page_no.filter(|&n| n >= 1).unwrap_or(DEFAULT_PAGE_NO),
            page_size: page_size.filter(|&s| s >= 1).unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }

    /// Row offset for a LIMIT/OFFSET query.
    ///
    /// Computed in i64 with saturation: a page number near `u32::MAX`
    /// must produce an offset past the last row (an empty page), not an
    /// overflow panic.
    pub fn offset(&self) -> i64 {
        i64::from(self.page_no - 1).saturating_mul(i64::from(self.page_size))
    }

    /// Row limit for a LIMIT/OFFSET query.
    pub fn limit(&self) -> u32 {
        self.page_size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results with total counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub total: u64,
    pub pages: u64,
    pub page_no: u32,
    pub page_size: u32,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    /// Assembles a page; the page count is ceil(total / page_size).
    pub fn new(total: u64, request: PageRequest, items: Vec<T>) -> Self {
        let size = u64::from(request.page_size);
        let pages = if total == 0 { 0 } else { total.div_ceil(size) };
        Self {
            total,
            pages,
            page_no: request.page_no,
            page_size: request.page_size,
            items,
        }
    }

    /// An empty page for the given request.
    pub fn empty(request: PageRequest) -> Self {
        Self::new(0, request, Vec::new())
    }

    /// Maps the items, keeping the counts.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            total: self.total,
            pages: self.pages,
            page_no: self.page_no,
            page_size: self.page_size,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_applied_for_missing_or_invalid_values() {
        let req = PageRequest::new(None, None);
        assert_eq!((req.page_no, req.page_size), (1, 4));

        let req = PageRequest::new(Some(0), Some(0));
        assert_eq!((req.page_no, req.page_size), (1, 4));
    }

    #[test]
    fn offset_is_zero_based() {
        let req = PageRequest::new(Some(3), Some(10));
        assert_eq!(req.offset(), 20);
        assert_eq!(req.limit(), 10);
    }

    #[test]
    fn offset_survives_huge_page_numbers() {
        let req = PageRequest::new(Some(u32::MAX), Some(4));
        assert_eq!(req.offset(), i64::from(u32::MAX - 1) * 4);

        // Both knobs maxed overflows even i64; the offset saturates
        // instead of wrapping, which still lands past every row.
        let req = PageRequest::new(Some(u32::MAX), Some(u32::MAX));
        assert_eq!(req.offset(), i64::MAX);
    }

    #[test]
    fn page_count_rounds_up() {
        let req = PageRequest::new(Some(1), Some(4));
        let page: Page<i32> = Page::new(9, req, vec![]);
        assert_eq!(page.pages, 3);

        let empty: Page<i32> = Page::new(0, req, vec![]);
        assert_eq!(empty.pages, 0);
    }

    #[test]
    fn map_preserves_counts() {
        let req = PageRequest::default();
        let page = Page::new(2, req, vec![1, 2]);
        let mapped = page.map(|n| n.to_string());
        assert_eq!(mapped.total, 2);
        assert_eq!(mapped.items, vec!["1", "2"]);
    }
}
