//! Offset/size paging for collection resources.
//!
//! ```
//! use lintel_core::pagination::{PageRequest, PageWindow};
//!
//! let window = PageWindow::new(PageRequest::new(17, 9), 42);
//! assert!(window.has_prev() && window.has_next());
//! assert_eq!(window.last(), Some(PageRequest { offset: 35, size: 7 }));
//! assert_eq!(window.first(), Some(PageRequest { offset: 0, size: 8 }));
//! ```

use crate::HttpRequest;
use crate::link::LinkRelation;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u64 = 20;

pub const MAX_PAGE_SIZE: u64 = 100;

/// A requested slice of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub offset: u64,
    pub size: u64,
}

impl PageRequest {
    /// Size is at least one.
    pub fn new(offset: u64, size: u64) -> Self {
        Self {
            offset,
            size: size.max(1),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_SIZE)
    }
}

/// Bounds applied to client-supplied page sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingLimits {
    pub default_size: u64,
    pub max_size: u64,
}

impl Default for PagingLimits {
    fn default() -> Self {
        Self {
            default_size: DEFAULT_PAGE_SIZE,
            max_size: MAX_PAGE_SIZE,
        }
    }
}

/// Neighbouring pages of the current one, within a collection of `total` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub current: PageRequest,
    pub total: u64,
}

impl PageWindow {
    pub fn new(current: PageRequest, total: u64) -> Self {
        Self { current, total }
    }

    pub fn has_prev(&self) -> bool {
        self.current.offset > 0
    }

    pub fn prev(&self) -> Option<PageRequest> {
        let PageRequest { offset, size } = self.current;
        self.has_prev().then(|| PageRequest {
            offset: offset.saturating_sub(size),
            size: size.min(offset),
        })
    }

    fn end(&self) -> u64 {
        self.current.offset.saturating_add(self.current.size)
    }

    pub fn has_next(&self) -> bool {
        self.end() < self.total
    }

    pub fn next(&self) -> Option<PageRequest> {
        let PageRequest { offset, size } = self.current;
        self.has_next().then_some(PageRequest {
            offset: self.end(),
            size,
        })
    }

    /// A first page exists when it would not overlap the previous one.
    pub fn has_first(&self) -> bool {
        self.current.offset > self.current.size
    }

    pub fn first(&self) -> Option<PageRequest> {
        let PageRequest { offset, size } = self.current;
        // has_first guarantees offset > size
        self.has_first().then(|| PageRequest {
            offset: 0,
            size: size.min(offset - size),
        })
    }

    /// A last page exists when it would not overlap the next one.
    pub fn has_last(&self) -> bool {
        self.end().saturating_add(self.current.size) < self.total
    }

    /// The trailing page, aligned to the current offset.
    pub fn last(&self) -> Option<PageRequest> {
        let PageRequest { offset, size } = self.current;
        self.has_last().then(|| {
            let remainder = (self.total - offset) % size;
            let last_size = if remainder == 0 { size } else { remainder };
            PageRequest {
                offset: self.total - last_size,
                size: last_size,
            }
        })
    }
}

/// How a collection endpoint reads paging parameters and links pages.
pub trait PagingStrategy: Send + Sync {
    fn page_request(&self, request: &HttpRequest) -> PageRequest;

    /// `self` always, then `prev`, `next`, `first`, `last` where they exist.
    fn links(&self, request: &HttpRequest, page: PageRequest, total: u64) -> Vec<LinkRelation>;
}

/// `?offset=N&size=M` paging, the default strategy.
#[derive(Debug, Clone)]
pub struct OffsetSizePaging {
    pub limits: PagingLimits,
    pub offset_param: String,
    pub size_param: String,
}

impl Default for OffsetSizePaging {
    fn default() -> Self {
        Self::new(PagingLimits::default())
    }
}

impl OffsetSizePaging {
    pub fn new(limits: PagingLimits) -> Self {
        Self {
            limits,
            offset_param: "offset".to_string(),
            size_param: "size".to_string(),
        }
    }

    /// URL of `page`, keeping the request's other query parameters in order.
    pub fn page_url(&self, request: &HttpRequest, page: PageRequest) -> String {
        let mut pairs: Vec<(String, String)> = request
            .query_pairs()
            .into_iter()
            .filter(|(key, _)| key != &self.offset_param && key != &self.size_param)
            .collect();
        pairs.push((self.offset_param.clone(), page.offset.to_string()));
        pairs.push((self.size_param.clone(), page.size.to_string()));

        let query = serde_urlencoded::to_string(&pairs).unwrap_or_default();
        format!("{}?{}", request.url(), query)
    }
}

fn parse_signed(value: Option<&String>) -> Option<i64> {
    value.and_then(|v| v.trim().parse::<i64>().ok())
}

impl PagingStrategy for OffsetSizePaging {
    fn page_request(&self, request: &HttpRequest) -> PageRequest {
        let offset = parse_signed(request.query_param(&self.offset_param))
            .map(|o| o.max(0) as u64)
            .unwrap_or(0);

        let mut size = parse_signed(request.query_param(&self.size_param))
            .map(|s| s.max(1) as u64)
            .unwrap_or(self.limits.default_size);
        if self.limits.max_size > 0 {
            size = size.min(self.limits.max_size);
        }

        PageRequest::new(offset, size)
    }

    fn links(&self, request: &HttpRequest, page: PageRequest, total: u64) -> Vec<LinkRelation> {
        let window = PageWindow::new(page, total);
        let mut links = vec![LinkRelation::new(self.page_url(request, page), "self")];

        for (rel, neighbour) in [
            ("prev", window.prev()),
            ("next", window.next()),
            ("first", window.first()),
            ("last", window.last()),
        ] {
            if let Some(neighbour) = neighbour {
                links.push(LinkRelation::new(self.page_url(request, neighbour), rel));
            }
        }
        links
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rels(links: &[LinkRelation]) -> Vec<&str> {
        links.iter().map(|l| l.rel.as_str()).collect()
    }

    #[test]
    fn test_window_middle_page() {
        let window = PageWindow::new(PageRequest::new(17, 9), 42);
        assert!(window.has_prev());
        assert!(window.has_next());
        assert_eq!(window.prev(), Some(PageRequest { offset: 8, size: 9 }));
        assert_eq!(window.next(), Some(PageRequest { offset: 26, size: 9 }));
        assert_eq!(window.last(), Some(PageRequest { offset: 35, size: 7 }));
        assert_eq!(window.first(), Some(PageRequest { offset: 0, size: 8 }));
    }

    #[test]
    fn test_window_partial_prev() {
        let window = PageWindow::new(PageRequest::new(4, 10), 100);
        assert_eq!(window.prev(), Some(PageRequest { offset: 0, size: 4 }));
        assert!(!window.has_first());
    }

    #[test]
    fn test_window_last_page_even_division() {
        let window = PageWindow::new(PageRequest::new(0, 10), 40);
        assert_eq!(window.last(), Some(PageRequest { offset: 30, size: 10 }));
    }

    #[test]
    fn test_window_single_page() {
        let window = PageWindow::new(PageRequest::new(0, 20), 4);
        assert!(!window.has_prev());
        assert!(!window.has_next());
        assert!(!window.has_first());
        assert!(!window.has_last());
    }

    #[test]
    fn test_window_near_integer_limit() {
        let huge = i64::MAX as u64;
        let window = PageWindow::new(PageRequest::new(huge, huge), 42);
        assert!(window.has_prev());
        assert!(!window.has_next());
        assert!(!window.has_last());
        assert_eq!(window.next(), None);
        assert_eq!(window.last(), None);

        let window = PageWindow::new(PageRequest::new(u64::MAX, u64::MAX), u64::MAX);
        assert!(!window.has_next());
        assert!(!window.has_last());
    }

    #[test]
    fn test_unbounded_links_with_huge_params() {
        let paging = OffsetSizePaging::new(PagingLimits {
            default_size: 20,
            max_size: 0,
        });
        let req = HttpRequest::new(
            "GET",
            "/users?offset=9223372036854775807&size=9223372036854775807",
        );
        let page = paging.page_request(&req);
        assert_eq!(page.size, i64::MAX as u64);

        let links = paging.links(&req, page, 42);
        assert_eq!(rels(&links), vec!["self", "prev"]);
        assert_eq!(
            links[1].href,
            "/users?offset=0&size=9223372036854775807"
        );
    }

    #[test]
    fn test_page_request_clamping() {
        let paging = OffsetSizePaging::default();
        let req = HttpRequest::new("GET", "/users?offset=-5&size=0");
        assert_eq!(paging.page_request(&req), PageRequest { offset: 0, size: 1 });

        let req = HttpRequest::new("GET", "/users");
        assert_eq!(paging.page_request(&req), PageRequest { offset: 0, size: 20 });

        let req = HttpRequest::new("GET", "/users?size=5000");
        assert_eq!(paging.page_request(&req).size, MAX_PAGE_SIZE);

        let req = HttpRequest::new("GET", "/users?offset=abc&size=7");
        assert_eq!(paging.page_request(&req), PageRequest { offset: 0, size: 7 });
    }

    #[test]
    fn test_links_for_middle_page() {
        let paging = OffsetSizePaging::default();
        let req = HttpRequest::new("GET", "/users?sort=name&offset=17&size=9");
        let links = paging.links(&req, PageRequest::new(17, 9), 42);
        assert_eq!(rels(&links), vec!["self", "prev", "next", "first", "last"]);
        assert_eq!(links[0].href, "/users?sort=name&offset=17&size=9");
        assert_eq!(links[4].href, "/users?sort=name&offset=35&size=7");
    }

    #[test]
    fn test_links_for_only_page() {
        let paging = OffsetSizePaging::default();
        let req = HttpRequest::new("GET", "/users?offset=0&size=20");
        let links = paging.links(&req, PageRequest::new(0, 20), 4);
        assert_eq!(rels(&links), vec!["self"]);
    }

    #[test]
    fn test_page_url_uses_host() {
        let paging = OffsetSizePaging::default();
        let req = HttpRequest::new("GET", "/users").with_header("Host", "api.test");
        assert_eq!(
            paging.page_url(&req, PageRequest::new(20, 20)),
            "http://api.test/users?offset=20&size=20"
        );
    }
}
