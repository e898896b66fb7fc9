use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u64 = 100;
pub const MAX_PAGE_SIZE: u64 = 1000;

/// `page` / `per_page` query parameters. Unparseable values fall back to
/// the defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub per_page: Option<String>,
}

/// Offset/limit window derived from the requested page and the total row count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u64,
    pub per_page: u64,
    pub page_count: u64,
    pub total_count: u64,
}

impl PageWindow {
    pub fn new(params: &PageParams, total_count: u64) -> Self {
        let per_page = match parse_positive(params.per_page.as_deref()) {
            Some(value) => value.min(MAX_PAGE_SIZE),
            None => DEFAULT_PAGE_SIZE,
        };
        let page_count = total_count.div_ceil(per_page);
        let page = parse_positive(params.page.as_deref())
            .unwrap_or(1)
            .min(page_count)
            .max(1);

        Self {
            page,
            per_page,
            page_count,
            total_count,
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    pub fn limit(&self) -> u64 {
        self.per_page
    }

    pub fn with_items<T>(self, items: Vec<T>) -> Page<T> {
        Page {
            page: self.page,
            per_page: self.per_page,
            page_count: self.page_count,
            total_count: self.total_count,
            items,
        }
    }
}

/// JSON envelope returned by list endpoints.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub page: u64,
    pub per_page: u64,
    pub page_count: u64,
    pub total_count: u64,
    pub items: Vec<T>,
}

fn parse_positive(raw: Option<&str>) -> Option<u64> {
    raw?.trim().parse::<u64>().ok().filter(|value| *value > 0)
}
