use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_PAGE_SIZE: u64 = 16;
pub const MAX_PAGE_SIZE: u64 = 1000;

/// Zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub size: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Size is clamped to `1..=MAX_PAGE_SIZE`.
    pub fn new(page: u64, size: u64) -> Self {
        Self {
            page,
            size: size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// When everything fits on one page, serve page 0 whatever was asked.
    pub fn normalize(self, total: u64) -> Self {
        if total <= self.size {
            Self { page: 0, ..self }
        } else {
            self
        }
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.size)
    }

    pub fn limit(&self) -> i64 {
        i64::try_from(self.size).unwrap_or(i64::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    pub current_page: u64,
    pub page_size: u64,
    pub total_pages: u64,
    pub total_records: u64,
    pub is_first: bool,
    pub is_last: bool,
    pub has_next: bool,
    pub has_previous: bool,
    /// Human readable position, e.g. `Page 2 of 5`
    pub header: String,
}

impl PageMetadata {
    pub fn new(request: PageRequest, total_records: u64) -> Self {
        let total_pages = if request.size == 0 {
            0
        } else {
            total_records.div_ceil(request.size)
        };
        let has_next = request.page + 1 < total_pages;
        let has_previous = request.page > 0;
        let shown_page = if total_records == 0 {
            0
        } else {
            request.page + 1
        };

        Self {
            current_page: request.page,
            page_size: request.size,
            total_pages,
            total_records,
            is_first: !has_previous,
            is_last: !has_next,
            has_next,
            has_previous,
            header: format!("Page {} of {}", shown_page, total_pages),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: PageMetadata,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: PageRequest, total_records: u64) -> Self {
        Self {
            content,
            page: PageMetadata::new(request, total_records),
        }
    }

    pub fn empty(request: PageRequest) -> Self {
        Self::new(Vec::new(), request, 0)
    }

    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
        }
    }
}
