//! Page-numbered result sets.

use campus_api_types::ListEnvelope;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error("per_page must be greater than zero")]
    ZeroPerPage,
    #[error("page holds {items} items but per_page is {per_page}")]
    PageTooLarge { items: usize, per_page: u32 },
    #[error("current page {current} is beyond last page {last}")]
    PageOutOfRange { current: u32, last: u32 },
}

/// One page of a resource collection.
///
/// Always satisfies `items.len() <= per_page` and
/// `1 <= current_page <= last_page`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub current_page: u32,
    pub last_page: u32,
    pub per_page: u32,
}

impl<T> PaginatedResult<T> {
    /// Number of pages needed for `total` items; an empty collection still has one page.
    pub fn last_page_for(total: u64, per_page: u32) -> u32 {
        if per_page == 0 {
            return 1;
        }
        let pages = total.div_ceil(u64::from(per_page)).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// Slice an in-memory collection. `page` is clamped into `[1, last_page]`.
    pub fn paginate(all: Vec<T>, page: u32, per_page: u32) -> Result<Self, PaginationError> {
        if per_page == 0 {
            return Err(PaginationError::ZeroPerPage);
        }
        let total_count = all.len() as u64;
        let last_page = Self::last_page_for(total_count, per_page);
        let current_page = page.clamp(1, last_page);
        let offset = (current_page as usize - 1) * per_page as usize;
        let items = all
            .into_iter()
            .skip(offset)
            .take(per_page as usize)
            .collect();

        Ok(Self {
            items,
            total_count,
            current_page,
            last_page,
            per_page,
        })
    }

    /// Validate a list response from the API.
    ///
    /// An empty page requested past the end is folded onto the last page;
    /// a non-empty one is rejected.
    pub fn from_envelope(envelope: ListEnvelope<T>) -> Result<Self, PaginationError> {
        let ListEnvelope { data, meta, .. } = envelope;

        let per_page = match meta.per_page {
            Some(0) => return Err(PaginationError::ZeroPerPage),
            Some(per_page) => per_page,
            None => u32::try_from(data.len().max(1)).unwrap_or(u32::MAX),
        };
        if data.len() > per_page as usize {
            return Err(PaginationError::PageTooLarge {
                items: data.len(),
                per_page,
            });
        }

        let last_page = meta.last_page.max(1);
        let mut current_page = meta.current_page.max(1);
        if current_page > last_page {
            if !data.is_empty() {
                return Err(PaginationError::PageOutOfRange {
                    current: current_page,
                    last: last_page,
                });
            }
            current_page = last_page;
        }

        Ok(Self {
            items: data,
            total_count: meta.total,
            current_page,
            last_page,
            per_page,
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.last_page
    }

    pub fn has_prev(&self) -> bool {
        self.current_page > 1
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResult<U> {
        PaginatedResult {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            current_page: self.current_page,
            last_page: self.last_page,
            per_page: self.per_page,
        }
    }
}
