//! Offset pagination shared by every listing endpoint.

use serde::{Deserialize, Serialize};

/// Default page size when the caller does not ask for one.
pub const DEFAULT_LIMIT: usize = 50;

/// Hard upper bound on a single page.
pub const MAX_LIMIT: usize = 200;

/// Requested window into a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    #[must_use]
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// Limit clamped to `1..=MAX_LIMIT`.
    #[must_use]
    pub fn effective_limit(&self) -> usize {
        self.limit.clamp(1, MAX_LIMIT)
    }

    /// Cut a fully materialized, already ordered listing down to this page.
    #[must_use]
    pub fn apply<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len();
        let limit = self.effective_limit();
        let items = items.into_iter().skip(self.offset).take(limit).collect();
        Page {
            items,
            total,
            offset: self.offset,
            limit,
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

impl<T> Page<T> {
    /// Transform every item, keeping the window metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            offset: self.offset,
            limit: self.limit,
        }
    }
}
