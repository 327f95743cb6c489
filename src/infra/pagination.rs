//! Offset based pagination.

use serde::{Deserialize, Deserializer};

/// Page size used when none (or a non-positive one) is requested.
pub const DEFAULT_LIMIT: i64 = 10;

/// Largest page size a client may request.
pub const MAX_LIMIT: i64 = 20;

/// A normalized page request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    limit: i64,
    page: i64,
}

impl PageRequest {
    /// Normalizes a requested page size and 1-indexed page number.
    ///
    /// Out of range values are clamped, never rejected.
    pub fn new(limit: i64, page: i64) -> Self {
        let limit = if limit <= 0 {
            DEFAULT_LIMIT
        } else {
            limit.min(MAX_LIMIT)
        };
        let page = page.max(1);
        Self { limit, page }
    }

    /// The number of elements per page.
    pub fn limit(&self) -> i64 {
        self.limit
    }

    /// The number of elements to skip.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// The number of pages needed to hold `total` elements.
    pub fn total_pages(&self, total: i64) -> i64 {
        if total <= 0 {
            0
        } else {
            (total + self.limit - 1) / self.limit
        }
    }
}

/// Deserializes an optional integer, treating anything unparsable as absent.
pub fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.trim().parse().ok()))
}
