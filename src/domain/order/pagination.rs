use serde::{Deserialize, Serialize};

use super::value_objects::OrderStatus;

// ============================================================================
// Pagination - page windows and metadata
// ============================================================================

/// Listing request: optional status filter plus a 1-based page window.
/// Page and limit are positive; the workflow rejects zero values that slip
/// past the upstream DTO validation.
#[derive(Debug, Clone, Deserialize)]
pub struct Pagination {
    pub status: Option<OrderStatus>,
    pub page: u32,
    pub limit: u32,
}

/// Metadata returned alongside a page. `last_page` is `ceil(total / limit)`,
/// so it stays consistent with the filter applied to the data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub total: u64,
    pub page: u32,
    pub last_page: u32,
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl Pagination {
    /// Offset of the first row in this window: `(page - 1) * limit`.
    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }

    pub fn meta(&self, total: u64) -> PageMeta {
        PageMeta {
            total,
            page: self.page,
            last_page: last_page(total, self.limit),
        }
    }
}

/// Number of the last page holding any of `total` rows at `limit` per page.
pub fn last_page(total: u64, limit: u32) -> u32 {
    total.div_ceil(limit as u64) as u32
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_page_rounds_up() {
        assert_eq!(last_page(25, 10), 3);
        assert_eq!(last_page(30, 10), 3);
        assert_eq!(last_page(31, 10), 4);
        assert_eq!(last_page(1, 10), 1);
    }

    #[test]
    fn test_last_page_of_empty_set_is_zero() {
        assert_eq!(last_page(0, 10), 0);
    }

    #[test]
    fn test_offset_is_zero_based_window_start() {
        let pagination = Pagination {
            status: None,
            page: 1,
            limit: 10,
        };
        assert_eq!(pagination.offset(), 0);

        let pagination = Pagination {
            status: None,
            page: 3,
            limit: 7,
        };
        assert_eq!(pagination.offset(), 14);
    }

    #[test]
    fn test_meta_reflects_request_window() {
        let pagination = Pagination {
            status: Some(OrderStatus::Pending),
            page: 2,
            limit: 10,
        };

        assert_eq!(
            pagination.meta(25),
            PageMeta {
                total: 25,
                page: 2,
                last_page: 3,
            }
        );
    }

    #[test]
    fn test_windows_cover_total_without_overlap() {
        let limit = 10u32;
        let total = 25u64;

        let mut covered = 0u64;
        for page in 1..=last_page(total, limit) {
            let pagination = Pagination {
                status: None,
                page,
                limit,
            };
            let start = pagination.offset();
            let len = (total - start).min(limit as u64);
            assert_eq!(start, covered);
            covered += len;
        }

        assert_eq!(covered, total);
    }
}
