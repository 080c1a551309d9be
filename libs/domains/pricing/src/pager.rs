//! Positional offset/limit windows over evaluated results.

use crate::error::QueryError;

/// One window of results and the offset to continue from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub records: Vec<T>,
    /// `offset + limit` while records remain, otherwise `None`
    pub next_offset: Option<usize>,
    pub total_matches: usize,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            records: self.records.into_iter().map(f).collect(),
            next_offset: self.next_offset,
            total_matches: self.total_matches,
        }
    }
}

/// Slice `results` to `[offset, offset + limit)`.
///
/// Holds no cursor state, so the same inputs always give the same page.
pub fn page<T: Clone>(results: &[T], offset: usize, limit: usize) -> Result<Page<T>, QueryError> {
    if limit == 0 {
        return Err(QueryError::InvalidPagination { limit });
    }

    let total_matches = results.len();
    if offset >= total_matches {
        return Ok(Page {
            records: Vec::new(),
            next_offset: None,
            total_matches,
        });
    }

    let end = offset.saturating_add(limit).min(total_matches);
    let next_offset = (end < total_matches).then_some(end);

    Ok(Page {
        records: results[offset..end].to_vec(),
        next_offset,
        total_matches,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_page_has_continuation() {
        let results: Vec<u32> = (0..25).collect();
        let page = page(&results, 0, 10).unwrap();
        assert_eq!(page.records, (0..10).collect::<Vec<_>>());
        assert_eq!(page.next_offset, Some(10));
        assert_eq!(page.total_matches, 25);
    }

    #[test]
    fn test_last_page_has_no_continuation() {
        let results: Vec<u32> = (0..25).collect();
        let page = page(&results, 20, 10).unwrap();
        assert_eq!(page.records, (20..25).collect::<Vec<_>>());
        assert_eq!(page.next_offset, None);
    }

    #[test]
    fn test_exact_fit_has_no_continuation() {
        let results: Vec<u32> = (0..10).collect();
        assert_eq!(page(&results, 0, 10).unwrap().next_offset, None);
    }

    #[test]
    fn test_offset_past_end_is_empty() {
        let results: Vec<u32> = (0..5).collect();
        let page = page(&results, 5, 3).unwrap();
        assert!(page.records.is_empty());
        assert_eq!(page.next_offset, None);

        let empty: Vec<u32> = Vec::new();
        assert!(super::page(&empty, 0, 3).unwrap().records.is_empty());
    }

    #[test]
    fn test_zero_limit_rejected() {
        let results: Vec<u32> = (0..5).collect();
        assert_eq!(
            page(&results, 0, 0).unwrap_err(),
            QueryError::InvalidPagination { limit: 0 }
        );
    }

    #[test]
    fn test_large_limit_does_not_overflow() {
        let results: Vec<u32> = (0..5).collect();
        let page = page(&results, 2, usize::MAX).unwrap();
        assert_eq!(page.records, vec![2, 3, 4]);
        assert_eq!(page.next_offset, None);
    }

    #[test]
    fn test_following_next_offset_reproduces_results_once() {
        for len in [0usize, 1, 7, 10, 23] {
            let results: Vec<usize> = (0..len).collect();
            for limit in 1..=11 {
                let mut collected = Vec::new();
                let mut offset = Some(0);
                while let Some(current) = offset {
                    let page = page(&results, current, limit).unwrap();
                    collected.extend(page.records);
                    offset = page.next_offset;
                }
                assert_eq!(collected, results, "len={len} limit={limit}");
            }
        }
    }

    #[test]
    fn test_map_keeps_window() {
        let results = vec!["a", "b", "c"];
        let page = page(&results, 1, 1).unwrap().map(str::to_uppercase);
        assert_eq!(page.records, vec!["B".to_string()]);
        assert_eq!(page.next_offset, Some(2));
        assert_eq!(page.total_matches, 3);
    }
}
