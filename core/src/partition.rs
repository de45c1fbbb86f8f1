//! Mechanical sharding of the line table.
//!
//! Shards carry no meaning (not a partition key): the first k−1 hold
//! floor(total/k) rows each and the last absorbs the remainder.
//! Row order is preserved within and across shards.

use std::ops::Range;

/// Contiguous row ranges for `k` shards over `total` rows.
pub fn shard_bounds(total: usize, k: usize) -> Vec<Range<usize>> {
    assert!(k > 0, "shard count must be > 0");
    let per_shard = total / k;
    (0..k)
        .map(|i| {
            let start = i * per_shard;
            let end = if i + 1 < k { start + per_shard } else { total };
            start..end
        })
        .collect()
}

/// Split a slice into shard-sized sub-slices.
pub fn split<T>(rows: &[T], k: usize) -> Vec<&[T]> {
    shard_bounds(rows.len(), k)
        .into_iter()
        .map(|r| &rows[r])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_shard_absorbs_remainder() {
        let bounds = shard_bounds(23, 4);
        let sizes: Vec<usize> = bounds.iter().map(|r| r.len()).collect();
        assert_eq!(sizes, vec![5, 5, 5, 8]);
        assert_eq!(bounds.last().unwrap().end, 23);
    }

    #[test]
    fn bounds_are_contiguous_and_cover_everything() {
        for total in [0usize, 1, 7, 10, 99, 1000] {
            for k in 1..=12 {
                let bounds = shard_bounds(total, k);
                assert_eq!(bounds.len(), k);
                assert_eq!(bounds[0].start, 0);
                for pair in bounds.windows(2) {
                    assert_eq!(pair[0].end, pair[1].start);
                }
                let sum: usize = bounds.iter().map(|r| r.len()).sum();
                assert_eq!(sum, total, "total={total} k={k}");
                for r in &bounds[..k - 1] {
                    assert_eq!(r.len(), total / k);
                }
            }
        }
    }

    #[test]
    fn fewer_rows_than_shards_lands_in_last() {
        let rows = [1, 2, 3];
        let shards = split(&rows, 5);
        assert!(shards[..4].iter().all(|s| s.is_empty()));
        assert_eq!(shards[4], &[1, 2, 3]);
    }

    #[test]
    fn concatenation_restores_order() {
        let rows: Vec<u32> = (0..101).collect();
        let joined: Vec<u32> = split(&rows, 10).concat();
        assert_eq!(joined, rows);
    }
}
