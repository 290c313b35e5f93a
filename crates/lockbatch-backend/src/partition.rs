//! Splitting a batch of worlds across workers.

use std::ops::Range;

/// Split `0..n` into `parts` contiguous ranges whose sizes differ by at
/// most one, larger ranges first.
///
/// Empty ranges are omitted, so fewer than `parts` ranges come back when
/// `n < parts`. `parts == 0` is treated as 1.
pub fn partition(n: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.max(1).min(n.max(1));
    let base = n / parts;
    let extra = n % parts;
    let mut ranges = Vec::with_capacity(parts);
    let mut start = 0;
    for i in 0..parts {
        let len = base + usize::from(i < extra);
        if len == 0 {
            continue;
        }
        ranges.push(start..start + len);
        start += len;
    }
    ranges
}

/// Split `items` into consecutive mutable shards matching `ranges`.
///
/// `ranges` must be contiguous from 0, as produced by [`partition`].
pub(crate) fn shards_mut<'a, T>(mut items: &'a mut [T], ranges: &[Range<usize>]) -> Vec<&'a mut [T]> {
    let mut shards = Vec::with_capacity(ranges.len());
    for r in ranges {
        let (head, tail) = std::mem::take(&mut items).split_at_mut(r.len());
        shards.push(head);
        items = tail;
    }
    shards
}
