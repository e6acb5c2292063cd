//! Segment job type and byte-range splitting.

use std::path::PathBuf;

/// One unit of upload work: the byte range `[byte_offset, byte_offset + byte_length)`
/// of the source file. `index` is 0-based and defines manifest order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentJob {
    pub index: usize,
    pub byte_offset: u64,
    pub byte_length: u64,
    /// Local segment file while it exists on disk; `None` before creation and after deletion.
    pub local_path: Option<PathBuf>,
}

impl SegmentJob {
    /// End offset (exclusive).
    pub fn end(&self) -> u64 {
        self.byte_offset + self.byte_length
    }
}

/// Splits `total_size` bytes into fixed `segment_size` ranges. Every range has
/// length `segment_size` except possibly the last.
/// Returns an empty vec if `total_size` is 0 or `segment_size` is 0.
pub(super) fn split_fixed(total_size: u64, segment_size: u64) -> Vec<SegmentJob> {
    if total_size == 0 || segment_size == 0 {
        return Vec::new();
    }

    let count = total_size.div_ceil(segment_size);
    let mut out = Vec::with_capacity(count as usize);
    let mut offset = 0u64;

    for index in 0..count as usize {
        let end = (offset + segment_size).min(total_size);
        out.push(SegmentJob {
            index,
            byte_offset: offset,
            byte_length: end - offset,
            local_path: None,
        });
        offset = end;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_even() {
        let jobs = split_fixed(1000, 250);
        assert_eq!(jobs.len(), 4);
        assert_eq!(jobs[0].byte_offset, 0);
        assert_eq!(jobs[0].end(), 250);
        assert_eq!(jobs[3].byte_offset, 750);
        assert_eq!(jobs[3].end(), 1000);
        assert!(jobs.iter().all(|j| j.byte_length == 250));
    }

    #[test]
    fn split_short_tail() {
        let jobs = split_fixed(10, 4);
        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[0].byte_length, 4);
        assert_eq!(jobs[1].byte_length, 4);
        // last segment carries the remainder
        assert_eq!(jobs[2].byte_offset, 8);
        assert_eq!(jobs[2].byte_length, 2);
    }

    #[test]
    fn split_single() {
        let jobs = split_fixed(100, 1000);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].byte_offset, 0);
        assert_eq!(jobs[0].byte_length, 100);
    }

    #[test]
    fn split_empty() {
        assert!(split_fixed(0, 4).is_empty());
        assert!(split_fixed(100, 0).is_empty());
    }

    #[test]
    fn indices_are_sequential_and_contiguous() {
        let jobs = split_fixed(12_345, 1_000);
        for (i, pair) in jobs.windows(2).enumerate() {
            assert_eq!(pair[0].index, i);
            assert_eq!(pair[0].end(), pair[1].byte_offset);
        }
        assert_eq!(jobs.last().unwrap().end(), 12_345);
    }
}
