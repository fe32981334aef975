use std::fmt;

use serde::{Deserialize, Serialize};

/// An inclusive byte range `start..=end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u64; 2]", into = "[u64; 2]")]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Range` request header value.
    pub fn range_header(&self) -> String {
        format!("bytes={self}")
    }

    /// `Content-Range` header value for an upload of a `total`-byte object.
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {self}/{total}")
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl From<[u64; 2]> for ByteRange {
    fn from([start, end]: [u64; 2]) -> Self {
        Self { start, end }
    }
}

impl From<ByteRange> for [u64; 2] {
    fn from(r: ByteRange) -> Self {
        [r.start, r.end]
    }
}

/// Ordered, gap-free, non-overlapping partition of `[0, size - 1]`.
///
/// Built by [`crate::plan_chunks`]; never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkPlan(Vec<ByteRange>);

impl ChunkPlan {
    pub(crate) fn from_ranges(ranges: Vec<ByteRange>) -> Self {
        Self(ranges)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ByteRange> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ByteRange> {
        self.0.iter()
    }

    pub fn ranges(&self) -> &[ByteRange] {
        &self.0
    }

    /// Size of the object the plan covers.
    pub fn total_bytes(&self) -> u64 {
        self.0.last().map_or(0, |r| r.end + 1)
    }

    /// Bytes covered by the chunks before `index`.
    pub fn bytes_before(&self, index: usize) -> u64 {
        self.0.get(index).map_or_else(|| self.total_bytes(), |r| r.start)
    }

    /// Whether the ranges cover `[0, size - 1]` in order, without gaps or overlaps.
    pub fn partitions(&self, size: u64) -> bool {
        let mut next = 0;
        for r in &self.0 {
            if r.start != next || r.end < r.start {
                return false;
            }
            next = r.end + 1;
        }
        next == size
    }
}

impl<'a> IntoIterator for &'a ChunkPlan {
    type Item = &'a ByteRange;
    type IntoIter = std::slice::Iter<'a, ByteRange>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_render_inclusive_ranges() {
        let r = ByteRange::new(16_777_216, 33_554_431);
        assert_eq!(r.range_header(), "bytes=16777216-33554431");
        assert_eq!(r.content_range(40_000_000), "bytes 16777216-33554431/40000000");
        assert_eq!(r.len(), 16_777_216);
    }

    #[test]
    fn plan_serializes_as_pairs() {
        let plan = ChunkPlan::from_ranges(vec![ByteRange::new(0, 9), ByteRange::new(10, 14)]);
        let json = serde_json::to_string(&plan).unwrap();
        assert_eq!(json, "[[0,9],[10,14]]");
        let back: ChunkPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(back, plan);
        assert_eq!(back.total_bytes(), 15);
        assert_eq!(back.bytes_before(1), 10);
        assert_eq!(back.bytes_before(2), 15);
    }

    #[test]
    fn partition_check_rejects_gaps_and_reversed_ranges() {
        let plan = ChunkPlan::from_ranges(vec![ByteRange::new(0, 9), ByteRange::new(10, 14)]);
        assert!(plan.partitions(15));
        assert!(!plan.partitions(16));

        let gap: ChunkPlan = serde_json::from_str("[[0,9],[11,14]]").unwrap();
        assert!(!gap.partitions(15));
        let reversed: ChunkPlan = serde_json::from_str("[[0,9],[500,10]]").unwrap();
        assert!(!reversed.partitions(15));
        assert!(ChunkPlan::default().partitions(0));
    }
}
