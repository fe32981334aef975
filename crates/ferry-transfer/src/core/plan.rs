use crate::data::{ByteRange, ChunkPlan};
use crate::error::{Error, Result};

/// Upload servers commonly require non-final chunks to be multiples of this.
pub const CHUNK_GRANULARITY: u64 = 256 * 1024;

/// Partition `[0, size_bytes - 1]` into inclusive ranges of `chunk_size` bytes.
///
/// Every range has length `chunk_size` except the last, which ends at
/// `size_bytes - 1`. A zero-byte object yields an empty plan.
///
/// # Examples
///
/// ```
/// use ferry_transfer::plan_chunks;
///
/// let plan = plan_chunks(40_000_000, 16_777_216).unwrap();
/// let pairs: Vec<_> = plan.iter().map(|r| (r.start, r.end)).collect();
/// assert_eq!(
///     pairs,
///     vec![(0, 16_777_215), (16_777_216, 33_554_431), (33_554_432, 39_999_999)]
/// );
/// ```
pub fn plan_chunks(size_bytes: u64, chunk_size: u64) -> Result<ChunkPlan> {
    if chunk_size == 0 {
        return Err(Error::Validation("chunk size must be greater than 0".into()));
    }
    if chunk_size % CHUNK_GRANULARITY != 0 {
        tracing::warn!(
            chunk_size,
            "chunk size is not a multiple of 256 KiB; some destinations will reject it"
        );
    }

    let count = size_bytes.div_ceil(chunk_size);
    let ranges = (0..count)
        .map(|i| {
            let start = i * chunk_size;
            let end = if i == count - 1 {
                size_bytes - 1
            } else {
                start + chunk_size - 1
            };
            ByteRange::new(start, end)
        })
        .collect();

    Ok(ChunkPlan::from_ranges(ranges))
}
