//! Flat-array layout of a bucket: breadth-first offsets and region geometry.
//!
//! A bucket's index file is a concatenation of one region per relative depth
//! `n` in `1..=num_levels`. Each region is the breadth-first array of a
//! complete 4-ary tree of depth `n` (root slot included), so a region holds
//! every suffix of length `0..=n` at a deterministic position.

/// Breadth-first array offset of a suffix within its region.
///
/// Empty suffixes map to slot 0 (the bucket root). For a non-empty suffix the
/// digits except the last walk down the tree (`pos = 4 * (pos + 1 + digit)`)
/// and the last digit selects the child slot. For a fixed suffix length `L`
/// the offsets over all `4^L` digit strings are pairwise distinct and fill
/// `[suffix_base(L), suffix_base(L) + 4^L)`.
pub fn offset(suffix: &str) -> usize {
    let bytes = suffix.as_bytes();
    let Some((&last, rest)) = bytes.split_last() else {
        return 0;
    };
    let mut pos = 0usize;
    for &b in rest {
        pos = 4 * (pos + 1 + usize::from(b.wrapping_sub(b'0') & 3));
    }
    pos + usize::from(last.wrapping_sub(b'0') & 3) + 1
}

/// First offset used by suffixes of the given length: `(4^len - 1) / 3`.
pub fn suffix_base(len: usize) -> usize {
    (4usize.pow(len as u32) - 1) / 3
}

/// Length of the region for relative depth `n`: `(4^(n+1) - 1) / 3`,
/// i.e. the node count of a complete 4-ary tree of depth `n`.
pub fn level_entries(n: usize) -> usize {
    (4usize.pow(n as u32 + 1) - 1) / 3
}

/// Total array length for a bucket spanning relative depths `1..=num_levels`.
pub fn array_len(num_levels: usize) -> usize {
    (1..=num_levels).map(level_entries).sum()
}
