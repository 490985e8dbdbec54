//! Quadkey codec: digit strings over {0,1,2,3} packed into sentinel-bit integers.
//!
//! A quadkey names a quadtree node by successive quadrant choices from the
//! root; its length is the node's depth. The integer form folds digits
//! most-significant-first onto an implicit leading 1 bit, so keys that differ
//! only in leading zero digits ("0", "00", "") map to distinct integers.

use anyhow::{bail, Result};

/// Deepest representable quadkey: 2 bits per digit plus the sentinel in a u64.
pub const MAX_DEPTH: usize = 31;

/// Encode a quadkey into its sentinel-bit integer form.
///
/// Digits outside `0..=3` are not rejected; the result for such input is
/// unspecified, matching the rest of the core.
pub fn encode(key: &str) -> u64 {
    let mut q = 1u64;
    for b in key.bytes() {
        q = (q << 2) | u64::from(b.wrapping_sub(b'0') & 3);
    }
    q
}

/// Encode a quadkey, rejecting characters outside `0..=3`.
///
/// Used at trust boundaries such as the missing-node finder, which consumes
/// externally produced key lists.
pub fn try_encode(key: &str) -> Result<u64> {
    if key.len() > MAX_DEPTH {
        bail!("quadkey {:?} exceeds maximum depth {}", key, MAX_DEPTH);
    }
    let mut q = 1u64;
    for c in key.chars() {
        match c {
            '0'..='3' => q = (q << 2) | (c as u64 - '0' as u64),
            _ => bail!("invalid quadkey digit {:?} in {:?}", c, key),
        }
    }
    Ok(q)
}

/// Decode a sentinel-bit integer back into its quadkey string.
///
/// Inverse of [`encode`]: digits are peeled off least-significant-first and
/// prepended until only the sentinel bit remains.
pub fn decode(mut q: u64) -> String {
    let mut digits = String::new();
    while q > 1 {
        digits.push(char::from(b'0' + (q & 3) as u8));
        q >>= 2;
    }
    digits.chars().rev().collect()
}
