//! Coverage-gap finder: report quadtree nodes whose parent exists but which
//! are themselves absent from a tile set.

use crate::quadkey;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::io::{BufRead, Write};

/// Read one quadkey per line into an encoded node set.
///
/// Unlike the index core, this path validates digits: the key lists come
/// from external tooling and a stray character would silently corrupt the
/// set-membership test.
pub fn read_present(reader: impl BufRead) -> Result<HashSet<u64>> {
    let mut present = HashSet::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read quadkey at line {}", idx + 1))?;
        let encoded = quadkey::try_encode(&line)
            .with_context(|| format!("line {}: bad quadkey", idx + 1))?;
        present.insert(encoded);
    }
    Ok(present)
}

/// Walk the quadtree depth-first from the root and emit every missing node.
///
/// A present node is explored down to `max_level`; an absent node is written
/// out and its subtree skipped. Recursion depth is bounded by `max_level`.
pub fn find_missing(present: &HashSet<u64>, max_level: usize, out: &mut impl Write) -> Result<()> {
    walk(present, 1, 0, max_level, out)
}

fn walk(
    present: &HashSet<u64>,
    node: u64,
    depth: usize,
    max_level: usize,
    out: &mut impl Write,
) -> Result<()> {
    if present.contains(&node) {
        if depth < max_level {
            for child in 0..4u64 {
                walk(present, (node << 2) | child, depth + 1, max_level, out)?;
            }
        }
    } else {
        writeln!(out, "{}", quadkey::decode(node))?;
    }
    Ok(())
}
