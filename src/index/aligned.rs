//! Historical idxStep-aligned partitioning scheme.
//!
//! Predecessor of the two-tier scheme in [`crate::index::bucket`]: buckets
//! are rooted at every idx_step-aligned depth, each bucket keeps a single
//! sparse size table, rollup adds each node once into its immediate parent,
//! and the index array is filled by a depth-first walk. Kept because
//! existing tile sets were published in this layout; new builds should use
//! the two-tier scheme.

use crate::index::size_table::SizeTable;
use crate::io::manifest;
use anyhow::{bail, Context, Result};
use byteorder::{LittleEndian, WriteBytesExt};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Partition, aggregate and write aligned buckets in one pass.
///
/// Bucket names (`"t" + prefix`) go to `out`, one per line; each bucket gets
/// a `<series>-t<prefix>.idx` array and a `<series>-t<prefix>.txt` tile list
/// in depth-first visit order.
pub fn build(
    sizes: &SizeTable,
    series: &str,
    max_level: usize,
    idx_step: usize,
    output_dir: &Path,
    out: &mut impl Write,
) -> Result<()> {
    let buckets = partition(sizes, max_level, idx_step)?;

    tracing::info!("Partitioned {} records into {} aligned buckets", sizes.len(), buckets.len());

    for (prefix, bucket) in &buckets {
        writeln!(out, "t{}", prefix)?;
        write_bucket(prefix, bucket, series, max_level, idx_step, output_dir)?;
    }

    Ok(())
}

/// Split keys at the idx_step-aligned depth above them and roll sizes up to
/// each bucket's root.
fn partition(
    sizes: &SizeTable,
    max_level: usize,
    idx_step: usize,
) -> Result<BTreeMap<String, HashMap<String, u32>>> {
    let mut buckets: BTreeMap<String, HashMap<String, u32>> = BTreeMap::new();

    for (key, &size) in sizes {
        if key.len() > max_level {
            bail!("quadkey {:?} is deeper than max level {}", key, max_level);
        }
        let p = if key.is_empty() {
            0
        } else {
            ((key.len() - 1) / idx_step) * idx_step
        };
        let (prefix, suffix) = key.split_at(p);

        let bucket = buckets.entry(prefix.to_string()).or_insert_with(|| {
            // Seed the bucket root so the depth-first walk always starts
            let mut table = HashMap::new();
            table.insert(String::new(), 0);
            table
        });
        bucket.insert(suffix.to_string(), size);
    }

    // Single-parent rollup, deepest suffixes first
    for (prefix, bucket) in &mut buckets {
        let mut suffixes: Vec<String> = bucket.keys().cloned().collect();
        suffixes.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| b.cmp(a)));

        for suffix in suffixes {
            if suffix.is_empty() {
                continue;
            }
            let child = bucket[&suffix];
            let parent = &suffix[..suffix.len() - 1];
            // The tile list must only name tiles that physically exist, so a
            // node whose parent tile is absent is a consistency violation
            let Some(entry) = bucket.get_mut(parent) else {
                bail!(
                    "tile {:?}{:?} has no parent tile in bucket {:?}",
                    prefix,
                    suffix,
                    prefix
                );
            };
            *entry = entry.checked_add(child).with_context(|| {
                format!(
                    "aggregated size overflows u32 at bucket {:?}, key {:?}",
                    prefix, parent
                )
            })?;
        }
    }

    Ok(buckets)
}

/// Fill and serialize one aligned bucket.
fn write_bucket(
    prefix: &str,
    bucket: &HashMap<String, u32>,
    series: &str,
    max_level: usize,
    idx_step: usize,
    output_dir: &Path,
) -> Result<()> {
    let depth = prefix.len();
    let span = (depth + idx_step).min(max_level) - depth;
    // Complete 4-ary tree of the bucket's span, minus the root slot
    let num_entries = (4usize.pow(span as u32 + 1) - 1) / 3 - 1;

    let mut idx = vec![0u32; num_entries];
    let mut tiles = Vec::new();
    visit(bucket, "", 0, &mut idx, &mut tiles);

    let idx_path = output_dir.join(format!("{}-t{}.idx", series, prefix));
    let mut writer = BufWriter::new(
        File::create(&idx_path)
            .with_context(|| format!("failed to create index file: {}", idx_path.display()))?,
    );
    for value in &idx {
        writer.write_u32::<LittleEndian>(*value)?;
    }
    writer.flush()?;

    let list_path = output_dir.join(format!("{}-t{}.txt", series, prefix));
    let mut list = BufWriter::new(
        File::create(&list_path)
            .with_context(|| format!("failed to create tile list: {}", list_path.display()))?,
    );
    for tile in &tiles {
        writeln!(list, "{}", manifest::tile_path(series, &format!("{}{}", prefix, tile)))?;
    }
    list.flush()?;

    tracing::debug!(
        "Wrote aligned bucket {:?}: {} entries, {} tiles",
        prefix,
        num_entries,
        tiles.len()
    );

    Ok(())
}

/// Depth-first fill: children of a present node land at `off + digit`, and
/// the walk descends with `(off + digit + 1) * 4`. Recursion is bounded by
/// the bucket span because absent keys stop the descent.
fn visit(sizes: &HashMap<String, u32>, key: &str, off: usize, idx: &mut [u32], tiles: &mut Vec<String>) {
    if !sizes.contains_key(key) {
        return;
    }
    for d in 0..4u8 {
        let child = format!("{}{}", key, d);
        if let Some(&size) = sizes.get(&child) {
            idx[off + d as usize] = size;
            tiles.push(child);
        }
    }
    for d in 0..4u8 {
        let child = format!("{}{}", key, d);
        visit(sizes, &child, (off + d as usize + 1) * 4, idx, tiles);
    }
}
