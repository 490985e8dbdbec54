//! Two-tier bucket partitioning and multi-layer size aggregation.
//!
//! The quadtree is split into buckets so a consumer can load one depth range
//! without touching the rest of the pyramid: a single root bucket (empty
//! prefix) covers depths `1..=idx_step`, and one bucket per depth-`idx_step`
//! prefix covers depths `idx_step+1..=max_level`.
//!
//! Each bucket owns `num_levels + 1` sparse layers indexed by relative depth
//! (suffix length). Aggregation rolls sizes up the tree once per layer, so
//! layer `m`'s entry for an ancestor key ends up holding the total size of
//! its depth-`m` descendants. The replication across layers is deliberate:
//! it gives consumers a per-resolution subtree total at every zoom step.

use crate::index::layout;
use crate::index::size_table::SizeTable;
use anyhow::{bail, Context, Result};
use std::collections::{BTreeMap, HashMap};

/// One bucket of the index: a prefix and its per-layer sparse size tables.
#[derive(Debug, Clone)]
pub struct Bucket {
    /// Prefix quadkey identifying the bucket (empty for the root bucket).
    pub prefix: String,

    /// Number of relative depths this bucket materializes.
    pub num_levels: usize,

    /// Sparse size tables indexed by relative depth, `num_levels + 1` long.
    /// Before aggregation layer `n` holds exactly the length-`n` suffixes;
    /// afterwards it also holds rolled-up ancestor entries.
    pub layers: Vec<HashMap<String, u32>>,
}

impl Bucket {
    fn new(prefix: &str, num_levels: usize) -> Self {
        Self {
            prefix: prefix.to_string(),
            num_levels,
            layers: vec![HashMap::new(); num_levels + 1],
        }
    }

    /// Length of this bucket's flat index array.
    pub fn array_len(&self) -> usize {
        layout::array_len(self.num_levels)
    }

    /// Number of actual tiles stored in this bucket (entries whose suffix
    /// length equals their layer, i.e. not rolled-up ancestors).
    pub fn tile_count(&self) -> usize {
        self.layers
            .iter()
            .enumerate()
            .map(|(n, layer)| layer.keys().filter(|k| k.len() == n).count())
            .sum()
    }
}

/// All buckets for one build, keyed by prefix so emission is deterministic.
#[derive(Debug)]
pub struct BucketSet {
    pub max_level: usize,
    pub idx_step: usize,
    buckets: BTreeMap<String, Bucket>,
}

impl BucketSet {
    /// Assign every size record to its bucket and layer.
    ///
    /// Keys longer than `idx_step` go to the bucket named by their first
    /// `idx_step` digits; everything else goes to the root bucket. A key
    /// deeper than `max_level` cannot be placed and aborts the run.
    pub fn partition(sizes: &SizeTable, max_level: usize, idx_step: usize) -> Result<Self> {
        let mut buckets: BTreeMap<String, Bucket> = BTreeMap::new();

        for (key, &size) in sizes {
            if key.len() > max_level {
                bail!(
                    "quadkey {:?} is deeper than max level {}",
                    key,
                    max_level
                );
            }

            let p = if key.len() > idx_step { idx_step } else { 0 };
            let (prefix, suffix) = key.split_at(p);

            let num_levels = bucket_levels(p, max_level, idx_step);
            let bucket = buckets
                .entry(prefix.to_string())
                .or_insert_with(|| Bucket::new(prefix, num_levels));

            bucket.layers[suffix.len()].insert(suffix.to_string(), size);
        }

        tracing::info!(
            "Partitioned {} records into {} buckets (idx_step={}, max_level={})",
            sizes.len(),
            buckets.len(),
            idx_step,
            max_level
        );

        Ok(Self {
            max_level,
            idx_step,
            buckets,
        })
    }

    /// Roll sizes up the tree within every bucket.
    ///
    /// For each relative depth `n` from the bottom up, every suffix stored at
    /// depth `n` contributes its layer-`m` entry to its parent's layer-`m`
    /// entry for all `m` in `n..=num_levels`. A suffix with no entry at layer
    /// `m` has no depth-`m` descendants and contributes nothing there.
    pub fn aggregate(&mut self) -> Result<()> {
        for bucket in self.buckets.values_mut() {
            for n in (1..=bucket.num_levels).rev() {
                let suffixes: Vec<String> = bucket.layers[n].keys().cloned().collect();
                for suffix in suffixes {
                    let parent = &suffix[..suffix.len() - 1];
                    for m in n..=bucket.num_levels {
                        let Some(&child) = bucket.layers[m].get(&suffix) else {
                            continue;
                        };
                        let entry = bucket.layers[m].entry(parent.to_string()).or_insert(0);
                        *entry = entry.checked_add(child).with_context(|| {
                            format!(
                                "aggregated size overflows u32 at bucket {:?}, layer {}, key {:?}",
                                bucket.prefix, m, parent
                            )
                        })?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Iterate buckets in lexicographic prefix order.
    pub fn buckets(&self) -> impl Iterator<Item = &Bucket> {
        self.buckets.values()
    }

    /// Look up a bucket by prefix.
    pub fn get(&self, prefix: &str) -> Option<&Bucket> {
        self.buckets.get(prefix)
    }

    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Depth span of a bucket given its prefix length.
fn bucket_levels(prefix_len: usize, max_level: usize, idx_step: usize) -> usize {
    if prefix_len == 0 {
        idx_step
    } else {
        max_level - idx_step
    }
}
