//! Fill and serialize per-bucket index arrays, tile manifests and the master
//! bucket list.
//!
//! Output files for a series `s` and bucket prefix `p`:
//! - `s-tp.idx`: the bucket's flat array of little-endian u32 values
//! - `s-tp.lst`: one tile path per physically existing tile, grouped by
//!   relative depth, sorted within each depth
//! - `s-buckets.txt`: one `"t" + prefix` line per bucket

use crate::index::layout;
use crate::index::{Bucket, BucketSet};
use crate::io::manifest;
use anyhow::{bail, Context, Result};
use byteorder::{LittleEndian, WriteBytesExt};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Totals reported after a successful write pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteStats {
    pub buckets: usize,
    pub tiles: usize,
    pub index_bytes: u64,
}

impl fmt::Display for WriteStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} buckets, {} tiles, {} index bytes",
            self.buckets, self.tiles, self.index_bytes
        )
    }
}

/// Writes every bucket of a build to one output directory.
pub struct IndexWriter {
    series: String,
    output_dir: PathBuf,
}

impl IndexWriter {
    pub fn new(series: &str, output_dir: &Path) -> Self {
        Self {
            series: series.to_string(),
            output_dir: output_dir.to_path_buf(),
        }
    }

    /// Write all buckets plus the master bucket list.
    ///
    /// Every file is created from scratch; reruns fully rewrite the output
    /// set, so a failed run leaves nothing to salvage or patch.
    pub fn write_all(&self, buckets: &BucketSet) -> Result<WriteStats> {
        let list_path = self.output_dir.join(format!("{}-buckets.txt", self.series));
        let mut bucket_list = BufWriter::new(
            File::create(&list_path)
                .with_context(|| format!("failed to create bucket list: {}", list_path.display()))?,
        );

        let mut stats = WriteStats::default();
        for bucket in buckets.buckets() {
            writeln!(bucket_list, "t{}", bucket.prefix)?;
            let (array, tiles) = self.write_bucket(bucket)?;
            stats.buckets += 1;
            stats.tiles += tiles;
            stats.index_bytes += (array * 4) as u64;
        }
        bucket_list.flush()?;

        tracing::info!("Wrote bucket list to {}", list_path.display());

        Ok(stats)
    }

    /// Write one bucket's `.idx` and `.lst` files. Returns the array length
    /// and the number of manifest lines.
    fn write_bucket(&self, bucket: &Bucket) -> Result<(usize, usize)> {
        let (array, lines) = fill_bucket(bucket, &self.series)?;

        let idx_path = self
            .output_dir
            .join(format!("{}-t{}.idx", self.series, bucket.prefix));
        let mut idx_file = BufWriter::new(
            File::create(&idx_path)
                .with_context(|| format!("failed to create index file: {}", idx_path.display()))?,
        );
        for value in &array {
            idx_file.write_u32::<LittleEndian>(*value)?;
        }
        idx_file.flush()?;

        let lst_path = self
            .output_dir
            .join(format!("{}-t{}.lst", self.series, bucket.prefix));
        let mut lst_file = BufWriter::new(
            File::create(&lst_path)
                .with_context(|| format!("failed to create manifest: {}", lst_path.display()))?,
        );
        for line in &lines {
            writeln!(lst_file, "{}", line)?;
        }
        lst_file.flush()?;

        tracing::debug!(
            "Wrote bucket {:?}: {} array entries, {} tiles",
            bucket.prefix,
            array.len(),
            lines.len()
        );

        Ok((array.len(), lines.len()))
    }
}

/// Populate a bucket's flat array and collect its manifest lines.
///
/// Each relative depth `n` occupies its own region; every key of layer `n`
/// (rolled-up ancestors included) lands at `base + offset(key)`. A slot that
/// already holds a non-zero value is a fatal consistency violation. Manifest
/// lines cover only literal depth-`n` keys, sorted per depth.
pub fn fill_bucket(bucket: &Bucket, series: &str) -> Result<(Vec<u32>, Vec<String>)> {
    let mut array = vec![0u32; bucket.array_len()];
    let mut lines = Vec::new();

    let mut base = 0;
    for n in 1..=bucket.num_levels {
        let layer = &bucket.layers[n];

        for (key, &size) in layer {
            let slot = base + layout::offset(key);
            if array[slot] != 0 {
                bail!(
                    "duplicate slot {} in bucket {:?} (key {:?} at relative depth {})",
                    slot,
                    bucket.prefix,
                    key,
                    n
                );
            }
            array[slot] = size;
        }

        let mut tiles: Vec<&String> = layer.keys().filter(|k| k.len() == n).collect();
        tiles.sort();
        for tile in tiles {
            lines.push(manifest::tile_path(
                series,
                &format!("{}{}", bucket.prefix, tile),
            ));
        }

        base += layout::level_entries(n);
    }

    Ok((array, lines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::SizeTable;
    use byteorder::ReadBytesExt;
    use std::collections::HashMap;
    use std::io::Read;

    fn build_set(entries: &[(&str, u32)], max_level: usize, idx_step: usize) -> BucketSet {
        let sizes: SizeTable = entries.iter().map(|&(k, v)| (k.to_string(), v)).collect();
        let mut set = BucketSet::partition(&sizes, max_level, idx_step).unwrap();
        set.aggregate().unwrap();
        set
    }

    fn read_idx(path: &Path) -> Vec<u32> {
        let mut data = Vec::new();
        File::open(path).unwrap().read_to_end(&mut data).unwrap();
        let mut cursor = &data[..];
        let mut values = Vec::new();
        while let Ok(v) = cursor.read_u32::<LittleEndian>() {
            values.push(v);
        }
        values
    }

    #[test]
    fn test_fill_bucket_worked_example() {
        // idx_step=2, max_level=4 with "10 00", "20 01", "5 0000"
        let set = build_set(&[("00", 10), ("01", 20), ("0000", 5)], 4, 2);
        let root = set.get("").unwrap();
        let (array, lines) = fill_bucket(root, "sat").unwrap();

        assert_eq!(array.len(), 26);
        // Depth-1 region [0, 5) is empty; depth-2 region starts at 5
        let base = layout::level_entries(1);
        assert_eq!(array[base + layout::offset("00")], 10);
        assert_eq!(array[base + layout::offset("01")], 20);
        assert_eq!(array[base + layout::offset("0")], 30);
        assert_eq!(array.iter().filter(|&&v| v != 0).count(), 3);

        // Only literal depth-2 tiles appear in the manifest, sorted
        assert_eq!(lines, vec!["sat/00t.png", "sat/01t.png"]);
    }

    #[test]
    fn test_fill_bucket_leaf_sizes_survive_unmodified() {
        // Every record's size must land, unmodified, at the leaf slot of
        // exactly one bucket's array. Leaf slots are never touched by
        // rollups (ancestor entries are strictly shorter keys).
        let entries = [("0", 1u32), ("12", 2), ("33", 4), ("0123", 8), ("2000", 16)];
        let (max_level, idx_step) = (4, 2);
        let set = build_set(&entries, max_level, idx_step);

        let mut arrays: HashMap<String, Vec<u32>> = HashMap::new();
        for bucket in set.buckets() {
            let (array, _) = fill_bucket(bucket, "sat").unwrap();
            arrays.insert(bucket.prefix.clone(), array);
        }

        for &(key, size) in &entries {
            let p = if key.len() > idx_step { idx_step } else { 0 };
            let (prefix, suffix) = key.split_at(p);
            let base: usize = (1..suffix.len()).map(layout::level_entries).sum();
            let slot = base + layout::offset(suffix);
            assert_eq!(
                arrays[prefix][slot], size,
                "size of tile {:?} not found at its slot",
                key
            );
        }
    }

    #[test]
    fn test_fill_bucket_duplicate_slot_is_fatal() {
        // Malformed digits can collide: "04" masks to "00", so both keys
        // compute the same slot
        let mut bucket = Bucket {
            prefix: String::new(),
            num_levels: 2,
            layers: vec![HashMap::new(), HashMap::new(), HashMap::new()],
        };
        bucket.layers[2].insert("04".to_string(), 1);
        bucket.layers[2].insert("00".to_string(), 2);

        let err = fill_bucket(&bucket, "sat").unwrap_err();
        assert!(format!("{}", err).contains("duplicate slot"));
    }

    #[test]
    fn test_write_all_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let set = build_set(&[("00", 10), ("01", 20), ("0000", 5)], 4, 2);

        let writer = IndexWriter::new("sat", dir.path());
        let stats = writer.write_all(&set).unwrap();
        assert_eq!(stats.buckets, 2);
        assert_eq!(stats.tiles, 3);

        // Master list in lexicographic prefix order
        let list = std::fs::read_to_string(dir.path().join("sat-buckets.txt")).unwrap();
        assert_eq!(list, "t\nt00\n");

        // Root bucket array
        let idx = read_idx(&dir.path().join("sat-t.idx"));
        assert_eq!(idx.len(), 26);
        let base = layout::level_entries(1);
        assert_eq!(idx[base + layout::offset("00")], 10);
        assert_eq!(idx[base + layout::offset("01")], 20);
        assert_eq!(idx[base + layout::offset("0")], 30);

        // Deep bucket array: suffix "00" of "0000", plus its rollup
        let idx = read_idx(&dir.path().join("sat-t00.idx"));
        assert_eq!(idx.len(), 26);
        assert_eq!(idx[base + layout::offset("00")], 5);
        assert_eq!(idx[base + layout::offset("0")], 5);

        // Manifests
        let lst = std::fs::read_to_string(dir.path().join("sat-t.lst")).unwrap();
        assert_eq!(lst, "sat/00t.png\nsat/01t.png\n");
        let lst = std::fs::read_to_string(dir.path().join("sat-t00.lst")).unwrap();
        assert_eq!(lst, "sat/000/0t.png\n");
    }

    #[test]
    fn test_write_all_rerun_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let set = build_set(&[("00", 10), ("0000", 5)], 4, 2);
        let writer = IndexWriter::new("sat", dir.path());

        writer.write_all(&set).unwrap();
        let first = std::fs::read(dir.path().join("sat-t.idx")).unwrap();
        writer.write_all(&set).unwrap();
        let second = std::fs::read(dir.path().join("sat-t.idx")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_manifest_grouped_by_depth_then_sorted() {
        // Depth 1 tiles precede depth 2 tiles even when lexicographically larger
        let set = build_set(&[("3", 1), ("00", 2), ("21", 3)], 2, 2);
        let root = set.get("").unwrap();
        let (_, lines) = fill_bucket(root, "sat").unwrap();
        assert_eq!(lines, vec!["sat/3t.png", "sat/00t.png", "sat/21t.png"]);
    }
}
