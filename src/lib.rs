//! Quadtree Bucket Indexer
//!
//! Converts a flat table of `(quadkey, byte-size)` records describing a
//! map-tile pyramid into compact, bounded-size binary index files plus
//! companion tile-path manifests. Each output bucket covers one contiguous
//! depth range of the global quadtree and is loadable on its own.
//!
//! # Architecture
//!
//! - **Quadkey**: sentinel-bit integer codec for quadtree path strings
//! - **Index**: size table loading, bucket partitioning, size aggregation
//!   and flat-array layout
//! - **I/O**: index array, manifest and bucket list emission
//! - **Missing / Compress**: coverage-gap reporting and artifact compression
//!
//! # Usage
//!
//! ```no_run
//! use quadbucket::{run_build, Config};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::from_file(&"job.yaml".into())?;
//!     run_build(&config)?;
//!     Ok(())
//! }
//! ```

pub mod compress;
pub mod config;
pub mod index;
pub mod io;
pub mod missing;
pub mod quadkey;

pub use config::Config;
pub use index::{Bucket, BucketSet, SizeTable};
pub use io::{IndexWriter, WriteStats};

use anyhow::Result;

/// Run a full two-tier index build with the given configuration.
///
/// Loads the size table (stdin unless `config.input` is set), partitions it
/// into buckets, aggregates subtree sizes, and writes every output file.
/// Any failure aborts the run; reruns fully rewrite the output set.
pub fn run_build(config: &Config) -> Result<WriteStats> {
    config.validate()?;

    tracing::info!(
        "Building index for series {:?} (max_level={}, idx_step={})",
        config.series,
        config.max_level,
        config.idx_step
    );

    let sizes = load_sizes(config)?;

    let mut buckets = BucketSet::partition(&sizes, config.max_level, config.idx_step)?;
    buckets.aggregate()?;

    let writer = IndexWriter::new(&config.series, &config.output_dir);
    let stats = writer.write_all(&buckets)?;

    tracing::info!("Build complete: {}", stats);

    Ok(stats)
}

/// Run a build with the historical idxStep-aligned partitioning scheme,
/// writing bucket names to `out`.
pub fn run_aligned_build(config: &Config, out: &mut impl std::io::Write) -> Result<()> {
    config.validate()?;

    tracing::info!(
        "Building aligned index for series {:?} (max_level={}, idx_step={})",
        config.series,
        config.max_level,
        config.idx_step
    );

    let sizes = load_sizes(config)?;

    index::aligned::build(
        &sizes,
        &config.series,
        config.max_level,
        config.idx_step,
        &config.output_dir,
        out,
    )
}

/// Partition and aggregate without writing anything; used by dry-run
/// analysis.
pub fn build_buckets(config: &Config) -> Result<BucketSet> {
    config.validate()?;
    let sizes = load_sizes(config)?;
    let mut buckets = BucketSet::partition(&sizes, config.max_level, config.idx_step)?;
    buckets.aggregate()?;
    Ok(buckets)
}

fn load_sizes(config: &Config) -> Result<SizeTable> {
    match &config.input {
        Some(path) => index::load_path(path),
        None => index::load(std::io::stdin().lock()),
    }
}
