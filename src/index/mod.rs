//! Bucket partitioning, aggregation and flat-array layout.

pub mod aligned;
mod bucket;
pub mod layout;
mod size_table;

pub use bucket::{Bucket, BucketSet};
pub use size_table::{load, load_path, SizeTable};
