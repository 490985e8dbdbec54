//! Index file, manifest and bucket list emission.

mod index_writer;
pub mod manifest;

pub use index_writer::{fill_bucket, IndexWriter, WriteStats};
