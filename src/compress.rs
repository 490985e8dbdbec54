//! Whole-file zlib compression for published tile-set artifacts.
//!
//! Output uses the Qt `qCompress` container the tile viewer consumes: a
//! 4-byte big-endian uncompressed length followed by a raw zlib stream. The
//! compressed sibling gets a single `z` appended to the file name.

use anyhow::{Context, Result};
use byteorder::{BigEndian, WriteBytesExt};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Compress one file in memory and write `<file>z` next to it.
/// Returns the path of the compressed sibling.
pub fn compress_file(path: &Path) -> Result<PathBuf> {
    let data = std::fs::read(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let compressed = compress_bytes(&data)?;

    let mut name = path.as_os_str().to_os_string();
    name.push("z");
    let dest = PathBuf::from(name);

    std::fs::write(&dest, &compressed)
        .with_context(|| format!("failed to write {}", dest.display()))?;

    tracing::info!(
        "Compressed {} ({} -> {} bytes)",
        path.display(),
        data.len(),
        compressed.len()
    );

    Ok(dest)
}

/// Compress a buffer at maximum ratio into the length-prefixed container.
pub fn compress_bytes(data: &[u8]) -> Result<Vec<u8>> {
    let len = u32::try_from(data.len()).context("file exceeds u32 length prefix")?;

    let mut out = Vec::with_capacity(data.len() / 2 + 8);
    out.write_u32::<BigEndian>(len)?;

    let mut encoder = ZlibEncoder::new(out, Compression::best());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}
