//! Load the tile size table from a stream of `"<size> <quadkey>"` records.

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

/// Mapping from quadkey to tile size in bytes.
pub type SizeTable = HashMap<String, u32>;

/// Read size records until end of stream.
///
/// Each line must hold exactly two space-separated fields, `<size>` and
/// `<quadkey>`; anything else is a fatal parse error. Duplicate quadkeys are
/// last-write-wins.
pub fn load(reader: impl BufRead) -> Result<SizeTable> {
    let mut sizes = SizeTable::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read size record at line {}", idx + 1))?;

        let mut fields = line.split(' ');
        let (size, key) = match (fields.next(), fields.next(), fields.next()) {
            (Some(size), Some(key), None) => (size, key),
            _ => bail!(
                "line {}: expected \"<size> <quadkey>\", got {:?}",
                idx + 1,
                line
            ),
        };

        let size: u32 = size
            .parse()
            .with_context(|| format!("line {}: invalid size {:?}", idx + 1, size))?;

        sizes.insert(key.to_string(), size);
    }

    tracing::info!("Loaded {} tile size records", sizes.len());

    Ok(sizes)
}

/// Load size records from a file.
pub fn load_path(path: &Path) -> Result<SizeTable> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open size table: {}", path.display()))?;
    load(std::io::BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_basic() {
        let input = "10 00\n20 01\n5 0000\n";
        let sizes = load(input.as_bytes()).unwrap();
        assert_eq!(sizes.len(), 3);
        assert_eq!(sizes["00"], 10);
        assert_eq!(sizes["01"], 20);
        assert_eq!(sizes["0000"], 5);
    }

    #[test]
    fn test_load_last_write_wins() {
        let input = "10 00\n99 00\n";
        let sizes = load(input.as_bytes()).unwrap();
        assert_eq!(sizes.len(), 1);
        assert_eq!(sizes["00"], 99);
    }

    #[test]
    fn test_load_empty_stream() {
        let sizes = load("".as_bytes()).unwrap();
        assert!(sizes.is_empty());
    }

    #[test]
    fn test_load_missing_field_fails() {
        assert!(load("10\n".as_bytes()).is_err());
        assert!(load("\n".as_bytes()).is_err());
    }

    #[test]
    fn test_load_extra_field_fails() {
        assert!(load("10 00 extra\n".as_bytes()).is_err());
    }

    #[test]
    fn test_load_bad_size_fails() {
        assert!(load("ten 00\n".as_bytes()).is_err());
        assert!(load("-1 00\n".as_bytes()).is_err());
    }

    #[test]
    fn test_load_error_names_line() {
        let err = load("10 00\nbroken\n".as_bytes()).unwrap_err();
        assert!(format!("{}", err).contains("line 2"));
    }
}
