//! Render quadkeys as on-disk tile paths.

/// Filename suffix appended to the final path segment of every tile.
pub const TILE_FILE_SUFFIX: &str = "t.png";

/// Build the tile path for a full quadkey: the series name followed by
/// successive 3-character slices of the key as path segments, with
/// [`TILE_FILE_SUFFIX`] appended to the last one.
///
/// `tile_path("sat", "0123")` is `"sat/012/3t.png"`.
pub fn tile_path(series: &str, quadkey: &str) -> String {
    let mut path = String::with_capacity(series.len() + quadkey.len() * 2 + TILE_FILE_SUFFIX.len());
    path.push_str(series);
    let mut rest = quadkey;
    while !rest.is_empty() {
        let (segment, tail) = rest.split_at(rest.len().min(3));
        path.push('/');
        path.push_str(segment);
        rest = tail;
    }
    path.push_str(TILE_FILE_SUFFIX);
    path
}
