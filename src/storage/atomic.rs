use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Writes `bytes` to `path` by way of a temp file in the same directory
///
/// The rename at the end is atomic on the same filesystem: readers see
/// either the old file or the complete new one. Parent directories are
/// created as needed.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut temp_file = NamedTempFile::new_in(parent)?;
    temp_file.write_all(bytes)?;
    temp_file.as_file().sync_all()?;

    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(())
}
