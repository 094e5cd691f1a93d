use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::Result;

/// Write content to a file atomically using a temp file in the same
/// directory, fsync, then rename over `path`.
///
/// Concurrent writers race on the rename; the last one wins.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_roundtrip() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("chain_state.json");

        atomic_write(&file, b"hello world").unwrap();
        assert_eq!(fs::read(&file).unwrap(), b"hello world");
    }

    #[test]
    fn test_atomic_write_creates_parent() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join(".forge").join("nested").join("state.json");

        atomic_write(&file, b"{}").unwrap();
        assert!(file.exists());
    }

    #[test]
    fn test_atomic_write_replaces_and_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("state.json");

        atomic_write(&file, b"first").unwrap();
        atomic_write(&file, b"second").unwrap();
        assert_eq!(fs::read(&file).unwrap(), b"second");

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1, "temp file should be renamed, not left behind");
    }
}
