//! Utility functions for Cadence.
//!
//! File helpers shared by the file-backed stores, the catalog, and config.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{CadenceError, Result};

/// Maximum size of a catalog or config file read into memory (10 MB).
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10 MB

/// Maximum size of a learner's record log read into memory (256 MB).
///
/// A record is a few hundred bytes, so this holds several hundred thousand
/// reviews.
pub const MAX_RECORD_LOG_SIZE: u64 = 256 * 1024 * 1024; // 256 MB

/// Read a file into a string, refusing files over `MAX_FILE_SIZE`.
pub fn read_to_string_limited(path: &Path) -> Result<String> {
    read_to_string_with_limit(path, MAX_FILE_SIZE)
}

/// Read a file into a string with a custom size limit.
///
/// # Errors
///
/// Returns an error if:
/// * The file cannot be read (doesn't exist, permission denied, etc.)
/// * The file exceeds `max_size`
pub fn read_to_string_with_limit(path: &Path, max_size: u64) -> Result<String> {
    let metadata = fs::metadata(path).map_err(|e| CadenceError::storage(path, e))?;

    let size = metadata.len();
    if size > max_size {
        return Err(CadenceError::store(format!(
            "File {} is too large ({} bytes, max {} bytes)",
            path.display(),
            size,
            max_size
        )));
    }

    fs::read_to_string(path).map_err(|e| CadenceError::storage(path, e))
}

/// Temp path used while atomically replacing `path`.
fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}

/// Replace the contents of `path` atomically via temp file + rename.
///
/// Creates the parent directory when missing.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| CadenceError::storage(parent, e))?;
    }

    let temp_path = temp_path_for(path);
    {
        let mut file =
            fs::File::create(&temp_path).map_err(|e| CadenceError::storage(&temp_path, e))?;
        file.write_all(contents)
            .map_err(|e| CadenceError::storage(&temp_path, e))?;
        file.sync_all()
            .map_err(|e| CadenceError::storage(&temp_path, e))?;
    }

    // Rename is atomic on POSIX
    fs::rename(&temp_path, path).map_err(|e| CadenceError::storage(path, e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_to_string_limited_success() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("test.txt");
        fs::write(&path, "Hello, world!").unwrap();

        let content = read_to_string_limited(&path).unwrap();
        assert_eq!(content, "Hello, world!");
    }

    #[test]
    fn test_read_to_string_limited_nonexistent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nonexistent.txt");

        let err = read_to_string_limited(&path).unwrap_err();
        assert!(matches!(err, CadenceError::Storage { .. }));
        assert!(err.to_string().contains("nonexistent.txt"));
    }

    #[test]
    fn test_read_to_string_with_limit_at_boundary() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("boundary.txt");
        fs::write(&path, "x".repeat(100)).unwrap();

        assert!(read_to_string_with_limit(&path, 100).is_ok());

        let err = read_to_string_with_limit(&path, 99).unwrap_err().to_string();
        assert!(err.contains("too large"));
        assert!(err.contains("100 bytes"));
        assert!(err.contains("max 99 bytes"));
    }

    #[test]
    fn test_atomic_write_creates_parent_and_replaces() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("decks.json");

        atomic_write(&path, b"first").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "first");

        atomic_write(&path, b"second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");

        // No temp file left behind
        assert!(!temp_path_for(&path).exists());
    }
}
