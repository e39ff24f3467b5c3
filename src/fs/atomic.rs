//! Atomic file writes.
//!
//! Content is written to `.{filename}.tmp` next to the target, synced, and
//! then moved into place. [`atomic_write`] replaces an existing target with
//! `rename()`. [`atomic_create`] links the temp file to the target instead,
//! which fails if the target already exists, so existing files are never
//! clobbered.

use crate::error::{HelperError, Result};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Atomically write `content` to `path`, replacing any existing file.
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let temp_path = prepare_temp(path, content)?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        HelperError::user(format!(
            "failed to atomically replace '{}': {}",
            path.display(),
            e
        ))
    })?;

    sync_parent(path);
    Ok(())
}

/// Atomically create `path` with `content`.
///
/// # Returns
///
/// * `Ok(true)` - The file was created
/// * `Ok(false)` - `path` already exists and was left untouched
pub fn atomic_create<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<bool> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(false);
    }

    let temp_path = prepare_temp(path, content)?;
    let linked = fs::hard_link(&temp_path, path);
    let _ = fs::remove_file(&temp_path);

    match linked {
        Ok(()) => {
            sync_parent(path);
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(HelperError::user(format!(
            "failed to create '{}': {}",
            path.display(),
            e
        ))),
    }
}

/// Create the parent dir and write a synced temp file beside `target`.
fn prepare_temp(target: &Path, content: &[u8]) -> Result<PathBuf> {
    if let Some(parent) = target.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            HelperError::user(format!(
                "failed to create parent directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_path = temp_path_for(target)?;
    write_and_sync(&temp_path, content)?;
    Ok(temp_path)
}

fn temp_path_for(target: &Path) -> Result<PathBuf> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| HelperError::user(format!("invalid file path '{}'", target.display())))?;

    Ok(parent.join(format!(".{}.tmp", filename)))
}

fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| {
        HelperError::user(format!(
            "failed to create temporary file '{}': {}",
            path.display(),
            e
        ))
    })?;

    file.write_all(content)
        .and_then(|_| file.sync_all())
        .map_err(|e| {
            let _ = fs::remove_file(path);
            HelperError::user(format!("failed to write temporary file: {}", e))
        })
}

// Persist the directory entry as well.
fn sync_parent(target: &Path) {
    if let Some(parent) = target.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_replace_existing() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.txt");
        fs::write(&file_path, "original content").unwrap();

        atomic_write(&file_path, b"new content").unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "new content");
        assert!(!temp_dir.path().join(".test.txt.tmp").exists());
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("nested").join("dirs").join("test.json");

        atomic_write(&file_path, b"{}").unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "{}");
    }

    #[test]
    fn test_atomic_create_new_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("gbp-helper.conf");

        assert!(atomic_create(&file_path, b"releaseBranch=master\n").unwrap());
        assert_eq!(
            fs::read_to_string(&file_path).unwrap(),
            "releaseBranch=master\n"
        );
        assert!(!temp_dir.path().join(".gbp-helper.conf.tmp").exists());
    }

    #[test]
    fn test_atomic_create_never_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("gbp-helper.conf");
        fs::write(&file_path, "mine").unwrap();

        assert!(!atomic_create(&file_path, b"theirs").unwrap());
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "mine");
    }

    #[test]
    fn test_temp_path_is_hidden_sibling() {
        let temp = temp_path_for(Path::new("/some/path/file.txt")).unwrap();
        assert_eq!(temp, PathBuf::from("/some/path/.file.txt.tmp"));
    }
}
