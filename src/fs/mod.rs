//! Filesystem helpers for gbp-helper.
//!
//! Directory operations used for the tarball work dir, build dirs and backup
//! restore. Every helper that deletes or creates takes a `safemode` flag and
//! only logs when it is set.

pub mod atomic;

pub use atomic::{atomic_create, atomic_write};

use crate::error::{HelperError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Create `dir` and all missing parents.
pub fn mkdirs(dir: &Path, safemode: bool) -> Result<()> {
    if safemode {
        info!("[safemode] skipping: create directory '{}'", dir.display());
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|e| {
        HelperError::user(format!(
            "failed to create directory '{}': {}",
            dir.display(),
            e
        ))
    })
}

/// Remove `dir` recursively. A missing dir is not an error.
pub fn remove_dir(dir: &Path, safemode: bool) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    if safemode {
        info!("[safemode] skipping: remove directory '{}'", dir.display());
        return Ok(());
    }
    debug!("removing directory '{}'", dir.display());
    fs::remove_dir_all(dir).map_err(|e| {
        HelperError::user(format!(
            "failed to remove directory '{}': {}",
            dir.display(),
            e
        ))
    })
}

/// Make `dir` an empty directory, creating it if needed.
pub fn clean_dir(dir: &Path, safemode: bool) -> Result<()> {
    remove_dir(dir, safemode)?;
    mkdirs(dir, safemode)
}

/// Delete everything inside `dir` but keep the dir itself.
pub fn clear_dir_contents(dir: &Path, safemode: bool) -> Result<()> {
    if safemode {
        info!("[safemode] skipping: clear directory '{}'", dir.display());
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() && !path.is_symlink() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// Files under `dir` (recursively) whose name ends with `suffix`, sorted by path.
pub fn files_with_suffix(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    if dir.is_dir() {
        collect_with_suffix(dir, suffix, &mut found)?;
    }
    found.sort();
    Ok(found)
}

fn collect_with_suffix(dir: &Path, suffix: &str, found: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_with_suffix(&path, suffix, found)?;
        } else if path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().ends_with(suffix))
        {
            found.push(path);
        }
    }
    Ok(())
}
