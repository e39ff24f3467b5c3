//! Per-repository invocation lock.
//!
//! A lock file under the repository's tmp dir is created with `create_new`
//! semantics, so only one gbp-helper invocation can work on a repository at
//! a time. The file holds JSON metadata naming the owner. The lock is
//! released when the [`LockGuard`] is dropped.

use crate::error::{HelperError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Metadata stored in the lock file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockMetadata {
    /// `user@host`
    pub owner: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    pub created_at: DateTime<Utc>,

    /// The command holding the lock.
    pub command: String,
}

impl LockMetadata {
    pub fn new(command: &str) -> Self {
        Self {
            owner: actor(),
            pid: Some(std::process::id()),
            created_at: Utc::now(),
            command: command.to_string(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            HelperError::Lock(format!(
                "failed to parse lock file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Age in whole minutes.
    pub fn age_minutes(&self) -> i64 {
        Utc::now().signed_duration_since(self.created_at).num_minutes()
    }
}

/// RAII guard for the lock file.
///
/// In safemode no file is created and dropping the guard does nothing.
#[derive(Debug)]
pub struct LockGuard {
    path: Option<PathBuf>,
}

impl LockGuard {
    /// Path of the held lock file, `None` in safemode.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some(path) = self.path.take()
            && let Err(e) = fs::remove_file(&path)
        {
            warn!("failed to release lock '{}': {}", path.display(), e);
        }
    }
}

/// Acquire the lock at `lock_path` for `command`.
///
/// # Returns
///
/// * `Ok(LockGuard)` - Lock held until the guard is dropped
/// * `Err(HelperError::Lock)` - Another invocation holds the lock (exit code 5)
pub fn acquire(lock_path: &Path, command: &str, safemode: bool) -> Result<LockGuard> {
    if safemode {
        info!("[safemode] skipping: lock '{}'", lock_path.display());
        return Ok(LockGuard { path: None });
    }

    if let Some(parent) = lock_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            HelperError::Lock(format!(
                "failed to create lock directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(lock_path)
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                let holder = match LockMetadata::from_file(lock_path) {
                    Ok(meta) => format!(
                        " by {} running '{}' for {}m",
                        meta.owner,
                        meta.command,
                        meta.age_minutes()
                    ),
                    Err(_) => String::new(),
                };
                HelperError::Lock(format!(
                    "repository is locked{}.\nLock: {}\nRemove the lock file if no other gbp-helper is running.",
                    holder,
                    lock_path.display()
                ))
            } else {
                HelperError::Lock(format!(
                    "failed to acquire lock '{}': {}",
                    lock_path.display(),
                    e
                ))
            }
        })?;

    let json = serde_json::to_string_pretty(&LockMetadata::new(command))
        .map_err(|e| HelperError::Lock(format!("failed to serialize lock metadata: {}", e)))?;
    if let Err(e) = file.write_all(json.as_bytes()) {
        let _ = fs::remove_file(lock_path);
        return Err(HelperError::Lock(format!(
            "failed to write lock metadata: {}",
            e
        )));
    }

    debug!("acquired lock '{}'", lock_path.display());
    Ok(LockGuard {
        path: Some(lock_path.to_path_buf()),
    })
}

/// `user@host` for the current process.
pub fn actor() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}
