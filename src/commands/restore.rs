//! `gbp-helper restore`
//!
//! Replaces the repository with its newest backup. Needs no config file and
//! finds the repository by its `.git` entry rather than by asking git, so a
//! repository whose `.git` was left broken by a failed command can still be
//! restored.

use crate::backup;
use crate::context::{BuildPaths, repo_dir_name};
use crate::error::{HelperError, Result};
use crate::git;
use crate::lock;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub fn cmd_restore(path: &Path, safemode: bool) -> Result<()> {
    restore_latest(path, &std::env::temp_dir(), safemode)
}

/// Restore the newest backup of the repository containing `path`.
pub fn restore_latest(path: &Path, tmp_root: &Path, safemode: bool) -> Result<()> {
    let repo_root = find_repo_root(path)?;
    let repo_name = repo_dir_name(&repo_root)?;
    let paths = BuildPaths::new(tmp_root, &repo_root, &repo_name, &repo_name);

    let _lock = lock::acquire(&paths.lock_file, "restore", safemode)?;

    let backups = backup::list(&paths.backup_dir)?;
    debug!("available backups (newest first):");
    for b in &backups {
        debug!("  {} ({})", b.name, b.command);
    }

    let latest = backup::latest(&paths.backup_dir)?;
    info!("restoring backup '{}' taken before '{}'", latest.name, latest.command);
    backup::restore(&repo_root, &latest, safemode)?;
    if !safemode {
        verify_branches(&repo_root, &latest)?;
    }
    info!("repository restored");
    Ok(())
}

/// Nearest directory at or above `path` holding a `.git` entry.
fn find_repo_root(path: &Path) -> Result<PathBuf> {
    let not_a_repo = || HelperError::NotAGitRepo {
        path: path.to_path_buf(),
    };
    let start = path.canonicalize().map_err(|_| not_a_repo())?;
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
        .ok_or_else(not_a_repo)
}

/// Compare branch heads against the manifest stored with the backup.
fn verify_branches(repo_root: &Path, restored: &backup::Backup) -> Result<()> {
    let Some(manifest) = restored.manifest()? else {
        return Ok(());
    };
    for (branch, commit) in &manifest.branches {
        match git::branch_head(repo_root, branch) {
            Ok(head) if &head == commit => {}
            Ok(head) => warn!(
                "branch '{}' is at {} after restore, backup recorded {}",
                branch, head, commit
            ),
            Err(_) => warn!("branch '{}' is missing after restore", branch),
        }
    }
    Ok(())
}
