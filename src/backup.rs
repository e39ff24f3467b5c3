//! Repository snapshots.
//!
//! Before a mutating command runs, the whole repository directory (including
//! `.git`) is archived to `<backup dir>/<command>_<timestamp>.bak.tar.gz` with
//! the external `tar`. A JSON manifest next to the archive records who took
//! the snapshot and the branch heads and tags at that moment. Restoring
//! empties the repository directory and extracts the archive over it.
//! Only the newest [`BACKUPS_KEPT`] backups are kept.

use crate::error::{HelperError, Result};
use crate::fs::{atomic_write, clear_dir_contents, files_with_suffix, mkdirs};
use crate::process::run_cmd;
use crate::{git, lock};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File suffix of backup archives.
pub const BACKUP_EXT: &str = ".bak.tar.gz";

const MANIFEST_EXT: &str = ".manifest.json";

/// Number of backups left in the backup dir after a new one is created.
pub const BACKUPS_KEPT: usize = 10;

/// Timestamp format used in backup names; sorts lexically.
const NAME_TIME_FORMAT: &str = "%Y-%m-%d-%H-%M-%S-%3f";

/// Repository state recorded alongside a backup archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupManifest {
    pub command: String,
    pub created: DateTime<Utc>,
    /// `user@host`
    pub actor: String,
    /// Branch name to commit id.
    pub branches: BTreeMap<String, String>,
    pub tags: Vec<String>,
}

impl BackupManifest {
    /// Capture the current branch heads and tags of `repo_root`.
    pub fn capture(repo_root: &Path, command: &str) -> Result<Self> {
        Ok(Self {
            command: command.to_string(),
            created: Utc::now(),
            actor: lock::actor(),
            branches: git::list_branches(repo_root)?.into_iter().collect(),
            tags: git::list_tags(repo_root)?,
        })
    }
}

/// A backup archive on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    /// File name, e.g. `commit-build_2024-01-31-12-00-00-000.bak.tar.gz`.
    pub name: String,
    pub path: PathBuf,
    /// The command the backup was taken for.
    pub command: String,
    /// Timestamp part of the name.
    pub timestamp: String,
}

impl Backup {
    /// Parse a backup from its archive path. Returns `None` for foreign files.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_string();
        let stem = name.strip_suffix(BACKUP_EXT)?;
        let (command, timestamp) = stem.rsplit_once('_')?;

        Some(Self {
            command: command.to_string(),
            timestamp: timestamp.to_string(),
            path: path.to_path_buf(),
            name,
        })
    }

    pub fn manifest_path(&self) -> PathBuf {
        let stem = self.name.trim_end_matches(BACKUP_EXT);
        self.path.with_file_name(format!("{}{}", stem, MANIFEST_EXT))
    }

    /// Read the manifest, if one was written.
    pub fn manifest(&self) -> Result<Option<BackupManifest>> {
        let path = self.manifest_path();
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        serde_json::from_str(&content).map(Some).map_err(|e| {
            HelperError::backup(format!(
                "failed to parse manifest '{}': {}",
                path.display(),
                e
            ))
        })
    }
}

/// Archive `repo_root` into `backup_dir`.
///
/// # Returns
///
/// * `Ok(Some(Backup))` - The created backup
/// * `Ok(None)` - Safemode; nothing was written
pub fn create(
    repo_root: &Path,
    backup_dir: &Path,
    command: &str,
    safemode: bool,
) -> Result<Option<Backup>> {
    let command = command.replace('_', "-");
    let name = format!(
        "{}_{}{}",
        command,
        Utc::now().format(NAME_TIME_FORMAT),
        BACKUP_EXT
    );
    let path = backup_dir.join(&name);

    if safemode {
        info!("[safemode] skipping: backup '{}'", path.display());
        return Ok(None);
    }

    info!("saving backup of repository to '{}'", path.display());
    let manifest = BackupManifest::capture(repo_root, &command)?;
    mkdirs(backup_dir, false)?;

    let archive = path.to_string_lossy();
    run_cmd(repo_root, "tar", &["-czf", &archive, "."])
        .map_err(|e| HelperError::backup(format!("could not create backup: {}", e)))?;

    let backup = Backup::from_path(&path)
        .ok_or_else(|| HelperError::backup(format!("invalid backup name '{}'", name)))?;

    let json = serde_json::to_string_pretty(&manifest)
        .map_err(|e| HelperError::backup(format!("failed to serialize manifest: {}", e)))?;
    atomic_write(backup.manifest_path(), json.as_bytes())?;

    prune(backup_dir, BACKUPS_KEPT)?;
    Ok(Some(backup))
}

/// Delete all but the `keep` newest backups and their manifests.
///
/// Returns the number of backups deleted.
pub fn prune(backup_dir: &Path, keep: usize) -> Result<usize> {
    let stale: Vec<Backup> = list(backup_dir)?.into_iter().skip(keep).collect();
    for backup in &stale {
        debug!("removing old backup '{}'", backup.name);
        std::fs::remove_file(&backup.path)?;
        let manifest = backup.manifest_path();
        if manifest.exists() {
            std::fs::remove_file(&manifest)?;
        }
    }
    if !stale.is_empty() {
        info!("removed {} old backup(s)", stale.len());
    }
    Ok(stale.len())
}

/// All backups in `backup_dir`, newest first.
pub fn list(backup_dir: &Path) -> Result<Vec<Backup>> {
    let mut backups: Vec<Backup> = files_with_suffix(backup_dir, BACKUP_EXT)?
        .iter()
        .filter_map(|p| Backup::from_path(p))
        .collect();
    backups.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(backups)
}

/// The newest backup in `backup_dir`.
pub fn latest(backup_dir: &Path) -> Result<Backup> {
    list(backup_dir)?.into_iter().next().ok_or_else(|| {
        HelperError::backup(format!(
            "no backups exist in directory '{}'",
            backup_dir.display()
        ))
    })
}

/// Replace the contents of `repo_root` with `backup`.
pub fn restore(repo_root: &Path, backup: &Backup, safemode: bool) -> Result<()> {
    if !backup.path.is_file() {
        return Err(HelperError::backup(format!(
            "backup '{}' does not exist",
            backup.path.display()
        )));
    }

    if safemode {
        info!("[safemode] skipping: restore backup '{}'", backup.name);
        return Ok(());
    }

    info!("restoring repository from backup '{}'", backup.name);
    debug!("clearing '{}'", repo_root.display());
    clear_dir_contents(repo_root, false)?;

    let archive = backup.path.to_string_lossy();
    run_cmd(repo_root, "tar", &["-xzf", &archive])
        .map_err(|e| HelperError::backup(format!("could not restore backup: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{commit_file, create_test_repo, git};

    #[test]
    fn test_backup_name_parsing() {
        let backup = Backup::from_path(Path::new(
            "/tmp/hello/backup/commit-build_2024-01-31-12-00-00-123.bak.tar.gz",
        ))
        .unwrap();
        assert_eq!(backup.command, "commit-build");
        assert_eq!(backup.timestamp, "2024-01-31-12-00-00-123");
        assert_eq!(
            backup.manifest_path(),
            PathBuf::from("/tmp/hello/backup/commit-build_2024-01-31-12-00-00-123.manifest.json")
        );

        assert!(Backup::from_path(Path::new("/tmp/notes.txt")).is_none());
        assert!(Backup::from_path(Path::new("/tmp/nounderscore.bak.tar.gz")).is_none());
    }

    #[test]
    fn test_list_newest_first() {
        let repo = create_test_repo();
        let dir = repo.tmp_root().join("backup");
        std::fs::create_dir_all(&dir).unwrap();
        for name in [
            "upload_2024-01-01-00-00-00-000.bak.tar.gz",
            "test-pkg_2024-03-01-00-00-00-000.bak.tar.gz",
            "commit-build_2024-02-01-00-00-00-000.bak.tar.gz",
            "ignored.txt",
        ] {
            std::fs::write(dir.join(name), "").unwrap();
        }

        let names: Vec<_> = list(&dir).unwrap().into_iter().map(|b| b.command).collect();
        assert_eq!(names, vec!["test-pkg", "commit-build", "upload"]);
        assert_eq!(latest(&dir).unwrap().command, "test-pkg");
    }

    #[test]
    fn test_prune_keeps_newest() {
        let repo = create_test_repo();
        let dir = repo.tmp_root().join("backup");
        std::fs::create_dir_all(&dir).unwrap();
        for month in 1..=5 {
            let stem = format!("upload_2024-{:02}-01-00-00-00-000", month);
            std::fs::write(dir.join(format!("{}{}", stem, BACKUP_EXT)), "").unwrap();
            std::fs::write(dir.join(format!("{}{}", stem, MANIFEST_EXT)), "{}").unwrap();
        }
        std::fs::write(dir.join("notes.txt"), "").unwrap();

        assert_eq!(prune(&dir, 2).unwrap(), 3);

        let left: Vec<_> = list(&dir).unwrap().into_iter().map(|b| b.timestamp).collect();
        assert_eq!(
            left,
            vec!["2024-05-01-00-00-00-000", "2024-04-01-00-00-00-000"]
        );
        assert!(!dir.join("upload_2024-01-01-00-00-00-000.manifest.json").exists());
        assert!(dir.join("upload_2024-05-01-00-00-00-000.manifest.json").exists());
        assert!(dir.join("notes.txt").exists());

        assert_eq!(prune(&dir, 2).unwrap(), 0);
        assert_eq!(prune(&repo.tmp_root().join("missing"), 2).unwrap(), 0);
    }

    #[test]
    fn test_create_prunes_old_backups() {
        let repo = create_test_repo();
        let dir = repo.tmp_root().join("hello").join("backup");
        std::fs::create_dir_all(&dir).unwrap();
        for day in 1..=BACKUPS_KEPT {
            let name = format!("upload_2000-01-{:02}-00-00-00-000{}", day, BACKUP_EXT);
            std::fs::write(dir.join(name), "").unwrap();
        }

        let backup = create(repo.path(), &dir, "upload", false).unwrap().unwrap();

        let backups = list(&dir).unwrap();
        assert_eq!(backups.len(), BACKUPS_KEPT);
        assert_eq!(backups[0], backup);
        assert!(!dir.join(format!("upload_2000-01-01-00-00-00-000{}", BACKUP_EXT)).exists());
    }

    #[test]
    fn test_latest_without_backups_fails() {
        let repo = create_test_repo();
        let err = latest(&repo.tmp_root().join("backup")).unwrap_err();
        assert!(matches!(err, HelperError::Backup(_)));
    }

    #[test]
    fn test_create_and_restore_roundtrip() {
        let repo = create_test_repo();
        git(repo.path(), &["tag", "release/1.0"]);
        let backup_dir = repo.tmp_root().join("hello").join("backup");
        let head_before = git(repo.path(), &["rev-parse", "HEAD"]);

        let backup = create(repo.path(), &backup_dir, "commit_release", false)
            .unwrap()
            .unwrap();
        assert_eq!(backup.command, "commit-release");
        assert!(backup.path.is_file());

        let manifest = backup.manifest().unwrap().unwrap();
        assert_eq!(manifest.command, "commit-release");
        assert_eq!(manifest.branches.get("master"), Some(&head_before));
        assert_eq!(manifest.tags, vec!["release/1.0"]);

        // Diverge: new commit, new tag, stray file.
        commit_file(repo.path(), "new.txt", "new\n", "Diverge");
        git(repo.path(), &["tag", "release/2.0"]);
        std::fs::write(repo.path().join("stray.txt"), "stray\n").unwrap();

        restore(repo.path(), &backup, false).unwrap();

        assert_eq!(git(repo.path(), &["rev-parse", "HEAD"]), head_before);
        assert_eq!(git(repo.path(), &["tag", "--list"]), "release/1.0");
        assert!(!repo.path().join("new.txt").exists());
        assert!(!repo.path().join("stray.txt").exists());
        assert!(git(repo.path(), &["status", "--porcelain"]).is_empty());
    }

    #[test]
    fn test_safemode_writes_nothing() {
        let repo = create_test_repo();
        let backup_dir = repo.tmp_root().join("backup");

        assert!(create(repo.path(), &backup_dir, "upload", true).unwrap().is_none());
        assert!(!backup_dir.exists());
    }

    #[test]
    fn test_restore_missing_archive_fails() {
        let repo = create_test_repo();
        let backup = Backup::from_path(
            &repo
                .tmp_root()
                .join("upload_2024-01-01-00-00-00-000.bak.tar.gz"),
        )
        .unwrap();
        let err = restore(repo.path(), &backup, false).unwrap_err();
        assert!(matches!(err, HelperError::Backup(_)));
        assert!(repo.path().join("README.md").exists());
    }
}
