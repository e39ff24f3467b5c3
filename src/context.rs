//! Repository context resolution for gbp-helper.
//!
//! Finds the git repository root for the path given on the command line,
//! loads its config, and derives the [`BuildPaths`] every command works with.
//! The context is built once per invocation and passed by reference.

use crate::config::Config;
use crate::error::{HelperError, Result};
use crate::git;
use std::path::{Path, PathBuf};

/// Name of the lock file inside the per-repository tmp dir.
pub const LOCK_FILE_NAME: &str = "gbp-helper.lock";

/// Subdirectory of the tmp root holding per-repository state.
const STATE_DIR_NAME: &str = "gbp-helper";

/// Subdirectory of the per-repository state dir for commit-release scratch files.
const WORK_DIR_NAME: &str = "work";

/// Derived, process-local paths. Nothing here is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPaths {
    /// `<tmp>/gbp-helper/<repo-dir>/work/<package>`, wiped by commit-release.
    pub tmp_dir: PathBuf,
    /// `<tmp dir>/tarball`, the commit-release work dir.
    pub tarball_dir: PathBuf,
    /// `<tmp>/gbp-helper/<repo-dir>/backup`
    pub backup_dir: PathBuf,
    /// `<repo>/../build-area/<package>`
    pub build_dir: PathBuf,
    /// `<tmp>/gbp-helper/<repo-dir>/gbp-helper.lock`
    pub lock_file: PathBuf,
}

impl BuildPaths {
    /// Compute paths for a repository.
    ///
    /// `tmp_root` is normally the system temp dir.
    pub fn new(tmp_root: &Path, repo_root: &Path, repo_name: &str, package: &str) -> Self {
        let repo_tmp = tmp_root.join(STATE_DIR_NAME).join(repo_name);
        let tmp_dir = repo_tmp.join(WORK_DIR_NAME).join(package);
        let build_area = repo_root
            .parent()
            .map(|p| p.join("build-area"))
            .unwrap_or_else(|| repo_root.join("build-area"));

        Self {
            tarball_dir: tmp_dir.join("tarball"),
            tmp_dir,
            backup_dir: repo_tmp.join("backup"),
            build_dir: build_area.join(package),
            lock_file: repo_tmp.join(LOCK_FILE_NAME),
        }
    }

    /// Build dir for one Debian version, `<build dir>/<version>`.
    pub fn version_build_dir(&self, version: &str) -> PathBuf {
        self.build_dir.join(version)
    }

    /// Path of the upstream tarball, `<tarball dir>/<package>_<version>.orig.tar.gz`.
    pub fn tarball_path(&self, package: &str, version: &str) -> PathBuf {
        self.tarball_dir
            .join(format!("{}_{}.orig.tar.gz", package, version))
    }
}

/// Everything a repository command needs, resolved up front.
#[derive(Debug, Clone)]
pub struct RepoContext {
    /// Absolute repository root (`git rev-parse --show-toplevel`).
    pub repo_root: PathBuf,
    /// Repository directory name.
    pub repo_name: String,
    /// Source package name (config `packageName` or the repository name).
    pub package: String,
    pub config: Config,
    pub paths: BuildPaths,
    /// Skip every write when set.
    pub safemode: bool,
}

impl RepoContext {
    /// Resolve the context for `path` using the system temp dir.
    ///
    /// # Returns
    ///
    /// * `Ok(RepoContext)` - Repository found and config loaded
    /// * `Err(HelperError::NotAGitRepo)` - `path` is not inside a git repository
    /// * `Err(HelperError::Config)` - The config file is missing or invalid
    pub fn resolve(path: &Path, config_path: &Path, safemode: bool) -> Result<Self> {
        Self::resolve_with_tmp(path, config_path, &std::env::temp_dir(), safemode)
    }

    /// Resolve the context with an explicit tmp root.
    pub fn resolve_with_tmp(
        path: &Path,
        config_path: &Path,
        tmp_root: &Path,
        safemode: bool,
    ) -> Result<Self> {
        let repo_root = git::repo_root(path)?;
        let config = Config::load_for_repo(&repo_root, config_path)?;
        Self::from_parts(repo_root, config, tmp_root, safemode)
    }

    /// Build a context from an already loaded config.
    pub fn from_parts(
        repo_root: PathBuf,
        config: Config,
        tmp_root: &Path,
        safemode: bool,
    ) -> Result<Self> {
        let repo_name = repo_dir_name(&repo_root)?;
        let package = config.package_name_or(&repo_name).to_string();
        let paths = BuildPaths::new(tmp_root, &repo_root, &repo_name, &package);

        Ok(Self {
            repo_root,
            repo_name,
            package,
            config,
            paths,
            safemode,
        })
    }
}

/// Final path component of the repository root.
pub fn repo_dir_name(repo_root: &Path) -> Result<String> {
    repo_root
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| {
            HelperError::user(format!(
                "cannot derive a repository name from '{}'",
                repo_root.display()
            ))
        })
}
