//! `gbp-helper clone`
//!
//! Clones a source repository and sets up the three packaging branches:
//! upstream and debian start out empty, and the release branch gets an
//! example config naming the chosen branches.

use super::config_cmd::write_example;
use crate::config::types::default_for;
use crate::error::{HelperError, Result};
use crate::git;
use crate::ui;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

const DEFAULT_SOURCE_BRANCH: &str = "master";

/// Branch names chosen for the new repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchNames {
    pub release: String,
    pub upstream: String,
    pub debian: String,
}

impl BranchNames {
    /// Ask for each name, offering the config defaults.
    pub fn prompt() -> Result<Self> {
        let ask = |label: &str, key: &str| ui::prompt_input(label, default_for(key));
        Ok(Self {
            release: ask("Release branch", "releaseBranch")?,
            upstream: ask("Upstream branch", "upstreamBranch")?,
            debian: ask("Debian branch", "debianBranch")?,
        })
    }

    /// Config values written to the release branch.
    pub fn presets(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("releaseBranch".to_string(), self.release.clone()),
            ("upstreamBranch".to_string(), self.upstream.clone()),
            ("debianBranch".to_string(), self.debian.clone()),
        ])
    }
}

impl Default for BranchNames {
    fn default() -> Self {
        let name = |key: &str| default_for(key).unwrap_or_default().to_string();
        Self {
            release: name("releaseBranch"),
            upstream: name("upstreamBranch"),
            debian: name("debianBranch"),
        }
    }
}

pub fn cmd_clone(cwd: &Path, config_path: &Path, safemode: bool) -> Result<()> {
    let url = ui::prompt_input("Repository URL", None)?;
    let source = ui::prompt_input("Source branch", Some(DEFAULT_SOURCE_BRANCH))?;
    let names = BranchNames::prompt()?;

    let repo = clone_repo(cwd, &url, &source, safemode)?;
    if safemode {
        info!("[safemode] skipping: branch setup in '{}'", repo.display());
        return Ok(());
    }
    init_branches(&repo, &names, &source, config_path, false)?;
    info!("repository '{}' is ready for packaging", repo.display());
    Ok(())
}

/// Clone `url` into `<cwd>/<name from url>`.
pub fn clone_repo(cwd: &Path, url: &str, branch: &str, safemode: bool) -> Result<PathBuf> {
    let name = git::repo_name_from_url(url)
        .ok_or_else(|| HelperError::user(format!("cannot derive a directory name from '{}'", url)))?;
    let dest = cwd.join(name);
    if dest.exists() {
        return Err(HelperError::user(format!(
            "'{}' already exists, aborting clone",
            dest.display()
        )));
    }

    info!("cloning '{}' (branch '{}') into '{}'", url, branch, dest.display());
    git::clone(cwd, safemode, url, branch, &dest)?;
    Ok(dest)
}

/// Create and seed the packaging branches in a fresh clone.
///
/// Branches other than `source` are created from it. upstream and debian
/// are emptied; the release branch gets the example config.
pub fn init_branches(
    repo: &Path,
    names: &BranchNames,
    source: &str,
    config_path: &Path,
    safemode: bool,
) -> Result<()> {
    for branch in [&names.release, &names.upstream, &names.debian] {
        if branch != source && !git::branch_exists(repo, branch) {
            info!("creating branch '{}'", branch);
            git::create_branch(repo, safemode, branch)?;
        }
    }

    for (branch, message) in [
        (&names.upstream, "Initial upstream commit."),
        (&names.debian, "Initial debian commit."),
    ] {
        info!("emptying branch '{}'", branch);
        git::switch_branch(repo, branch)?;
        git::remove_all_files(repo, safemode)?;
        git::commit_all(repo, safemode, message)?;
    }

    git::switch_branch(repo, &names.release)?;
    let title = crate::context::repo_dir_name(repo)?;
    write_example(repo, config_path, &title, &names.presets(), safemode)?;
    git::commit_all(repo, safemode, "Initial release commit.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, DEFAULT_CONFIG_PATH};
    use crate::test_support::{create_test_repo, git};
    use tempfile::TempDir;

    fn names(release: &str, upstream: &str, debian: &str) -> BranchNames {
        BranchNames {
            release: release.to_string(),
            upstream: upstream.to_string(),
            debian: debian.to_string(),
        }
    }

    #[test]
    fn test_default_names() {
        assert_eq!(BranchNames::default(), names("master", "upstream", "debian"));
    }

    #[test]
    fn test_init_branches() {
        let repo = create_test_repo();
        init_branches(
            repo.path(),
            &BranchNames::default(),
            "master",
            Path::new(DEFAULT_CONFIG_PATH),
            false,
        )
        .unwrap();

        assert_eq!(git(repo.path(), &["rev-parse", "--abbrev-ref", "HEAD"]), "master");
        assert!(git(repo.path(), &["ls-tree", "-r", "--name-only", "upstream"]).is_empty());
        assert!(git(repo.path(), &["ls-tree", "-r", "--name-only", "debian"]).is_empty());
        assert_eq!(
            git(repo.path(), &["log", "-1", "--format=%s", "upstream"]),
            "Initial upstream commit."
        );

        let files = git(repo.path(), &["ls-tree", "-r", "--name-only", "master"]);
        assert!(files.contains("README.md"));
        assert!(files.contains(DEFAULT_CONFIG_PATH));
        assert!(git::is_clean(repo.path()).unwrap());
    }

    #[test]
    fn test_init_branches_writes_chosen_names() {
        let repo = create_test_repo();
        init_branches(
            repo.path(),
            &names("release", "orig", "pkg"),
            "master",
            Path::new(DEFAULT_CONFIG_PATH),
            false,
        )
        .unwrap();

        assert_eq!(git(repo.path(), &["rev-parse", "--abbrev-ref", "HEAD"]), "release");
        let config = Config::load(repo.path().join(DEFAULT_CONFIG_PATH)).unwrap();
        assert_eq!(config.release_branch, "release");
        assert_eq!(config.upstream_branch, "orig");
        assert_eq!(config.debian_branch, "pkg");
        assert!(git::branch_exists(repo.path(), "master"));
    }

    #[test]
    fn test_clone_into_named_directory() {
        let source = create_test_repo();
        let work = TempDir::new().unwrap();
        let url = source.path().to_string_lossy().to_string();

        let dest = clone_repo(work.path(), &url, "master", false).unwrap();

        assert_eq!(dest, work.path().join("hello"));
        assert!(dest.join("README.md").exists());

        let err = clone_repo(work.path(), &url, "master", false).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_clone_in_safemode() {
        let source = create_test_repo();
        let work = TempDir::new().unwrap();
        let url = source.path().to_string_lossy().to_string();

        let dest = clone_repo(work.path(), &url, "master", true).unwrap();
        assert!(!dest.exists());
    }
}
