//! Git operations for gbp-helper.
//!
//! Thin wrappers over the `git` binary built on [`crate::process`]. Queries
//! always run. Functions that change the repository take a `safemode` flag and
//! only log what they would have done when it is set. Branch checkouts are
//! not considered writes and run in safemode too.

use crate::error::{HelperError, Result};
use crate::process::{CmdOutput, run_cmd};
use crate::version::{self, Tag};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Run a git command in `cwd`.
///
/// # Returns
///
/// * `Ok(CmdOutput)` - On exit code 0
/// * `Err(HelperError::ExternalCommandFailed)` - On non-zero exit (mapped to exit code 3)
pub fn run_git<P: AsRef<Path>>(cwd: P, args: &[&str]) -> Result<CmdOutput> {
    run_cmd(cwd, "git", args)
}

/// Run a git command that changes the repository, unless in safemode.
pub fn run_git_write<P: AsRef<Path>>(cwd: P, safemode: bool, args: &[&str]) -> Result<()> {
    if safemode {
        info!("[safemode] skipping: git {}", args.join(" "));
        return Ok(());
    }
    run_git(cwd, args).map(|_| ())
}

/// Get the repository root for `path`.
///
/// # Returns
///
/// * `Ok(PathBuf)` - The absolute path to the repository root
/// * `Err(HelperError::NotAGitRepo)` - If `path` is not inside a git repository
pub fn repo_root<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let path = path.as_ref();
    run_git(path, &["rev-parse", "--show-toplevel"])
        .map(|out| PathBuf::from(out.stdout))
        .map_err(|_| HelperError::NotAGitRepo {
            path: path.to_path_buf(),
        })
}

/// Name of the checked out branch.
pub fn current_branch<P: AsRef<Path>>(cwd: P) -> Result<String> {
    Ok(run_git(cwd, &["rev-parse", "--abbrev-ref", "HEAD"])?.stdout)
}

/// Commit id of HEAD.
pub fn head_commit<P: AsRef<Path>>(cwd: P) -> Result<String> {
    Ok(run_git(cwd, &["rev-parse", "HEAD"])?.stdout)
}

/// Commit id the local branch points at.
pub fn branch_head<P: AsRef<Path>>(cwd: P, branch: &str) -> Result<String> {
    let refname = format!("refs/heads/{}", branch);
    Ok(run_git(cwd, &["rev-parse", &refname])?.stdout)
}

pub fn branch_exists<P: AsRef<Path>>(cwd: P, branch: &str) -> bool {
    let refname = format!("refs/heads/{}", branch);
    run_git(cwd, &["rev-parse", "--verify", "--quiet", &refname]).is_ok()
}

/// All local branches with the commit each points at.
pub fn list_branches<P: AsRef<Path>>(cwd: P) -> Result<Vec<(String, String)>> {
    let output = run_git(
        cwd,
        &[
            "for-each-ref",
            "--format=%(refname:short) %(objectname)",
            "refs/heads",
        ],
    )?;
    Ok(output
        .lines()
        .into_iter()
        .filter_map(|line| line.split_once(' '))
        .map(|(name, commit)| (name.to_string(), commit.to_string()))
        .collect())
}

/// All tag names in the repository.
pub fn list_tags<P: AsRef<Path>>(cwd: P) -> Result<Vec<String>> {
    let output = run_git(cwd, &["tag", "--list"])?;
    Ok(output.lines().into_iter().map(str::to_string).collect())
}

/// True when `git status --porcelain` reports nothing, untracked files included.
pub fn is_clean<P: AsRef<Path>>(cwd: P) -> Result<bool> {
    Ok(run_git(cwd, &["status", "--porcelain"])?.is_empty())
}

/// Check out `branch`.
///
/// Runs in safemode as well, so read-only commands can inspect other branches.
///
/// # Returns
///
/// * `Ok(())` - The branch is checked out
/// * `Err(HelperError::BranchSwitchFailed)` - Missing branch or conflicting changes
pub fn switch_branch<P: AsRef<Path>>(cwd: P, branch: &str) -> Result<()> {
    let cwd = cwd.as_ref();
    if current_branch(cwd).is_ok_and(|b| b == branch) {
        return Ok(());
    }

    debug!("switching to branch '{}'", branch);
    run_git(cwd, &["checkout", branch])
        .map(|_| ())
        .map_err(|e| HelperError::BranchSwitchFailed {
            branch: branch.to_string(),
            reason: match e {
                HelperError::ExternalCommandFailed { output, .. } => output,
                other => other.to_string(),
            },
        })
}

/// Tags pointing at the HEAD of `branch`.
pub fn head_tags<P: AsRef<Path>>(cwd: P, branch: &str) -> Result<Vec<String>> {
    let refname = format!("refs/heads/{}", branch);
    let output = run_git(cwd, &["tag", "--points-at", &refname])?;
    Ok(output.lines().into_iter().map(str::to_string).collect())
}

/// The `<tag_type>/<version>` tag on the HEAD of `branch`.
///
/// When several well-formed tags exist, the highest version wins.
///
/// # Returns
///
/// * `Ok(Tag)` - The latest well-formed tag on HEAD
/// * `Err(HelperError::NoTagOnHead)` - HEAD has no tags at all
/// * `Err(HelperError::TagMalformed)` - HEAD is tagged, but none match `<tag_type>/<version>`
pub fn get_head_tag<P: AsRef<Path>>(cwd: P, branch: &str, tag_type: &str) -> Result<Tag> {
    let names = head_tags(cwd, branch)?;
    if names.is_empty() {
        return Err(HelperError::NoTagOnHead {
            branch: branch.to_string(),
            tag_type: tag_type.to_string(),
        });
    }

    version::latest_tag(names.iter().filter_map(|n| Tag::parse(n, tag_type))).ok_or_else(|| {
        HelperError::TagMalformed {
            branch: branch.to_string(),
            tag_type: tag_type.to_string(),
        }
    })
}

/// Version of the HEAD tag on `branch`, or `None` when HEAD carries no usable tag.
pub fn head_tag_version<P: AsRef<Path>>(
    cwd: P,
    branch: &str,
    tag_type: &str,
) -> Result<Option<String>> {
    match get_head_tag(cwd, branch, tag_type) {
        Ok(tag) => Ok(Some(tag.version)),
        Err(HelperError::NoTagOnHead { .. } | HelperError::TagMalformed { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// The highest `<tag_type>/<version>` tag reachable from `branch`.
pub fn latest_tag<P: AsRef<Path>>(cwd: P, branch: &str, tag_type: &str) -> Result<Option<Tag>> {
    let pattern = format!("{}/*", tag_type);
    let refname = format!("refs/heads/{}", branch);
    let output = run_git(cwd, &["tag", "--list", &pattern, "--merged", &refname])?;
    Ok(version::latest_tag(
        output.lines().into_iter().filter_map(|n| Tag::parse(n, tag_type)),
    ))
}

/// Contents of `path` at `rev`.
pub fn show_file<P: AsRef<Path>>(cwd: P, rev: &str, path: &str) -> Result<String> {
    let object = format!("{}:{}", rev, path);
    Ok(run_git(cwd, &["show", &object])?.stdout)
}

/// Tag the HEAD of `branch`.
pub fn tag_branch<P: AsRef<Path>>(cwd: P, safemode: bool, branch: &str, tag: &str) -> Result<()> {
    info!("tagging HEAD of branch '{}' as '{}'", branch, tag);
    let refname = format!("refs/heads/{}", branch);
    run_git_write(cwd, safemode, &["tag", tag, &refname])
}

/// Point `branch` at `rev`. Checks the branch out first.
pub fn reset_branch<P: AsRef<Path>>(cwd: P, safemode: bool, branch: &str, rev: &str) -> Result<()> {
    let cwd = cwd.as_ref();
    switch_branch(cwd, branch)?;
    run_git_write(cwd, safemode, &["reset", "--hard", rev])
}

pub fn create_branch<P: AsRef<Path>>(cwd: P, safemode: bool, branch: &str) -> Result<()> {
    run_git_write(cwd, safemode, &["branch", branch])
}

/// Stage everything and commit it.
pub fn commit_all<P: AsRef<Path>>(cwd: P, safemode: bool, message: &str) -> Result<()> {
    let cwd = cwd.as_ref();
    run_git_write(cwd, safemode, &["add", "-A"])?;
    run_git_write(cwd, safemode, &["commit", "--allow-empty", "-m", message])
}

/// Remove every tracked file from the index and working tree.
pub fn remove_all_files<P: AsRef<Path>>(cwd: P, safemode: bool) -> Result<()> {
    run_git_write(cwd, safemode, &["rm", "-rf", "--ignore-unmatch", "--quiet", "."])
}

/// Stash all changes, untracked files included, under `name`.
pub fn stash_push<P: AsRef<Path>>(cwd: P, safemode: bool, name: &str) -> Result<()> {
    run_git_write(cwd, safemode, &["stash", "push", "--include-untracked", "-m", name])
}

/// Stash reference (`stash@{n}`) whose message ends with `name`.
pub fn find_stash<P: AsRef<Path>>(cwd: P, name: &str) -> Result<Option<String>> {
    let output = run_git(cwd, &["stash", "list", "--format=%gd %s"])?;
    Ok(output
        .lines()
        .into_iter()
        .filter_map(|line| line.split_once(' '))
        .find(|(_, subject)| subject.ends_with(name))
        .map(|(reference, _)| reference.to_string()))
}

/// Apply a stash, optionally dropping it afterwards.
pub fn stash_apply<P: AsRef<Path>>(cwd: P, safemode: bool, reference: &str, drop: bool) -> Result<()> {
    let cwd = cwd.as_ref();
    run_git_write(cwd, safemode, &["stash", "apply", reference])?;
    if drop {
        run_git_write(cwd, safemode, &["stash", "drop", reference])?;
    }
    Ok(())
}

/// Write the tree of `rev` to a tar archive.
pub fn archive<P: AsRef<Path>>(cwd: P, safemode: bool, rev: &str, output: &Path) -> Result<()> {
    let output = output.to_string_lossy();
    run_git_write(cwd, safemode, &["archive", "--format=tar", "-o", &output, rev])
}

/// Clone `url` at `branch` into `dest`.
pub fn clone<P: AsRef<Path>>(
    cwd: P,
    safemode: bool,
    url: &str,
    branch: &str,
    dest: &Path,
) -> Result<()> {
    let dest = dest.to_string_lossy();
    run_git_write(cwd, safemode, &["clone", "-b", branch, url, &dest])
}

/// Repository directory name for a clone URL.
///
/// `https://host/team/foo.git` and `/srv/git/foo/` both give `foo`.
pub fn repo_name_from_url(url: &str) -> Option<String> {
    let trimmed = url.trim().trim_end_matches('/');
    let last = trimmed.rsplit(['/', ':']).next()?;
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
