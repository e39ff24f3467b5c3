//! `gbp-helper commit-release`
//!
//! Imports the tagged HEAD of the release branch as an upstream tarball:
//! the release tree is archived with `git archive`, unpacked without the
//! excluded files, repacked as `<package>_<version>.orig.tar.gz`, and handed
//! to `gbp import-orig`, which commits it to the upstream branch, tags it
//! and merges it into the debian branch.

use super::signing_key;
use crate::context::RepoContext;
use crate::error::{HelperError, Result};
use crate::fs::{clean_dir, mkdirs, remove_dir};
use crate::git;
use crate::process::run_write;
use crate::version::{self, Tag};
use crate::workflow::{Outcome, Plan};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Upstream version assumed when the upstream branch HEAD has no tag.
const NO_UPSTREAM_VERSION: &str = "0";

pub fn plan(plan: Plan, sign: bool) -> Plan {
    plan.step("resolve release version", resolve_release_version)
        .step("check upstream version", check_upstream_version)
        .step("import upstream tarball", move |ctx, outcome| {
            import_release(ctx, outcome, sign)
        })
}

/// Read the release version from the tag on the release branch HEAD.
pub fn resolve_release_version(ctx: &RepoContext, outcome: &mut Outcome) -> Result<()> {
    let config = &ctx.config;
    let tag = git::get_head_tag(
        &ctx.repo_root,
        &config.release_branch,
        &config.release_tag_type,
    )?;
    info!("selected release version '{}' for upstream commit", tag.version);
    outcome.release_version = Some(tag.version);
    Ok(())
}

/// Fail unless the release version is strictly greater than the upstream one.
pub fn check_upstream_version(ctx: &RepoContext, outcome: &mut Outcome) -> Result<()> {
    let config = &ctx.config;
    let release = release_version(outcome)?;
    let upstream = git::head_tag_version(
        &ctx.repo_root,
        &config.upstream_branch,
        &config.upstream_tag_type,
    )?
    .unwrap_or_else(|| NO_UPSTREAM_VERSION.to_string());

    if !version::is_version_gt(&release, &upstream) {
        return Err(HelperError::VersionRegression { release, upstream });
    }
    info!("release '{}' is newer than upstream '{}'", release, upstream);
    Ok(())
}

/// Build the tarball and import it. The tmp dir is removed either way.
pub fn import_release(ctx: &RepoContext, outcome: &mut Outcome, sign: bool) -> Result<()> {
    let release = release_version(outcome)?;

    let result = create_tarball(ctx, &release)
        .and_then(|tarball| import_tarball(ctx, &tarball, &release, sign));

    info!("cleaning up temporary files");
    if let Err(e) = remove_dir(&ctx.paths.tmp_dir, ctx.safemode) {
        warn!("{}", e);
    }

    outcome.upstream_tag = Some(result?);
    Ok(())
}

fn release_version(outcome: &Outcome) -> Result<String> {
    outcome
        .release_version
        .clone()
        .ok_or_else(|| HelperError::user("release version has not been resolved"))
}

/// Archive the release branch and repack it as the orig tarball.
fn create_tarball(ctx: &RepoContext, release: &str) -> Result<PathBuf> {
    let config = &ctx.config;
    let root = &ctx.repo_root;
    let work_dir = &ctx.paths.tarball_dir;
    let source_name = format!("{}-{}", ctx.package, release);
    let source_dir = work_dir.join(&source_name);
    let archive = work_dir.join(format!("{}_archive.tar", config.release_branch));
    let tarball = ctx.paths.tarball_path(&ctx.package, release);

    info!("cleaning tarball directory '{}'", work_dir.display());
    clean_dir(&ctx.paths.tmp_dir, ctx.safemode)?;
    mkdirs(&source_dir, ctx.safemode)?;

    info!(
        "extracting release '{}' from branch '{}'",
        release, config.release_branch
    );
    git::archive(root, ctx.safemode, &config.release_branch, &archive)?;

    let mut extract_args = vec![
        "-xf".to_string(),
        path_arg(&archive),
        format!("--directory={}", path_arg(&source_dir)),
    ];
    extract_args.extend(exclude_args(&config.exclude_files));
    if let Some(ignore_file) = write_gitignore(ctx, work_dir)? {
        extract_args.push(format!("--exclude-from={}", path_arg(&ignore_file)));
    }
    let extract_args: Vec<&str> = extract_args.iter().map(String::as_str).collect();
    run_write(root, ctx.safemode, "tar", &extract_args)?;

    info!("making upstream tarball '{}'", tarball.display());
    let work_dir_arg = format!("--directory={}", path_arg(work_dir));
    let tarball_arg = path_arg(&tarball);
    run_write(
        root,
        ctx.safemode,
        "tar",
        &[
            &work_dir_arg,
            "-czf",
            &tarball_arg,
            "--exclude-vcs",
            &source_name,
        ],
    )?;

    Ok(tarball)
}

/// Copy the release branch `.gitignore` next to the archive, if it has one.
fn write_gitignore(ctx: &RepoContext, work_dir: &Path) -> Result<Option<PathBuf>> {
    let Ok(content) = git::show_file(&ctx.repo_root, &ctx.config.release_branch, ".gitignore")
    else {
        return Ok(None);
    };
    if ctx.safemode {
        return Ok(None);
    }
    let path = work_dir.join("release.gitignore");
    std::fs::write(&path, format!("{}\n", content))?;
    Ok(Some(path))
}

/// `--exclude=` options for the configured files.
pub fn exclude_args(files: &[String]) -> Vec<String> {
    files.iter().map(|f| format!("--exclude={}", f)).collect()
}

/// Arguments for `gbp import-orig`.
pub fn import_args(ctx: &RepoContext, tarball: &Path, key: Option<&str>) -> Vec<String> {
    let config = &ctx.config;
    let mut args = vec![
        "import-orig".to_string(),
        "--no-interactive".to_string(),
        "--merge".to_string(),
        "--merge-mode=replace".to_string(),
    ];
    if let Some(key) = key {
        args.push("--sign-tags".to_string());
        args.push(format!("--keyid={}", key));
    }
    args.push(format!("--debian-branch={}", config.debian_branch));
    args.push(format!("--upstream-branch={}", config.upstream_branch));
    args.push(format!("--upstream-tag={}/%(version)s", config.upstream_tag_type));
    args.push(path_arg(tarball));
    args
}

/// Import the tarball and point the upstream branch at the new tag.
fn import_tarball(ctx: &RepoContext, tarball: &Path, release: &str, sign: bool) -> Result<String> {
    let config = &ctx.config;
    let key = if sign {
        signing_key(config, "tag signing")
    } else {
        None
    };

    info!(
        "importing tarball to upstream branch '{}' and merging into '{}'",
        config.upstream_branch, config.debian_branch
    );
    git::switch_branch(&ctx.repo_root, &config.debian_branch)?;
    let args = import_args(ctx, tarball, key);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    run_write(&ctx.repo_root, ctx.safemode, "gbp", &args)?;

    let upstream_tag = Tag::new(config.upstream_tag_type.as_str(), release).name();
    info!(
        "resetting upstream branch '{}' to import commit '{}'",
        config.upstream_branch, upstream_tag
    );
    git::reset_branch(
        &ctx.repo_root,
        ctx.safemode,
        &config.upstream_branch,
        &upstream_tag,
    )?;

    Ok(upstream_tag)
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::context;
    use crate::test_support::{create_packaging_repo, git};

    #[test]
    fn test_release_requires_head_tag() {
        let repo = create_packaging_repo();
        let ctx = context(&repo, "");
        let mut outcome = Outcome::default();

        let err = resolve_release_version(&ctx, &mut outcome).unwrap_err();
        assert!(matches!(err, HelperError::NoTagOnHead { .. }));

        git(repo.path(), &["tag", "release/one"]);
        let err = resolve_release_version(&ctx, &mut outcome).unwrap_err();
        assert!(matches!(err, HelperError::TagMalformed { .. }));

        git(repo.path(), &["tag", "release/1.0"]);
        resolve_release_version(&ctx, &mut outcome).unwrap();
        assert_eq!(outcome.release_version.as_deref(), Some("1.0"));
    }

    #[test]
    fn test_missing_upstream_tag_counts_as_zero() {
        let repo = create_packaging_repo();
        let ctx = context(&repo, "");
        let mut outcome = Outcome {
            release_version: Some("0.1".to_string()),
            ..Outcome::default()
        };
        check_upstream_version(&ctx, &mut outcome).unwrap();
    }

    #[test]
    fn test_version_regression() {
        let repo = create_packaging_repo();
        let ctx = context(&repo, "");
        git(repo.path(), &["tag", "upstream/1.0", "upstream"]);

        for (release, ok) in [("1.0", false), ("0.9", false), ("1.0.1", true), ("1.10", true)] {
            let mut outcome = Outcome {
                release_version: Some(release.to_string()),
                ..Outcome::default()
            };
            let result = check_upstream_version(&ctx, &mut outcome);
            assert_eq!(result.is_ok(), ok, "release {}", release);
            if let Err(e) = result {
                assert!(matches!(e, HelperError::VersionRegression { .. }));
            }
        }
    }

    #[test]
    fn test_import_args_with_and_without_key() {
        let repo = create_packaging_repo();
        let ctx = context(&repo, "");
        let tarball = Path::new("/tmp/hello/tarball/hello_1.0.orig.tar.gz");

        let args = import_args(&ctx, tarball, None);
        assert_eq!(
            args,
            vec![
                "import-orig",
                "--no-interactive",
                "--merge",
                "--merge-mode=replace",
                "--debian-branch=debian",
                "--upstream-branch=upstream",
                "--upstream-tag=upstream/%(version)s",
                "/tmp/hello/tarball/hello_1.0.orig.tar.gz",
            ]
        );

        let args = import_args(&ctx, tarball, Some("ABCD"));
        assert!(args.contains(&"--sign-tags".to_string()));
        assert!(args.contains(&"--keyid=ABCD".to_string()));
    }

    #[test]
    fn test_create_tarball_excludes_files() {
        let repo = create_packaging_repo();
        crate::test_support::commit_file(repo.path(), "src/main.c", "int main;\n", "Source");
        crate::test_support::commit_file(repo.path(), ".gitignore", "*.o\n", "Ignore");
        let ctx = context(&repo, "");

        let tarball = create_tarball(&ctx, "1.0").unwrap();
        assert!(tarball.ends_with("hello_1.0.orig.tar.gz"));

        let listing = crate::process::run_cmd(
            repo.path(),
            "tar",
            &["-tzf", &tarball.to_string_lossy()],
        )
        .unwrap()
        .stdout;
        assert!(listing.contains("hello-1.0/src/main.c"));
        assert!(!listing.contains("README.md"));
        assert!(!listing.contains("gbp-helper.conf"));

        remove_dir(&ctx.paths.tmp_dir, false).unwrap();
    }

    #[test]
    fn test_tarball_work_dir_keeps_backup_and_lock() {
        use crate::workflow::{RunOptions, Runner};

        let repo = create_packaging_repo();
        let ctx = context(&repo, "packageName=gbp-helper\n");
        let lock_file = ctx.paths.lock_file.clone();

        let plan = Plan::new("commit-release")
            .step("make tarball", move |ctx, _| {
                create_tarball(ctx, "1.0")?;
                assert!(lock_file.exists());
                git(&ctx.repo_root, &["tag", "upstream/1.0"]);
                Ok(())
            })
            .step("fail", |_, _| Err(HelperError::user("import failed")));

        let err = Runner::new(&ctx, RunOptions::default()).run(&plan).unwrap_err();

        assert_eq!(err.to_string(), "import failed");
        assert_eq!(crate::backup::list(&ctx.paths.backup_dir).unwrap().len(), 1);
        assert!(git(repo.path(), &["tag", "--list"]).is_empty());
        assert!(!ctx.paths.lock_file.exists());
    }

    #[test]
    fn test_create_tarball_stays_inside_tmp_root() {
        let repo = create_packaging_repo();
        let ctx = context(&repo, "");
        let outside = repo.dir.path().join("victim");
        std::fs::create_dir_all(&outside).unwrap();
        std::fs::write(outside.join("precious.txt"), "keep\n").unwrap();

        create_tarball(&ctx, "1.0").unwrap();
        remove_dir(&ctx.paths.tmp_dir, false).unwrap();

        assert!(ctx.paths.tmp_dir.starts_with(repo.tmp_root()));
        assert!(outside.join("precious.txt").exists());
        assert!(repo.path().join("README.md").exists());

        for package in ["../victim", "../hello"] {
            let content = format!(
                "{}packageName={}\n",
                crate::test_support::TEST_CONFIG,
                package
            );
            assert!(crate::config::Config::parse(&content).is_err(), "{}", package);
        }
    }

    #[test]
    fn test_create_tarball_safemode_writes_nothing() {
        let repo = create_packaging_repo();
        let mut ctx = context(&repo, "");
        ctx.safemode = true;

        create_tarball(&ctx, "1.0").unwrap();
        assert!(!ctx.paths.tmp_dir.exists());
    }
}
