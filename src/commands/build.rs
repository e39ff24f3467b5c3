//! `gbp-helper test-build` and `gbp-helper commit-build`
//!
//! Builds the package from the debian branch with `gbp buildpackage` into
//! `<build dir>/<debian version>/<final|test>` and runs lintian on the
//! result. Test builds are unsigned and untagged; final builds tag the
//! debian commit and sign when a key is configured.

use super::signing_key;
use crate::context::RepoContext;
use crate::error::{HelperError, Result};
use crate::fs::{clean_dir, files_with_suffix};
use crate::git;
use crate::process::{run_cmd, run_write};
use crate::workflow::{Outcome, Plan};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const BUILDER: &str = "debuild";

/// Which kind of build to make.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildKind {
    /// Unsigned, untagged, `testBuildFlags`.
    Test,
    /// Tagged and signed, `buildFlags`.
    Final,
}

impl BuildKind {
    /// Subdirectory of the version build dir.
    pub fn dir_name(&self) -> &'static str {
        match self {
            BuildKind::Test => "test",
            BuildKind::Final => "final",
        }
    }
}

pub fn plan(plan: Plan, kind: BuildKind) -> Plan {
    plan.step("check changelog version", check_changelog_version)
        .step("build package", move |ctx, outcome| {
            build_package(ctx, outcome, kind)
        })
        .step("run lintian", move |ctx, outcome| {
            run_lintian(ctx, outcome, kind)
        })
}

/// Read the changelog version on the debian branch and make sure it matches
/// the upstream HEAD tag.
pub fn check_changelog_version(ctx: &RepoContext, outcome: &mut Outcome) -> Result<()> {
    let config = &ctx.config;
    let upstream = git::get_head_tag(
        &ctx.repo_root,
        &config.upstream_branch,
        &config.upstream_tag_type,
    )?;
    info!(
        "building debian package for upstream version '{}'",
        upstream.version
    );

    git::switch_branch(&ctx.repo_root, &config.debian_branch)?;
    let version = run_cmd(
        &ctx.repo_root,
        "dpkg-parsechangelog",
        &["--show-field", "Version"],
    )?
    .stdout;

    if !version.contains(&upstream.version) {
        return Err(HelperError::user(format!(
            "the upstream version '{}' does not match the changelog version '{}'.\n\
             Run `gbp-helper update-changelog` before building",
            upstream.version, version
        )));
    }

    outcome.debian_version = Some(version);
    Ok(())
}

/// Run `gbp buildpackage` into a clean build dir.
pub fn build_package(ctx: &RepoContext, outcome: &mut Outcome, kind: BuildKind) -> Result<()> {
    let build_dir = build_dir(ctx, outcome, kind)?;
    info!("cleaning old build files in '{}'", build_dir.display());
    clean_dir(&build_dir, ctx.safemode)?;

    let args = buildpackage_args(ctx, &build_dir, kind);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    info!("building package into '{}'", build_dir.display());
    run_write(&ctx.repo_root, ctx.safemode, "gbp", &args)
}

/// Run lintian on the built `.changes` file. Problems are warnings only.
pub fn run_lintian(ctx: &RepoContext, outcome: &mut Outcome, kind: BuildKind) -> Result<()> {
    if ctx.safemode {
        info!("[safemode] skipping: lintian");
        return Ok(());
    }

    let build_dir = build_dir(ctx, outcome, kind)?;
    let Some(changes) = files_with_suffix(&build_dir, ".changes")?.into_iter().next() else {
        warn!(
            "changes file not found in '{}', skipping lintian",
            build_dir.display()
        );
        return Ok(());
    };

    let changes = changes.to_string_lossy().to_string();
    match run_cmd(
        &ctx.repo_root,
        "lintian",
        &["-Iv", "--color", "auto", &changes],
    ) {
        Ok(output) => {
            if !output.stdout.is_empty() {
                info!("{}", output.stdout);
            }
            info!("lintian passed");
            outcome.lintian_passed = Some(true);
        }
        Err(HelperError::ExternalCommandFailed {
            code: Some(_),
            output,
            ..
        }) => {
            info!("{}", output);
            warn!("lintian finished with errors");
            outcome.lintian_passed = Some(false);
        }
        Err(e) => {
            warn!("could not run lintian: {}", e);
            outcome.lintian_passed = Some(false);
        }
    }
    Ok(())
}

fn build_dir(ctx: &RepoContext, outcome: &Outcome, kind: BuildKind) -> Result<PathBuf> {
    let version = outcome
        .debian_version
        .as_deref()
        .ok_or_else(|| HelperError::user("debian version has not been resolved"))?;
    Ok(ctx.paths.version_build_dir(version).join(kind.dir_name()))
}

/// The builder command passed to `--git-builder`.
pub fn builder_command(ctx: &RepoContext, kind: BuildKind) -> String {
    let mut words = vec![BUILDER.to_string(), "--no-lintian".to_string()];
    match kind {
        BuildKind::Test => {
            words.push("-uc".to_string());
            words.push("-us".to_string());
        }
        BuildKind::Final => match signing_key(&ctx.config, "build signing") {
            Some(key) => words.push(format!("-k{}", key)),
            None => {
                words.push("-uc".to_string());
                words.push("-us".to_string());
            }
        },
    }
    words.extend(ctx.config.flag_words(kind == BuildKind::Test));
    shell_words::join(words)
}

/// Arguments for `gbp buildpackage`.
pub fn buildpackage_args(ctx: &RepoContext, build_dir: &Path, kind: BuildKind) -> Vec<String> {
    let config = &ctx.config;
    let mut args = vec!["buildpackage".to_string()];

    if kind == BuildKind::Final {
        args.push("--git-tag".to_string());
        if let Some(key) = signing_key(config, "tag signing") {
            args.push("--git-sign-tags".to_string());
            args.push(format!("--git-keyid={}", key));
        }
        args.push(format!(
            "--git-debian-tag={}/%(version)s",
            config.debian_tag_type
        ));
    }

    args.push(format!("--git-debian-branch={}", config.debian_branch));
    args.push(format!("--git-upstream-branch={}", config.upstream_branch));
    args.push(format!(
        "--git-upstream-tag={}/%(version)s",
        config.upstream_tag_type
    ));
    args.push(format!("--git-export-dir={}", build_dir.to_string_lossy()));
    args.push(format!("--git-builder={}", builder_command(ctx, kind)));
    args
}
