//! `gbp-helper test-pkg`
//!
//! A full dry release: tag the next release version, import it, write a
//! changelog entry and make a test build. The runner restores the backup
//! afterwards, so only the build output remains.

use super::build::{self, BuildKind};
use super::changelog::{self, ChangelogOptions};
use super::commit_release;
use crate::context::RepoContext;
use crate::error::{HelperError, Result};
use crate::git;
use crate::version::{self, Tag};
use crate::workflow::{Outcome, Plan};
use tracing::info;

pub fn plan(plan: Plan) -> Plan {
    let entry = ChangelogOptions::default();
    plan.revert_after()
        .step("tag next release", tag_next_release)
        .step("check upstream version", commit_release::check_upstream_version)
        .step("import upstream tarball", |ctx, outcome| {
            commit_release::import_release(ctx, outcome, false)
        })
        .step("resolve debian version", resolve_test_version)
        .step("update changelog", move |ctx, outcome| {
            changelog::update_changelog(ctx, outcome, &entry)
        })
        .step("build package", |ctx, outcome| {
            build::build_package(ctx, outcome, BuildKind::Test)
        })
        .step("run lintian", |ctx, outcome| {
            build::run_lintian(ctx, outcome, BuildKind::Test)
        })
}

/// Use the release HEAD tag, or tag the HEAD with the version after the
/// latest release tag.
pub fn tag_next_release(ctx: &RepoContext, outcome: &mut Outcome) -> Result<()> {
    let config = &ctx.config;
    let root = &ctx.repo_root;

    if let Some(version) =
        git::head_tag_version(root, &config.release_branch, &config.release_tag_type)?
    {
        info!(
            "the HEAD commit on branch '{}' is already tagged, skipping tagging",
            config.release_branch
        );
        outcome.release_version = Some(version);
        return Ok(());
    }

    let latest = git::latest_tag(root, &config.release_branch, &config.release_tag_type)?
        .ok_or_else(|| {
            HelperError::user(format!(
                "no '{}/<version>' tag found on branch '{}'.\nPlease tag a release first",
                config.release_tag_type, config.release_branch
            ))
        })?;
    let next = version::next_version(&latest.version)?;
    let tag = Tag::new(config.release_tag_type.as_str(), next.as_str());

    git::tag_branch(root, ctx.safemode, &config.release_branch, &tag.name())?;
    outcome.release_version = Some(next);
    Ok(())
}

/// `<release version><debianVersionSuffix>`
pub fn resolve_test_version(ctx: &RepoContext, outcome: &mut Outcome) -> Result<()> {
    let release = outcome
        .release_version
        .as_deref()
        .ok_or_else(|| HelperError::user("release version has not been resolved"))?;
    let debian_version = format!("{}{}", release, ctx.config.debian_version_suffix);
    info!("test package version is '{}'", debian_version);
    outcome.debian_version = Some(debian_version);
    Ok(())
}
