//! `gbp-helper update-changelog`
//!
//! Adds a changelog entry on the debian branch with `gbp dch`, optionally
//! opens it in the editor, and commits it.

use crate::context::RepoContext;
use crate::error::Result;
use crate::git;
use crate::process::{run_interactive, run_write};
use crate::workflow::{Outcome, Plan};
use tracing::info;

const CHANGELOG_PATH: &str = "debian/changelog";

/// How the changelog is updated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangelogOptions {
    /// Version to write; defaults to the upstream HEAD tag version plus
    /// `debianVersionSuffix`.
    pub version: Option<String>,
    /// Open the editor on the changelog afterwards.
    pub editor: bool,
    /// Finalize the entry (`gbp dch --release`).
    pub release: bool,
}

impl ChangelogOptions {
    /// Interactive release entry, as used by `update-changelog`.
    pub fn release_entry() -> Self {
        Self {
            version: None,
            editor: true,
            release: true,
        }
    }
}

pub fn plan(plan: Plan, options: ChangelogOptions) -> Plan {
    let version = options.version.clone();
    plan.step("resolve debian version", move |ctx, outcome| {
        resolve_debian_version(ctx, outcome, version.as_deref())
    })
    .step("update changelog", move |ctx, outcome| {
        update_changelog(ctx, outcome, &options)
    })
}

/// Pick the version for the new entry.
pub fn resolve_debian_version(
    ctx: &RepoContext,
    outcome: &mut Outcome,
    version: Option<&str>,
) -> Result<()> {
    let config = &ctx.config;
    let debian_version = match version {
        Some(v) => v.to_string(),
        None => {
            let upstream = git::get_head_tag(
                &ctx.repo_root,
                &config.upstream_branch,
                &config.upstream_tag_type,
            )?;
            format!("{}{}", upstream.version, config.debian_version_suffix)
        }
    };
    info!("updating changelog with version '{}'", debian_version);
    outcome.debian_version = Some(debian_version);
    Ok(())
}

/// Arguments for `gbp dch`.
pub fn dch_args(ctx: &RepoContext, version: &str, release: bool) -> Vec<String> {
    let config = &ctx.config;
    let mut args = vec![
        "dch".to_string(),
        format!("--debian-branch={}", config.debian_branch),
        format!("--new-version={}", version),
        format!("--urgency={}", config.urgency),
        "--spawn-editor=snapshot".to_string(),
    ];
    if let Some(distribution) = &config.distribution {
        args.push(format!("--distribution={}", distribution));
    }
    if release {
        args.push("--release".to_string());
    }
    args
}

pub fn commit_message(version: &str) -> String {
    format!("Update changelog for {} release.", version)
}

/// Write the entry on the debian branch and commit it.
pub fn update_changelog(
    ctx: &RepoContext,
    outcome: &mut Outcome,
    options: &ChangelogOptions,
) -> Result<()> {
    let config = &ctx.config;
    let version = outcome
        .debian_version
        .clone()
        .unwrap_or_else(|| options.version.clone().unwrap_or_default());

    git::switch_branch(&ctx.repo_root, &config.debian_branch)?;

    let args = dch_args(ctx, &version, options.release);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    run_write(&ctx.repo_root, ctx.safemode, "gbp", &args)?;

    if options.editor {
        if ctx.safemode {
            info!("[safemode] skipping: {} {}", config.editor_cmd, CHANGELOG_PATH);
        } else {
            run_interactive(&ctx.repo_root, &config.editor_cmd, &[CHANGELOG_PATH])?;
        }
    }

    info!(
        "committing updated {} to branch '{}'",
        CHANGELOG_PATH, config.debian_branch
    );
    git::commit_all(&ctx.repo_root, ctx.safemode, &commit_message(&version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::context;
    use crate::error::HelperError;
    use crate::test_support::{create_packaging_repo, git};

    #[test]
    fn test_default_version_from_upstream_tag() {
        let repo = create_packaging_repo();
        let ctx = context(&repo, "debianVersionSuffix=-1\n");
        git(repo.path(), &["tag", "upstream/2.3", "upstream"]);

        let mut outcome = Outcome::default();
        resolve_debian_version(&ctx, &mut outcome, None).unwrap();
        assert_eq!(outcome.debian_version.as_deref(), Some("2.3-1"));

        resolve_debian_version(&ctx, &mut outcome, Some("9.9-0~ppa1")).unwrap();
        assert_eq!(outcome.debian_version.as_deref(), Some("9.9-0~ppa1"));
    }

    #[test]
    fn test_default_version_needs_upstream_tag() {
        let repo = create_packaging_repo();
        let ctx = context(&repo, "");
        let err = resolve_debian_version(&ctx, &mut Outcome::default(), None).unwrap_err();
        assert!(matches!(err, HelperError::NoTagOnHead { .. }));
    }

    #[test]
    fn test_dch_args() {
        let repo = create_packaging_repo();
        let ctx = context(&repo, "urgency=high\ndistribution=unstable\n");

        assert_eq!(
            dch_args(&ctx, "1.0-1", true),
            vec![
                "dch",
                "--debian-branch=debian",
                "--new-version=1.0-1",
                "--urgency=high",
                "--spawn-editor=snapshot",
                "--distribution=unstable",
                "--release",
            ]
        );

        let ctx = context(&repo, "");
        let args = dch_args(&ctx, "1.0-1", false);
        assert!(args.contains(&"--urgency=low".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("--distribution")));
        assert!(!args.contains(&"--release".to_string()));
    }

    #[test]
    fn test_commit_message() {
        assert_eq!(
            commit_message("1.0-0~ppa1"),
            "Update changelog for 1.0-0~ppa1 release."
        );
    }

    #[test]
    fn test_safemode_update_changes_nothing() {
        let repo = create_packaging_repo();
        let mut ctx = context(&repo, "");
        ctx.safemode = true;
        let head = git(repo.path(), &["rev-parse", "debian"]);

        let mut outcome = Outcome {
            debian_version: Some("1.0-1".to_string()),
            ..Outcome::default()
        };
        update_changelog(&ctx, &mut outcome, &ChangelogOptions::release_entry()).unwrap();

        assert_eq!(git(repo.path(), &["rev-parse", "debian"]), head);
        assert_eq!(git(repo.path(), &["rev-parse", "--abbrev-ref", "HEAD"]), "debian");
    }
}
