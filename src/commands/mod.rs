//! Command implementations for gbp-helper.
//!
//! This module provides the dispatcher that routes the CLI command to its
//! implementation. Repository commands are built as [`Plan`]s and run by the
//! [`Runner`]; restore, clone and config run directly.

mod build;
mod changelog;
mod clone;
mod commit_release;
mod config_cmd;
mod restore;
mod test_pkg;
mod upload;

use crate::cli::{Action, Cli};
use crate::config::Config;
use crate::context::RepoContext;
use crate::error::Result;
use crate::workflow::{Outcome, Plan, RunOptions, Runner};
use build::BuildKind;
use changelog::ChangelogOptions;
use tracing::{info, warn};

/// Dispatch a command to its implementation.
pub fn dispatch(cli: &Cli) -> Result<()> {
    let path = cli.repo_path();
    match cli.command {
        Action::Restore => restore::cmd_restore(&path, cli.safemode),
        Action::Clone => clone::cmd_clone(&path, &cli.config, cli.safemode),
        Action::Config => config_cmd::cmd_config(&path, &cli.config, cli.safemode),
        action => {
            let ctx = RepoContext::resolve(&path, &cli.config, cli.safemode)?;
            let options = RunOptions {
                backup: !cli.nobackup,
                restore_on_failure: !cli.norestore,
            };
            run_repository_command(&ctx, action, options)
        }
    }
}

/// Run one of the guarded repository commands and report the outcome.
pub fn run_repository_command(ctx: &RepoContext, action: Action, options: RunOptions) -> Result<()> {
    let Some(plan) = repository_plan(&ctx.config, action) else {
        return Ok(());
    };
    if ctx.safemode {
        info!("running '{}' in safemode, no changes will be made", action);
    }
    let outcome = Runner::new(ctx, options).run(&plan)?;
    report(action, &outcome);
    Ok(())
}

/// The plan for a repository command.
///
/// Uncommitted changes on the upstream branch block every command; on the
/// debian branch they block the commands that commit to it, and on the
/// release branch they block commit-release.
pub fn repository_plan(config: &Config, action: Action) -> Option<Plan> {
    let plan = Plan::new(action.as_str()).blocked_on(&config.upstream_branch);
    let plan = match action {
        Action::TestPkg => test_pkg::plan(plan),
        Action::CommitRelease => commit_release::plan(plan, true)
            .blocked_on(&config.debian_branch)
            .blocked_on(&config.release_branch),
        Action::UpdateChangelog => changelog::plan(plan, ChangelogOptions::release_entry())
            .blocked_on(&config.debian_branch),
        Action::TestBuild => build::plan(plan, BuildKind::Test),
        Action::CommitBuild => {
            build::plan(plan, BuildKind::Final).blocked_on(&config.debian_branch)
        }
        Action::Upload => upload::plan(plan),
        Action::Restore | Action::Clone | Action::Config => return None,
    };
    Some(plan)
}

/// The configured GPG key, or `None` with a warning that `purpose` is off.
pub(crate) fn signing_key<'a>(config: &'a Config, purpose: &str) -> Option<&'a str> {
    let key = config.gpg_key_id.as_deref().filter(|k| !k.is_empty());
    if key.is_none() {
        warn!("gpgKeyId is not set in the config file, {} disabled", purpose);
    }
    key
}

fn report(action: Action, outcome: &Outcome) {
    if let Some(tag) = &outcome.upstream_tag {
        info!("created upstream tag '{}'", tag);
    }
    if let Some(passed) = outcome.lintian_passed {
        info!("lintian {}", if passed { "passed" } else { "reported problems" });
    }
    if let Some(changes) = &outcome.uploaded {
        info!("uploaded '{}'", changes);
    }
    info!("'{}' finished successfully", action);
}
