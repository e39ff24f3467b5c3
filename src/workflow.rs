//! Guarded execution of repository commands.
//!
//! Every repository command is a [`Plan`]: an ordered list of named steps.
//! The [`Runner`] wraps a plan with the same safety net for every command:
//!
//! 1. take the repository lock
//! 2. take a backup (unless disabled)
//! 3. park uncommitted changes in a temporary commit ([`InitialState`])
//! 4. refuse to run if those changes sit on a branch the command rewrites
//! 5. run the steps, stopping at the first failure
//! 6. on success, return to the initial state (or restore the backup for dry runs)
//! 7. on failure, restore the backup unless restore-on-failure is disabled

use crate::backup::{self, Backup};
use crate::context::RepoContext;
use crate::error::{HelperError, Result};
use crate::{git, lock};
use tracing::{error, info, warn};

/// Values produced by steps and read by later steps or the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Release version that was found or tagged.
    pub release_version: Option<String>,
    /// Upstream tag created by the import, `<upstreamTagType>/<version>`.
    pub upstream_tag: Option<String>,
    /// Debian version written to the changelog or read from it.
    pub debian_version: Option<String>,
    /// `Some(false)` when lintian reported problems.
    pub lintian_passed: Option<bool>,
    /// The `.changes` file handed to dput.
    pub uploaded: Option<String>,
}

type StepFn = Box<dyn Fn(&RepoContext, &mut Outcome) -> Result<()>>;

/// A named unit of work.
pub struct Step {
    pub name: &'static str,
    run: StepFn,
}

/// The steps of one command plus its guard settings.
pub struct Plan {
    /// Command name, used for the lock, backup name and messages.
    pub command: &'static str,
    steps: Vec<Step>,
    /// Branches on which parked changes block the command.
    blocked_branches: Vec<String>,
    /// Restore the backup after success as well (dry runs).
    revert_after: bool,
}

impl Plan {
    pub fn new(command: &'static str) -> Self {
        Self {
            command,
            steps: Vec::new(),
            blocked_branches: Vec::new(),
            revert_after: false,
        }
    }

    /// Append a step.
    pub fn step<F>(mut self, name: &'static str, run: F) -> Self
    where
        F: Fn(&RepoContext, &mut Outcome) -> Result<()> + 'static,
    {
        self.steps.push(Step {
            name,
            run: Box::new(run),
        });
        self
    }

    /// Refuse to run while uncommitted changes are parked on `branch`.
    pub fn blocked_on(mut self, branch: &str) -> Self {
        self.blocked_branches.push(branch.to_string());
        self
    }

    /// Restore the pre-command backup after a successful run.
    pub fn revert_after(mut self) -> Self {
        self.revert_after = true;
        self
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name).collect()
    }

    /// Run the steps in order without any guard.
    pub fn execute(&self, ctx: &RepoContext, outcome: &mut Outcome) -> Result<()> {
        let total = self.steps.len();
        for (i, step) in self.steps.iter().enumerate() {
            info!("==> [{}/{}] {}", i + 1, total, step.name);
            (step.run)(ctx, outcome).map_err(|e| {
                error!("step '{}' failed", step.name);
                e
            })?;
        }
        Ok(())
    }
}

/// Branch, HEAD and parked changes before a command ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialState {
    pub branch: String,
    pub head: String,
    /// Whether the working tree had uncommitted changes.
    pub dirty: bool,
    /// Stash name holding the parked changes, if a temporary commit was made.
    pub stash: Option<String>,
}

impl InitialState {
    /// Record the current branch and park uncommitted changes.
    ///
    /// Changes are stashed as `gbp-helper<head>`, re-applied, and committed as
    /// `Temp '<branch>' commit.` so branch switches do not carry them along.
    pub fn save(ctx: &RepoContext) -> Result<Self> {
        let root = &ctx.repo_root;
        let branch = git::current_branch(root)?;
        let head = git::head_commit(root)?;
        let dirty = !git::is_clean(root)?;
        info!("saving initial state of branch '{}'", branch);

        if !dirty {
            return Ok(Self {
                branch,
                head,
                dirty,
                stash: None,
            });
        }
        if ctx.safemode {
            info!("[safemode] skipping: temporary commit on branch '{}'", branch);
            return Ok(Self {
                branch,
                head,
                dirty,
                stash: None,
            });
        }

        let name = format!("gbp-helper<{}>", head);
        info!("stashing uncommitted changes on branch '{}'", branch);
        git::stash_push(root, false, &name)?;
        git::stash_apply(root, false, "stash@{0}", false)?;
        git::commit_all(root, false, &format!("Temp '{}' commit.", branch))?;

        Ok(Self {
            branch,
            head,
            dirty,
            stash: Some(name),
        })
    }

    /// Switch back to the initial branch and unpark the changes.
    pub fn restore(&self, ctx: &RepoContext) -> Result<()> {
        let root = &ctx.repo_root;
        info!("restoring initial state of branch '{}'", self.branch);
        git::switch_branch(root, &self.branch)?;

        if let Some(name) = &self.stash {
            git::reset_branch(root, ctx.safemode, &self.branch, &self.head)?;
            let reference = git::find_stash(root, name)?.ok_or_else(|| {
                HelperError::user(format!("stash '{}' not found, changes are lost", name))
            })?;
            git::stash_apply(root, ctx.safemode, &reference, true)?;
        }
        Ok(())
    }
}

/// Guard settings taken from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Take a backup before running (`--nobackup` clears it).
    pub backup: bool,
    /// Restore the backup on failure (`-n` clears it).
    pub restore_on_failure: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            backup: true,
            restore_on_failure: true,
        }
    }
}

/// Runs plans against one repository.
pub struct Runner<'a> {
    ctx: &'a RepoContext,
    options: RunOptions,
}

impl<'a> Runner<'a> {
    pub fn new(ctx: &'a RepoContext, options: RunOptions) -> Self {
        Self { ctx, options }
    }

    /// Run `plan` inside the guard.
    pub fn run(&self, plan: &Plan) -> Result<Outcome> {
        let ctx = self.ctx;
        if plan.revert_after && !self.options.backup {
            return Err(HelperError::user(format!(
                "'{}' reverts its changes from a backup and cannot run with backups disabled",
                plan.command
            )));
        }

        let _lock = lock::acquire(&ctx.paths.lock_file, plan.command, ctx.safemode)?;

        let backup = if self.options.backup {
            backup::create(&ctx.repo_root, &ctx.paths.backup_dir, plan.command, ctx.safemode)?
        } else {
            info!("backups disabled, not saving repository state");
            None
        };

        let mut outcome = Outcome::default();
        let initial = match self.guarded(plan, &mut outcome) {
            Ok(initial) => initial,
            Err((e, initial)) => {
                self.recover(plan, backup.as_ref(), initial.as_ref());
                return Err(e);
            }
        };

        if plan.revert_after {
            info!("reverting changes made by '{}'", plan.command);
            if let Some(backup) = &backup {
                backup::restore(&ctx.repo_root, backup, ctx.safemode)?;
            } else {
                initial.restore(ctx)?;
            }
        } else if let Err(e) = initial.restore(ctx) {
            warn!("could not switch back to the initial branch state: {}", e);
        }

        Ok(outcome)
    }

    // Returns the error together with whatever initial state was saved.
    fn guarded(
        &self,
        plan: &Plan,
        outcome: &mut Outcome,
    ) -> std::result::Result<InitialState, (HelperError, Option<InitialState>)> {
        let ctx = self.ctx;
        let initial = InitialState::save(ctx).map_err(|e| (e, None))?;

        if initial.dirty && plan.blocked_branches.contains(&initial.branch) {
            let err = HelperError::user(format!(
                "please commit all changes on branch '{}' before running '{}'",
                initial.branch, plan.command
            ));
            return Err((err, Some(initial)));
        }

        match plan.execute(ctx, outcome) {
            Ok(()) => Ok(initial),
            Err(e) => Err((e, Some(initial))),
        }
    }

    fn recover(&self, plan: &Plan, backup: Option<&Backup>, initial: Option<&InitialState>) {
        let ctx = self.ctx;
        error!("error recovery for '{}'", plan.command);

        if let Some(backup) = backup {
            if !self.options.restore_on_failure {
                info!("restore disabled (-n), see 'gbp-helper restore' to restore the repository");
                return;
            }
            match backup::restore(&ctx.repo_root, backup, ctx.safemode) {
                Ok(()) => return,
                Err(e) => {
                    warn!("{}; see 'gbp-helper restore' to restore the repository", e);
                }
            }
        }

        if let Some(initial) = initial
            && let Err(e) = initial.restore(ctx)
        {
            warn!("could not switch back to the initial branch state: {}", e);
        }
    }
}
