//! CLI argument parsing for gbp-helper.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the flags and the command set; the implementations
//! are in the `commands` module.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// gbp-helper: drive a git-buildpackage Debian packaging workflow.
///
/// Keeps a release, an upstream and a debian branch in step: imports tagged
/// releases as upstream tarballs, updates the changelog, builds test and
/// signed packages, and uploads them to a PPA. Every mutating command takes a
/// backup of the repository first and restores it if a step fails.
#[derive(Parser, Debug)]
#[command(name = "gbp-helper")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Show every step and external command.
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only show warnings and errors.
    #[arg(short, long)]
    pub quiet: bool,

    /// Colour the output.
    #[arg(short, long)]
    pub color: bool,

    /// Dry run: log every change instead of making it.
    #[arg(short, long)]
    pub safemode: bool,

    /// Do not restore the backup when a command fails.
    #[arg(short = 'n', long)]
    pub norestore: bool,

    /// Do not take a backup before running a command.
    #[arg(long)]
    pub nobackup: bool,

    /// Config file path, relative to the repository root.
    #[arg(long, value_name = "PATH", default_value = crate::config::DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// The command to run.
    #[arg(value_enum)]
    pub command: Action,

    /// Repository to work on (default: current directory).
    pub git_path: Option<PathBuf>,
}

/// The commands gbp-helper can run.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Dry release: tag, import, update changelog and build, then revert everything.
    TestPkg,
    /// Import the tagged release HEAD as an upstream tarball and merge it into debian.
    CommitRelease,
    /// Add and commit a changelog entry for the current upstream version.
    UpdateChangelog,
    /// Build an unsigned test package without tagging.
    TestBuild,
    /// Build a signed package and tag the debian commit.
    CommitBuild,
    /// Upload the latest build to the configured PPA.
    Upload,
    /// Restore the repository from the latest backup.
    Restore,
    /// Clone a repository and set up the release, upstream and debian branches.
    Clone,
    /// Write an example config file.
    Config,
}

impl Action {
    /// The command name as typed on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::TestPkg => "test-pkg",
            Action::CommitRelease => "commit-release",
            Action::UpdateChangelog => "update-changelog",
            Action::TestBuild => "test-build",
            Action::CommitBuild => "commit-build",
            Action::Upload => "upload",
            Action::Restore => "restore",
            Action::Clone => "clone",
            Action::Config => "config",
        }
    }

    /// Whether the command runs inside the backup and initial-state guard.
    pub fn is_repository_command(&self) -> bool {
        !matches!(self, Action::Restore | Action::Clone | Action::Config)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The repository path, defaulting to the current directory.
    pub fn repo_path(&self) -> PathBuf {
        self.git_path.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_debug_assert() {
        // Verifies the CLI arguments configuration is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_command_with_defaults() {
        let cli = Cli::try_parse_from(["gbp-helper", "commit-build"]).unwrap();
        assert_eq!(cli.command, Action::CommitBuild);
        assert!(!cli.verbose && !cli.quiet && !cli.safemode && !cli.norestore && !cli.nobackup);
        assert_eq!(cli.config, PathBuf::from("gbp-helper.conf"));
        assert_eq!(cli.repo_path(), PathBuf::from("."));
    }

    #[test]
    fn parse_all_flags_and_path() {
        let cli = Cli::try_parse_from([
            "gbp-helper",
            "-v",
            "-c",
            "-s",
            "-n",
            "--nobackup",
            "--config",
            "pkg/helper.conf",
            "test-pkg",
            "/src/hello",
        ])
        .unwrap();

        assert_eq!(cli.command, Action::TestPkg);
        assert!(cli.verbose && cli.color && cli.safemode && cli.norestore && cli.nobackup);
        assert_eq!(cli.config, PathBuf::from("pkg/helper.conf"));
        assert_eq!(cli.repo_path(), PathBuf::from("/src/hello"));
    }

    #[test]
    fn parse_every_command_name() {
        for action in Action::value_variants() {
            let cli = Cli::try_parse_from(["gbp-helper", action.as_str()]).unwrap();
            assert_eq!(cli.command, *action);
        }
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        let result = Cli::try_parse_from(["gbp-helper", "-v", "-q", "upload"]);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_command_is_rejected() {
        let result = Cli::try_parse_from(["gbp-helper", "publish"]);
        assert!(result.is_err());
    }

    #[test]
    fn repository_commands() {
        assert!(Action::TestPkg.is_repository_command());
        assert!(Action::Upload.is_repository_command());
        assert!(!Action::Restore.is_repository_command());
        assert!(!Action::Clone.is_repository_command());
        assert!(!Action::Config.is_repository_command());
    }
}
