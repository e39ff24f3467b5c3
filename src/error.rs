//! Error types for the gbp-helper CLI.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.

use crate::exit_codes;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for gbp-helper operations.
///
/// Each variant maps to an exit code through [`HelperError::exit_code`].
#[derive(Error, Debug)]
pub enum HelperError {
    /// The target directory is not inside a git repository.
    #[error(
        "'{}' is not a git repository.\nPlease make sure that the script is given the proper path",
        .path.display()
    )]
    NotAGitRepo { path: PathBuf },

    /// `git checkout` refused to switch branches.
    #[error(
        "could not switch to branch '{branch}': {reason}\nPlease make sure that the branch '{branch}' exists and all changes are committed"
    )]
    BranchSwitchFailed { branch: String, reason: String },

    /// The branch HEAD carries no tags at all.
    #[error("the HEAD commit on branch '{branch}' has no tags.\nPlease tag it as: {tag_type}/<version>")]
    NoTagOnHead { branch: String, tag_type: String },

    /// The branch HEAD is tagged, but no tag has the `<type>/<numeric>` form.
    #[error(
        "the HEAD commit on branch '{branch}' has no properly formatted tags.\nPlease tag it as: {tag_type}/<version>"
    )]
    TagMalformed { branch: String, tag_type: String },

    /// The release version does not exceed the imported upstream version.
    #[error(
        "release version '{release}' is not greater than upstream version '{upstream}', aborting"
    )]
    VersionRegression { release: String, upstream: String },

    /// An external command exited unsuccessfully or could not be spawned.
    #[error("{tool} {args} failed{}: {output}", .code.map(|c| format!(" (exit code {})", c)).unwrap_or_default())]
    ExternalCommandFailed {
        tool: String,
        args: String,
        code: Option<i32>,
        output: String,
    },

    /// The config file is missing, unreadable or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Taking or restoring a repository backup failed.
    #[error("Backup error: {0}")]
    Backup(String),

    /// Another invocation holds the repository lock.
    #[error("Lock acquisition failed: {0}")]
    Lock(String),

    /// Invalid state or input, including prompts the user declined.
    #[error("{0}")]
    User(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HelperError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        HelperError::Config(msg.into())
    }

    /// Create a backup error.
    pub fn backup(msg: impl Into<String>) -> Self {
        HelperError::Backup(msg.into())
    }

    /// Create a user error.
    pub fn user(msg: impl Into<String>) -> Self {
        HelperError::User(msg.into())
    }

    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            HelperError::NotAGitRepo { .. } => exit_codes::GIT_FAILURE,
            HelperError::BranchSwitchFailed { .. } => exit_codes::GIT_FAILURE,
            HelperError::NoTagOnHead { .. }
            | HelperError::TagMalformed { .. }
            | HelperError::VersionRegression { .. } => exit_codes::VALIDATION_FAILURE,
            HelperError::ExternalCommandFailed { tool, .. } if tool == "git" => {
                exit_codes::GIT_FAILURE
            }
            HelperError::ExternalCommandFailed { .. } => exit_codes::TOOL_FAILURE,
            HelperError::Lock(_) => exit_codes::LOCK_FAILURE,
            HelperError::Config(_)
            | HelperError::Backup(_)
            | HelperError::User(_)
            | HelperError::Io(_) => exit_codes::USER_ERROR,
        }
    }
}

/// Result type alias for gbp-helper operations.
pub type Result<T> = std::result::Result<T, HelperError>;
