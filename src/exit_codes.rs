//! Exit code constants for the gbp-helper CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, config problems, aborted prompts)
//! - 2: Tag or version validation failure
//! - 3: Git operation failure
//! - 4: External tool failure (gbp, tar, lintian, dput, ...)
//! - 5: Repository lock held by another invocation

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid config, or aborted by the user.
pub const USER_ERROR: i32 = 1;

/// Validation failure: missing or malformed tags, version regressions.
pub const VALIDATION_FAILURE: i32 = 2;

/// Git operation failure: not a repository, checkout or other git errors.
pub const GIT_FAILURE: i32 = 3;

/// An external packaging tool exited unsuccessfully.
pub const TOOL_FAILURE: i32 = 4;

/// The repository lock could not be acquired.
pub const LOCK_FAILURE: i32 = 5;
