//! External command runner.
//!
//! Every external collaborator (`git`, `gbp`, `tar`, `lintian`, `dput`, ...)
//! is invoked through this module so that output capture and error mapping
//! behave the same everywhere. Commands run to completion; there are no
//! timeouts.

use crate::error::{HelperError, Result};
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tracing::{debug, info};

/// Result of a successful command execution.
#[derive(Debug, Clone)]
pub struct CmdOutput {
    /// Standard output from the command (trimmed).
    pub stdout: String,
    /// Standard error from the command (trimmed).
    pub stderr: String,
}

impl CmdOutput {
    fn from_output(output: &Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }

    /// Returns true if stdout is empty.
    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty()
    }

    /// Returns stdout lines as a vector.
    pub fn lines(&self) -> Vec<&str> {
        if self.stdout.is_empty() {
            Vec::new()
        } else {
            self.stdout.lines().collect()
        }
    }
}

/// Run `program` with `args` in `cwd`, capturing stdout and stderr.
///
/// # Returns
///
/// * `Ok(CmdOutput)` - On exit code 0
/// * `Err(HelperError::ExternalCommandFailed)` - On spawn failure or non-zero exit
pub fn run_cmd<P: AsRef<Path>>(cwd: P, program: &str, args: &[&str]) -> Result<CmdOutput> {
    let cwd = cwd.as_ref();
    debug!("running: {} {}", program, args.join(" "));

    let output = Command::new(program)
        .current_dir(cwd)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| HelperError::ExternalCommandFailed {
            tool: program.to_string(),
            args: args.join(" "),
            code: None,
            output: format!("failed to execute: {} (is {} installed?)", e, program),
        })?;

    let cmd_output = CmdOutput::from_output(&output);

    if output.status.success() {
        Ok(cmd_output)
    } else {
        Err(HelperError::ExternalCommandFailed {
            tool: program.to_string(),
            args: args.join(" "),
            code: output.status.code(),
            output: if cmd_output.stderr.is_empty() {
                cmd_output.stdout
            } else {
                cmd_output.stderr
            },
        })
    }
}

/// Run a command that writes files or changes state, unless in safemode.
pub fn run_write<P: AsRef<Path>>(
    cwd: P,
    safemode: bool,
    program: &str,
    args: &[&str],
) -> Result<()> {
    if safemode {
        info!("[safemode] skipping: {} {}", program, args.join(" "));
        return Ok(());
    }
    run_cmd(cwd, program, args).map(|_| ())
}

/// Run `program` attached to the terminal, for interactive tools like editors.
pub fn run_interactive<P: AsRef<Path>>(cwd: P, program: &str, args: &[&str]) -> Result<()> {
    debug!("running interactively: {} {}", program, args.join(" "));

    let status = Command::new(program)
        .current_dir(cwd.as_ref())
        .args(args)
        .status()
        .map_err(|e| HelperError::ExternalCommandFailed {
            tool: program.to_string(),
            args: args.join(" "),
            code: None,
            output: format!("failed to execute: {}", e),
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(HelperError::ExternalCommandFailed {
            tool: program.to_string(),
            args: args.join(" "),
            code: status.code(),
            output: String::new(),
        })
    }
}
