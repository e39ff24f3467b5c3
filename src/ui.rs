//! Interactive prompts.
//!
//! The `_with` variants take explicit reader and writer so tests can script
//! the answers; the plain functions use stdin and stdout.

use crate::error::{HelperError, Result};
use std::io::{self, BufRead, Write};

/// Ask a yes/no question. Anything but `y`/`yes` counts as no.
pub fn confirm(prompt: &str) -> Result<bool> {
    confirm_with(&mut io::stdin().lock(), &mut io::stdout(), prompt)
}

pub fn confirm_with<R: BufRead, W: Write>(input: &mut R, output: &mut W, prompt: &str) -> Result<bool> {
    write!(output, "{} (y/N): ", prompt)?;
    output.flush()?;

    let response = read_answer(input)?.to_lowercase();
    Ok(response == "y" || response == "yes")
}

/// Ask for a line of text.
///
/// An empty answer takes `default`; with no default it is an error.
pub fn prompt_input(prompt: &str, default: Option<&str>) -> Result<String> {
    prompt_input_with(&mut io::stdin().lock(), &mut io::stdout(), prompt, default)
}

pub fn prompt_input_with<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
    default: Option<&str>,
) -> Result<String> {
    match default {
        Some(d) => write!(output, "{} [{}]: ", prompt, d)?,
        None => write!(output, "{}: ", prompt)?,
    }
    output.flush()?;

    let answer = read_answer(input)?;
    if !answer.is_empty() {
        return Ok(answer);
    }
    default
        .map(str::to_string)
        .ok_or_else(|| HelperError::user(format!("no value given for '{}', aborting", prompt)))
}

fn read_answer<R: BufRead>(input: &mut R) -> Result<String> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(HelperError::user("input closed, aborting"));
    }
    Ok(line.trim().to_string())
}
