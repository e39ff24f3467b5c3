//! `gbp-helper config`
//!
//! Writes an example config file to the repository root. An existing file
//! is never overwritten.

use crate::config::render_example;
use crate::error::{HelperError, Result};
use crate::fs::atomic_create;
use crate::git;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

pub fn cmd_config(path: &Path, config_path: &Path, safemode: bool) -> Result<()> {
    let repo_root = git::repo_root(path)?;
    let title = crate::context::repo_dir_name(&repo_root)?;
    write_example(&repo_root, config_path, &title, &BTreeMap::new(), safemode)?;
    Ok(())
}

/// Create `<repo_root>/<config_path>` from the example template.
pub fn write_example(
    repo_root: &Path,
    config_path: &Path,
    title: &str,
    presets: &BTreeMap<String, String>,
    safemode: bool,
) -> Result<PathBuf> {
    let target = repo_root.join(config_path);
    if target.exists() {
        return Err(HelperError::config(format!(
            "config file '{}' already exists, not overwriting it",
            target.display()
        )));
    }

    if safemode {
        info!("[safemode] skipping: write example config '{}'", target.display());
        return Ok(target);
    }

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = render_example(title, presets);
    if !atomic_create(&target, content.as_bytes())? {
        return Err(HelperError::config(format!(
            "config file '{}' already exists, not overwriting it",
            target.display()
        )));
    }

    info!("wrote example config file '{}'", target.display());
    Ok(target)
}
