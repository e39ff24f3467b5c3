//! Config loading, validation, and example rendering.

use super::model::Config;
use super::types::{SETTINGS, setting};
use crate::error::{HelperError, Result};
use crate::git;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Branch the config is read from when the working tree has no copy.
const CONFIG_FALLBACK_BRANCH: &str = "master";

/// Parse `key=value` lines into a map.
///
/// Comment lines (`#`), blank lines and lines without `=` are skipped.
/// Keys and values are trimmed; a later duplicate key wins.
pub fn parse_key_values(content: &str) -> BTreeMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

/// Render an example config file.
///
/// `presets` override the default value of individual keys.
pub fn render_example(title: &str, presets: &BTreeMap<String, String>) -> String {
    let mut out = format!("## {}: {}\n\n#[REQUIRED]\n\n", super::DEFAULT_CONFIG_PATH, title);

    let mut optional_header_written = false;
    for setting in SETTINGS {
        if !setting.required && !optional_header_written {
            out.push_str("\n#[OPTIONAL]\n\n");
            optional_header_written = true;
        }
        let value = presets
            .get(setting.key)
            .map(String::as_str)
            .or(setting.default)
            .unwrap_or("");
        out.push_str(&format!("{}={}\n", setting.key, value));
    }

    out
}

/// A name usable as one directory component: not empty, `.` or `..`, and
/// without path separators.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

impl Config {
    /// Load config from a file on disk.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(HelperError::Config)` - Missing file, missing keys or invalid values
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            HelperError::config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::parse(&content)
    }

    /// Load the config for a repository.
    ///
    /// `config_path` is resolved against `repo_root`. When the file is not in
    /// the working tree, it is read from the `master` branch with `git show`.
    pub fn load_for_repo(repo_root: &Path, config_path: &Path) -> Result<Self> {
        let full_path = repo_root.join(config_path);
        if full_path.exists() {
            debug!("reading config file '{}'", full_path.display());
            return Self::load(&full_path);
        }

        let rel = config_path.to_string_lossy();
        debug!(
            "config '{}' not in working tree, trying branch '{}'",
            rel, CONFIG_FALLBACK_BRANCH
        );
        match git::show_file(repo_root, CONFIG_FALLBACK_BRANCH, &rel) {
            Ok(content) => Self::parse(&content),
            Err(_) => Err(HelperError::config(format!(
                "the config file '{}' could not be found.\nRun `gbp-helper config` to create an example file",
                full_path.display()
            ))),
        }
    }

    /// Parse config from `key=value` text.
    pub fn parse(content: &str) -> Result<Self> {
        let mut map = Map::new();
        for (key, value) in parse_key_values(content) {
            if setting(&key).is_none() {
                warn!("ignoring unknown config key '{}'", key);
                continue;
            }
            if value.is_empty() {
                continue;
            }
            map.insert(key, Value::String(value));
        }

        let config: Config = serde_json::from_value(Value::Object(map)).map_err(|e| {
            HelperError::config(format!("invalid config: {} (required keys cannot be empty)", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate config values.
    ///
    /// - tag types must not contain `/` or whitespace
    /// - the package name must be a single path component
    /// - build flags must be valid shell words
    pub fn validate(&self) -> Result<()> {
        for (key, tag_type) in [
            ("releaseTagType", &self.release_tag_type),
            ("upstreamTagType", &self.upstream_tag_type),
            ("debianTagType", &self.debian_tag_type),
        ] {
            if tag_type.contains('/') || tag_type.chars().any(char::is_whitespace) {
                return Err(HelperError::config(format!(
                    "{} must not contain '/' or whitespace (found '{}')",
                    key, tag_type
                )));
            }
        }

        if let Some(package) = &self.package_name
            && !is_plain_file_name(package)
        {
            return Err(HelperError::config(format!(
                "packageName must be a plain name without '/' (found '{}')",
                package
            )));
        }

        for (key, flags) in [
            ("buildFlags", &self.build_flags),
            ("testBuildFlags", &self.test_build_flags),
        ] {
            if let Some(flags) = flags {
                shell_words::split(flags).map_err(|e| {
                    HelperError::config(format!("{} could not be parsed: {}", key, e))
                })?;
            }
        }

        Ok(())
    }

    /// The package name, falling back to `fallback` (the repository name).
    pub fn package_name_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.package_name.as_deref().unwrap_or(fallback)
    }

    /// Split `buildFlags` or `testBuildFlags` into words.
    pub fn flag_words(&self, test_build: bool) -> Vec<String> {
        let flags = if test_build {
            &self.test_build_flags
        } else {
            &self.build_flags
        };
        flags
            .as_deref()
            .and_then(|f| shell_words::split(f).ok())
            .unwrap_or_default()
    }
}
