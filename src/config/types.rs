//! Config keys, defaults and the example file layout.

use serde::{Deserialize, Deserializer};

/// Default config file name, relative to the repository root.
pub const DEFAULT_CONFIG_PATH: &str = "gbp-helper.conf";

/// A recognised config key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Setting {
    /// Key as written in the file (camelCase).
    pub key: &'static str,
    /// Value written to the example file.
    pub default: Option<&'static str>,
    /// Whether loading fails without it.
    pub required: bool,
}

const fn required(key: &'static str, default: &'static str) -> Setting {
    Setting {
        key,
        default: Some(default),
        required: true,
    }
}

const fn optional(key: &'static str, default: Option<&'static str>) -> Setting {
    Setting {
        key,
        default,
        required: false,
    }
}

/// Every key in the order it appears in the example file.
pub const SETTINGS: &[Setting] = &[
    required("releaseBranch", "master"),
    required("releaseTagType", "release"),
    required("upstreamBranch", "upstream"),
    required("upstreamTagType", "upstream"),
    required("debianBranch", "debian"),
    required("debianTagType", "debian"),
    optional("gpgKeyId", None),
    optional("packageName", None),
    optional("distribution", None),
    optional("urgency", Some("low")),
    optional("debianVersionSuffix", Some("-0~ppa1")),
    optional("excludeFiles", Some("gbp-helper.conf,README.md,LICENSE")),
    optional("buildFlags", None),
    optional("testBuildFlags", None),
    optional("ppaName", None),
    optional("editorCmd", Some("editor")),
];

/// Look up a setting by key.
pub fn setting(key: &str) -> Option<&'static Setting> {
    SETTINGS.iter().find(|s| s.key == key)
}

/// Default value for a key, if it has one.
pub fn default_for(key: &str) -> Option<&'static str> {
    setting(key).and_then(|s| s.default)
}

// Default value functions for serde
pub(crate) fn default_urgency() -> String {
    "low".to_string()
}
pub(crate) fn default_debian_version_suffix() -> String {
    "-0~ppa1".to_string()
}
pub(crate) fn default_exclude_files() -> Vec<String> {
    split_list("gbp-helper.conf,README.md,LICENSE")
}
pub(crate) fn default_editor_cmd() -> String {
    "editor".to_string()
}

/// Split a comma separated list, dropping blank entries.
pub(crate) fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn deserialize_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(split_list(&raw))
}
