//! Config struct definition.

use super::types::*;
use serde::Deserialize;

/// Configuration for the packaging workflow.
///
/// Immutable once loaded; every command receives it by reference.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    // =========================================================================
    // Branches and tags (required)
    // =========================================================================
    /// Branch holding the upstream-facing release history.
    pub release_branch: String,

    /// Tag prefix for release tags (`<type>/<version>`).
    pub release_tag_type: String,

    /// Branch tracking imported upstream tarballs.
    pub upstream_branch: String,

    /// Tag prefix for upstream import tags.
    pub upstream_tag_type: String,

    /// Branch holding the Debian packaging metadata.
    pub debian_branch: String,

    /// Tag prefix for Debian build tags.
    pub debian_tag_type: String,

    // =========================================================================
    // Signing
    // =========================================================================
    /// GPG key used for signing tags and builds. Signing is disabled when unset.
    #[serde(default)]
    pub gpg_key_id: Option<String>,

    // =========================================================================
    // Package
    // =========================================================================
    /// Source package name; defaults to the repository directory name.
    #[serde(default)]
    pub package_name: Option<String>,

    /// Distribution written to new changelog entries.
    #[serde(default)]
    pub distribution: Option<String>,

    #[serde(default = "default_urgency")]
    pub urgency: String,

    /// Appended to the upstream version to form the Debian version.
    #[serde(default = "default_debian_version_suffix")]
    pub debian_version_suffix: String,

    /// Files left out of the upstream tarball.
    #[serde(
        default = "default_exclude_files",
        deserialize_with = "deserialize_list"
    )]
    pub exclude_files: Vec<String>,

    // =========================================================================
    // Build
    // =========================================================================
    /// Extra builder flags for commit-build (shell words).
    #[serde(default)]
    pub build_flags: Option<String>,

    /// Extra builder flags for test builds (shell words).
    #[serde(default)]
    pub test_build_flags: Option<String>,

    // =========================================================================
    // Upload and system
    // =========================================================================
    /// Target PPA, uploaded to as `ppa:<name>`.
    #[serde(default)]
    pub ppa_name: Option<String>,

    #[serde(default = "default_editor_cmd")]
    pub editor_cmd: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            release_branch: "master".to_string(),
            release_tag_type: "release".to_string(),
            upstream_branch: "upstream".to_string(),
            upstream_tag_type: "upstream".to_string(),
            debian_branch: "debian".to_string(),
            debian_tag_type: "debian".to_string(),
            gpg_key_id: None,
            package_name: None,
            distribution: None,
            urgency: default_urgency(),
            debian_version_suffix: default_debian_version_suffix(),
            exclude_files: default_exclude_files(),
            build_flags: None,
            test_build_flags: None,
            ppa_name: None,
            editor_cmd: default_editor_cmd(),
        }
    }
}
