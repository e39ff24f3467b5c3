//! Version tags and natural version ordering.
//!
//! Tags have the form `<tag_type>/<version>`, e.g. `release/1.2` or
//! `debian/1.2-0~ppa1`. Versions compare by their numeric fields, so
//! `1.10` sorts after `1.9`.

use crate::error::{HelperError, Result};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

/// A version: numeric dot fields, optionally followed by a Debian revision.
static VERSION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+(?:\.\d+)*(?:[-~+][0-9A-Za-z.+~-]*)?$").expect("Invalid version regex")
});

static DIGITS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("Invalid digits regex"));

/// A parsed `<tag_type>/<version>` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub tag_type: String,
    pub version: String,
}

impl Tag {
    pub fn new(tag_type: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            tag_type: tag_type.into(),
            version: version.into(),
        }
    }

    /// Parse `name` as a tag of `tag_type`.
    ///
    /// Returns `None` if the prefix differs or the version part is not numeric.
    pub fn parse(name: &str, tag_type: &str) -> Option<Self> {
        let version = name.strip_prefix(tag_type)?.strip_prefix('/')?;
        if is_valid_version(version) {
            Some(Self::new(tag_type, version))
        } else {
            None
        }
    }

    /// The full tag name as stored in git.
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tag_type, self.version)
    }
}

/// Check whether `version` starts with numeric dot fields.
pub fn is_valid_version(version: &str) -> bool {
    VERSION_REGEX.is_match(version)
}

/// Split a version string into its numeric fields, without leading zeros.
///
/// Fields stay as digit strings so that values of any length compare
/// exactly. A field of only zeros becomes `"0"`.
pub fn version_fields(version: &str) -> Vec<&str> {
    DIGITS_REGEX
        .find_iter(version)
        .map(|m| {
            let digits = m.as_str().trim_start_matches('0');
            if digits.is_empty() { "0" } else { digits }
        })
        .collect()
}

/// Numeric order of two normalized digit strings.
fn compare_field(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Compare two versions field by field.
///
/// A version that is a prefix of the other sorts first (`1.0` < `1.0.1`).
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let (a, b) = (version_fields(a), version_fields(b));
    a.iter()
        .zip(&b)
        .map(|(x, y)| compare_field(x, y))
        .find(|ord| ord.is_ne())
        .unwrap_or_else(|| a.len().cmp(&b.len()))
}

/// Checks whether the first version is lesser than the second.
pub fn is_version_lt(a: &str, b: &str) -> bool {
    compare_versions(a, b) == Ordering::Less
}

/// Checks whether the first version is greater than the second.
pub fn is_version_gt(a: &str, b: &str) -> bool {
    compare_versions(a, b) == Ordering::Greater
}

/// Pick the tag with the highest version.
pub fn latest_tag<I: IntoIterator<Item = Tag>>(tags: I) -> Option<Tag> {
    tags.into_iter()
        .max_by(|a, b| compare_versions(&a.version, &b.version))
}

/// Produce the next upstream version by incrementing the last numeric field.
///
/// Any Debian revision (`-...` or `~...`) is kept as is:
/// `1.9` -> `1.10`, `1.0-0~ppa1` -> `1.1-0~ppa1`.
pub fn next_version(version: &str) -> Result<String> {
    let split_at = version.find(['-', '~']).unwrap_or(version.len());
    let (upstream, revision) = version.split_at(split_at);

    let mut fields: Vec<String> = upstream.split('.').map(str::to_string).collect();
    let last = fields
        .last_mut()
        .filter(|f| !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| {
            HelperError::user(format!("version '{}' could not be incremented", version))
        })?;

    let incremented = last
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_add(1))
        .ok_or_else(|| {
            HelperError::user(format!("version '{}' could not be incremented", version))
        })?;
    *last = incremented.to_string();

    Ok(format!("{}{}", fields.join("."), revision))
}
