//! `gbp-helper upload`
//!
//! Uploads the newest final build to `ppa:<ppaName>` with dput.

use crate::context::RepoContext;
use crate::error::{HelperError, Result};
use crate::fs::files_with_suffix;
use crate::process::run_write;
use crate::ui;
use crate::version::compare_versions;
use crate::workflow::{Outcome, Plan};
use std::path::{Path, PathBuf};
use tracing::info;

const SOURCE_CHANGES_SUFFIX: &str = "source.changes";

pub fn plan(plan: Plan) -> Plan {
    plan.step("upload latest build", upload_latest)
}

/// Version part of `<package>_<version>_source.changes`.
fn changes_version(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy().to_string();
    name.split('_').nth(1).map(str::to_string)
}

/// The `source.changes` file of the newest final build under `build_dir`.
pub fn latest_changes_file(build_dir: &Path) -> Result<Option<(PathBuf, String)>> {
    let final_dir = super::build::BuildKind::Final.dir_name();
    let mut candidates: Vec<(PathBuf, String)> =
        files_with_suffix(build_dir, SOURCE_CHANGES_SUFFIX)?
            .into_iter()
            .filter(|p| {
                p.parent()
                    .and_then(Path::file_name)
                    .is_some_and(|d| d == final_dir)
            })
            .filter_map(|p| changes_version(&p).map(|v| (p, v)))
            .collect();

    candidates.sort_by(|a, b| compare_versions(&b.1, &a.1));
    Ok(candidates.into_iter().next())
}

pub fn upload_latest(ctx: &RepoContext, outcome: &mut Outcome) -> Result<()> {
    let ppa = ctx.config.ppa_name.as_deref().ok_or_else(|| {
        HelperError::config("ppaName is not set in the config file, aborting upload")
    })?;

    let (changes, version) = latest_changes_file(&ctx.paths.build_dir)?.ok_or_else(|| {
        HelperError::user(format!(
            "no {} file found in '{}', aborting upload",
            SOURCE_CHANGES_SUFFIX,
            ctx.paths.build_dir.display()
        ))
    })?;

    if !ui::confirm(&format!("Upload the latest build (version '{}')?", version))? {
        return Err(HelperError::user("upload aborted by user"));
    }

    let target = format!("ppa:{}", ppa);
    let changes_arg = changes.to_string_lossy().to_string();
    info!("uploading '{}' to {}", changes_arg, target);
    run_write(&ctx.repo_root, ctx.safemode, "dput", &[&target, &changes_arg])?;

    outcome.uploaded = Some(changes_arg);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::context;
    use crate::test_support::create_packaging_repo;
    use tempfile::TempDir;

    fn touch(dir: &Path, rel: &str) -> PathBuf {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "").unwrap();
        path
    }

    #[test]
    fn test_latest_final_build_wins() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "1.9-1/final/hello_1.9-1_source.changes");
        let newest = touch(dir.path(), "1.10-1/final/hello_1.10-1_source.changes");
        touch(dir.path(), "2.0-1/test/hello_2.0-1_source.changes");
        touch(dir.path(), "1.10-1/final/hello_1.10-1_amd64.changes");

        let (path, version) = latest_changes_file(dir.path()).unwrap().unwrap();
        assert_eq!(path, newest);
        assert_eq!(version, "1.10-1");
    }

    #[test]
    fn test_no_final_build() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "1.0-1/test/hello_1.0-1_source.changes");
        assert!(latest_changes_file(dir.path()).unwrap().is_none());
        assert!(
            latest_changes_file(&dir.path().join("missing"))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_upload_requires_ppa_name() {
        let repo = create_packaging_repo();
        let ctx = context(&repo, "");
        let err = upload_latest(&ctx, &mut Outcome::default()).unwrap_err();
        assert!(matches!(err, HelperError::Config(_)));
    }

    #[test]
    fn test_upload_without_build_fails() {
        let repo = create_packaging_repo();
        let ctx = context(&repo, "ppaName=me/ppa\n");
        let err = upload_latest(&ctx, &mut Outcome::default()).unwrap_err();
        assert!(err.to_string().contains("aborting upload"));
        assert!(matches!(err, HelperError::User(_)));
    }
}
