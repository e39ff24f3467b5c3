use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{LazyLock, Mutex, MutexGuard};
use tempfile::TempDir;

static CWD_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub(crate) const TEST_CONFIG: &str = "\
releaseBranch=master
releaseTagType=release
upstreamBranch=upstream
upstreamTagType=upstream
debianBranch=debian
debianTagType=debian
";

pub(crate) struct DirGuard {
    original: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl DirGuard {
    pub(crate) fn new(new_dir: &Path) -> Self {
        // Changing the process current working directory is global and not thread-safe.
        // Lock it so tests don't race even if a #[serial] annotation is missed.
        let lock = CWD_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(new_dir).unwrap();
        Self {
            original,
            _lock: lock,
        }
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.original);
    }
}

/// A git repository at `<tempdir>/hello`, so `../build-area` stays inside
/// the temp dir.
pub(crate) struct TestRepo {
    pub(crate) dir: TempDir,
    root: PathBuf,
}

impl TestRepo {
    pub(crate) fn path(&self) -> &Path {
        &self.root
    }

    /// Scratch dir used as the tmp root for backups, locks and tarballs.
    pub(crate) fn tmp_root(&self) -> PathBuf {
        let tmp = self.dir.path().join("tmp");
        std::fs::create_dir_all(&tmp).unwrap();
        tmp
    }
}

/// A repository with a single commit on `master`.
pub(crate) fn create_test_repo() -> TestRepo {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("hello");
    std::fs::create_dir(&root).unwrap();

    git(&root, &["init"]);
    // Deterministic default branch name across environments.
    git(&root, &["symbolic-ref", "HEAD", "refs/heads/master"]);

    git(&root, &["config", "user.email", "test@example.com"]);
    git(&root, &["config", "user.name", "Test User"]);
    git(&root, &["config", "commit.gpgsign", "false"]);
    git(&root, &["config", "tag.gpgsign", "false"]);

    std::fs::write(root.join("README.md"), "# Test\n").unwrap();
    git(&root, &["add", "."]);
    git(&root, &["commit", "-m", "Initial commit"]);

    TestRepo { dir, root }
}

/// A repository laid out for packaging: config committed on `master`,
/// `upstream` and `debian` branches created from it, `master` checked out.
pub(crate) fn create_packaging_repo() -> TestRepo {
    let repo = create_test_repo();
    write_config(repo.path(), "");
    git(repo.path(), &["branch", "upstream"]);
    git(repo.path(), &["branch", "debian"]);
    repo
}

/// Write the test config plus `extra` lines and commit it on the current branch.
pub(crate) fn write_config(repo: &Path, extra: &str) {
    commit_file(
        repo,
        crate::config::DEFAULT_CONFIG_PATH,
        &format!("{}{}", TEST_CONFIG, extra),
        "Add config",
    );
}

pub(crate) fn commit_file(repo: &Path, name: &str, content: &str, message: &str) {
    let path = repo.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    git(repo, &["add", "."]);
    git(repo, &["commit", "-m", message]);
}

/// Run git and return trimmed stdout, panicking on failure.
pub(crate) fn git(repo_dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .current_dir(repo_dir)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to execute git {}: {}", args.join(" "), e));

    if !output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!(
            "git {} failed (exit code {:?})\nstdout:\n{}\nstderr:\n{}",
            args.join(" "),
            output.status.code(),
            stdout,
            stderr
        );
    }

    String::from_utf8_lossy(&output.stdout).trim().to_string()
}
