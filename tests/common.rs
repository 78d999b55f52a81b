#![allow(dead_code)]

use git_sync::error::{Result, SyncError};
use git_sync::{GitOutput, Probe, Vcs};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Once;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Scripted state of one repository behind [`FakeVcs`].
#[derive(Debug, Clone)]
pub struct FakeRepo {
    pub exists: bool,
    pub dirty: bool,
    pub remotes: Vec<String>,
    pub branch: Option<String>,
    pub has_commits: bool,
    /// Whether `refs/remotes/origin/<branch>` exists locally.
    pub tracking: bool,
    /// Whether the branch exists on the remote; fetch creates `tracking`.
    pub remote_has_branch: bool,
    pub ahead: u32,
    pub behind: u32,
    pub fetch_error: Option<String>,
    pub rebase_conflict: bool,
    pub push_rejected: bool,
    /// `status` fails outright, as if git were broken for this path.
    pub broken: bool,
}

impl Default for FakeRepo {
    fn default() -> Self {
        Self {
            exists: true,
            dirty: false,
            remotes: vec!["origin".to_string()],
            branch: Some("main".to_string()),
            has_commits: true,
            tracking: true,
            remote_has_branch: true,
            ahead: 0,
            behind: 0,
            fetch_error: None,
            rebase_conflict: false,
            push_rejected: false,
            broken: false,
        }
    }
}

impl FakeRepo {
    /// A directory that is not a repository yet.
    pub fn missing() -> Self {
        Self {
            exists: false,
            remotes: Vec::new(),
            branch: None,
            has_commits: false,
            tracking: false,
            remote_has_branch: false,
            ..Self::default()
        }
    }
}

/// In-memory [`Vcs`] that records every call per repository path.
#[derive(Default)]
pub struct FakeVcs {
    repos: RefCell<HashMap<PathBuf, FakeRepo>>,
    calls: RefCell<Vec<(PathBuf, String)>>,
    pub messages: RefCell<Vec<String>>,
}

impl FakeVcs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repo(self, path: impl Into<PathBuf>, repo: FakeRepo) -> Self {
        self.repos.borrow_mut().insert(path.into(), repo);
        self
    }

    pub fn repo(&self, path: &Path) -> FakeRepo {
        self.repos.borrow().get(path).cloned().unwrap_or_default()
    }

    pub fn calls(&self, path: &Path) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, c)| c.clone())
            .collect()
    }

    pub fn count(&self, path: &Path, prefix: &str) -> usize {
        self.calls(path)
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    fn record(&self, path: &Path, call: impl Into<String>) {
        self.calls
            .borrow_mut()
            .push((path.to_path_buf(), call.into()));
    }

    fn with<T>(&self, path: &Path, f: impl FnOnce(&mut FakeRepo) -> T) -> T {
        let mut repos = self.repos.borrow_mut();
        f(repos.entry(path.to_path_buf()).or_default())
    }
}

impl Vcs for FakeVcs {
    fn is_repository(&self, workdir: &Path) -> bool {
        self.with(workdir, |r| r.exists)
    }

    fn init(&self, workdir: &Path, initial_branch: Option<&str>) -> Result<GitOutput> {
        match initial_branch {
            Some(b) => self.record(workdir, format!("init -b {}", b)),
            None => self.record(workdir, "init"),
        }
        self.with(workdir, |r| r.exists = true);
        Ok(GitOutput::ok(""))
    }

    fn status_porcelain(&self, workdir: &Path) -> Result<String> {
        self.record(workdir, "status");
        self.with(workdir, |r| {
            if r.broken {
                Err(SyncError::Git("status: fatal: not a git repository".to_string()))
            } else if r.dirty {
                Ok(" M notes.md\n".to_string())
            } else {
                Ok(String::new())
            }
        })
    }

    fn add_all(&self, workdir: &Path) -> Result<()> {
        self.record(workdir, "add -A");
        Ok(())
    }

    fn commit(&self, workdir: &Path, message: &str) -> Result<GitOutput> {
        self.record(workdir, "commit");
        self.messages.borrow_mut().push(message.to_string());
        Ok(self.with(workdir, |r| {
            if !r.dirty {
                return GitOutput::failed(1, "nothing to commit, working tree clean");
            }
            r.dirty = false;
            r.has_commits = true;
            r.ahead += 1;
            if r.branch.is_none() {
                r.branch = Some("main".to_string());
            }
            GitOutput::ok("")
        }))
    }

    fn remotes(&self, workdir: &Path) -> Result<Vec<String>> {
        Ok(self.with(workdir, |r| r.remotes.clone()))
    }

    fn add_remote(&self, workdir: &Path, name: &str, url: &str) -> Result<GitOutput> {
        self.record(workdir, format!("remote add {} {}", name, url));
        self.with(workdir, |r| r.remotes.push(name.to_string()));
        Ok(GitOutput::ok(""))
    }

    fn current_branch(&self, workdir: &Path) -> Result<Option<String>> {
        Ok(self.with(workdir, |r| {
            if r.has_commits {
                r.branch.clone()
            } else {
                None
            }
        }))
    }

    fn checkout_branch(&self, workdir: &Path, branch: &str) -> Result<GitOutput> {
        self.record(workdir, format!("checkout -B {}", branch));
        self.with(workdir, |r| r.branch = Some(branch.to_string()));
        Ok(GitOutput::ok(""))
    }

    fn fetch(&self, workdir: &Path, remote: &str, branch: &str) -> Result<GitOutput> {
        self.record(workdir, format!("fetch {} {}", remote, branch));
        Ok(self.with(workdir, |r| {
            if let Some(error) = &r.fetch_error {
                return GitOutput::failed(128, error.clone());
            }
            if !r.remote_has_branch {
                return GitOutput::failed(
                    128,
                    format!("fatal: couldn't find remote ref {}", branch),
                );
            }
            r.tracking = true;
            GitOutput::ok("")
        }))
    }

    fn rebase(&self, workdir: &Path, upstream: &str) -> Result<GitOutput> {
        self.record(workdir, format!("rebase {}", upstream));
        Ok(self.with(workdir, |r| {
            if r.rebase_conflict {
                return GitOutput::failed(1, "CONFLICT (content): Merge conflict in notes.md");
            }
            r.behind = 0;
            GitOutput::ok("")
        }))
    }

    fn rebase_abort(&self, workdir: &Path) -> Result<GitOutput> {
        self.record(workdir, "rebase --abort");
        Ok(GitOutput::ok(""))
    }

    fn push(&self, workdir: &Path, remote: &str, branch: &str) -> Result<GitOutput> {
        self.record(workdir, format!("push {} {}", remote, branch));
        Ok(self.with(workdir, |r| {
            if r.push_rejected {
                return GitOutput::failed(1, "! [rejected] main -> main (fetch first)");
            }
            r.ahead = 0;
            r.tracking = true;
            r.remote_has_branch = true;
            GitOutput::ok("")
        }))
    }

    fn has_ref(&self, workdir: &Path, _refname: &str) -> Result<bool> {
        Ok(self.with(workdir, |r| r.tracking))
    }

    fn ahead_behind(&self, workdir: &Path, upstream: &str, branch: &str) -> Result<(u32, u32)> {
        self.record(workdir, format!("rev-list {}...{}", upstream, branch));
        Ok(self.with(workdir, |r| (r.ahead, r.behind)))
    }

    fn has_commits(&self, workdir: &Path) -> Result<bool> {
        Ok(self.with(workdir, |r| r.has_commits))
    }
}

/// Probe with a fixed answer that counts how often it was asked.
pub struct FakeProbe {
    online: Cell<bool>,
    pub probes: Cell<usize>,
}

impl FakeProbe {
    pub fn online() -> Self {
        Self {
            online: Cell::new(true),
            probes: Cell::new(0),
        }
    }

    pub fn offline() -> Self {
        Self {
            online: Cell::new(false),
            probes: Cell::new(0),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.set(online);
    }
}

impl Probe for FakeProbe {
    fn reachable(&self, _host: &str, _port: u16) -> bool {
        self.probes.set(self.probes.get() + 1);
        self.online.get()
    }
}

static GIT_IDENTITY: Once = Once::new();

/// Give git a committer identity so real commits work on bare CI machines.
pub fn git_identity() {
    GIT_IDENTITY.call_once(|| {
        for (key, value) in git_identity_env() {
            std::env::set_var(key, value);
        }
    });
}

/// Identity plus isolation from the user's global and system git config.
pub fn git_identity_env() -> [(&'static str, &'static str); 6] {
    [
        ("GIT_CONFIG_NOSYSTEM", "1"),
        ("GIT_CONFIG_GLOBAL", "/dev/null"),
        ("GIT_AUTHOR_NAME", "git-sync tests"),
        ("GIT_AUTHOR_EMAIL", "tests@git-sync.invalid"),
        ("GIT_COMMITTER_NAME", "git-sync tests"),
        ("GIT_COMMITTER_EMAIL", "tests@git-sync.invalid"),
    ]
}

/// Run git in `dir`, panicking with its output on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    git_identity();
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// An empty bare repository usable as a local `origin`.
pub fn create_bare_remote(temp: &TempDir) -> PathBuf {
    let remote = temp.path().join("remote.git");
    std::fs::create_dir_all(&remote).expect("Failed to create remote dir");
    git(&remote, &["init", "--bare", "-q"]);
    remote
}

/// Clone `main` of `remote` into `temp/<name>`, standing in for another
/// machine.
pub fn clone_remote(temp: &TempDir, remote: &Path, name: &str) -> PathBuf {
    let target = temp.path().join(name);
    git(
        temp.path(),
        &[
            "clone",
            "-q",
            "-b",
            "main",
            remote.to_str().unwrap(),
            target.to_str().unwrap(),
        ],
    );
    target
}

/// Isolated config and data directories for CLI runs.
pub struct TestConfigContext {
    pub temp_dir: TempDir,
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl Default for TestConfigContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestConfigContext {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_dir = temp_dir.path().join("config");
        let data_dir = temp_dir.path().join("data");
        Self {
            temp_dir,
            config_dir,
            data_dir,
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// The binary under test with this context's directories and a git
    /// identity.
    pub fn command(&self) -> assert_cmd::Command {
        assert_cmd::Command::from_std(self.spawnable())
    }

    /// Same as [`TestConfigContext::command`], for runs the test has to
    /// signal while they are still going.
    pub fn spawnable(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin("git-sync"));
        cmd.env("GIT_SYNC_CONFIG_DIR", &self.config_dir)
            .env("GIT_SYNC_DATA_DIR", &self.data_dir)
            .env("GIT_SYNC_LOG", "info");
        for (key, value) in git_identity_env() {
            cmd.env(key, value);
        }
        cmd
    }
}

/// Poll `condition` every 50ms until it holds or `limit` passes.
pub fn wait_until(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + limit;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}
