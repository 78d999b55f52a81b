use crate::config::DEFAULT_GIT_TIMEOUT_SECS;
use crate::error::{Result, SyncError};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

/// Captured result of a single git invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    fn from_status(status: ExitStatus, stdout: Vec<u8>, stderr: Vec<u8>) -> Self {
        Self {
            success: status.success(),
            code: status.code(),
            stdout: String::from_utf8_lossy(&stdout).to_string(),
            stderr: String::from_utf8_lossy(&stderr).to_string(),
        }
    }

    /// The most useful diagnostic text: stderr, or stdout when stderr is empty.
    pub fn message(&self) -> &str {
        if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        }
    }

    /// True when a fetch failed only because the branch does not exist on the
    /// remote yet (an empty or freshly created remote).
    pub fn is_missing_remote_ref(&self) -> bool {
        let lower = self.message().to_lowercase();
        !self.success && lower.contains("couldn't find remote ref")
    }

    fn into_result(self, error_prefix: &str) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(SyncError::Git(format!("{}: {}", error_prefix, self.message())))
        }
    }
}

/// Version-control operations needed by the sync procedure.
///
/// Methods returning `GitOutput` report a non-zero exit as data so callers can
/// branch on it. Every method returns `Err` when git could not be run at all or
/// exceeded its timeout.
pub trait Vcs {
    /// Whether `workdir` already holds repository metadata.
    fn is_repository(&self, workdir: &Path) -> bool;

    /// `git init`, optionally with `-b <initial_branch>`.
    fn init(&self, workdir: &Path, initial_branch: Option<&str>) -> Result<GitOutput>;

    /// Porcelain status lines; empty when the working tree is clean.
    fn status_porcelain(&self, workdir: &Path) -> Result<String>;

    fn add_all(&self, workdir: &Path) -> Result<()>;

    fn commit(&self, workdir: &Path, message: &str) -> Result<GitOutput>;

    /// Names of configured remotes.
    fn remotes(&self, workdir: &Path) -> Result<Vec<String>>;

    fn add_remote(&self, workdir: &Path, name: &str, url: &str) -> Result<GitOutput>;

    /// Checked-out branch name, or `None` when HEAD cannot be resolved (for
    /// example before the first commit).
    fn current_branch(&self, workdir: &Path) -> Result<Option<String>>;

    /// `git checkout -B <branch>`.
    fn checkout_branch(&self, workdir: &Path, branch: &str) -> Result<GitOutput>;

    fn fetch(&self, workdir: &Path, remote: &str, branch: &str) -> Result<GitOutput>;

    fn rebase(&self, workdir: &Path, upstream: &str) -> Result<GitOutput>;

    fn rebase_abort(&self, workdir: &Path) -> Result<GitOutput>;

    fn push(&self, workdir: &Path, remote: &str, branch: &str) -> Result<GitOutput>;

    /// Whether a fully qualified ref such as `refs/remotes/origin/main` exists.
    fn has_ref(&self, workdir: &Path, refname: &str) -> Result<bool>;

    /// `(ahead, behind)` of `branch` relative to `upstream`.
    fn ahead_behind(&self, workdir: &Path, upstream: &str, branch: &str) -> Result<(u32, u32)>;

    /// Whether HEAD points at a commit.
    fn has_commits(&self, workdir: &Path) -> Result<bool>;
}

/// [`Vcs`] backed by the `git` executable, one subprocess per call.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
    timeout: Duration,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_GIT_TIMEOUT_SECS))
    }
}

impl GitCli {
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: PathBuf::from("git"),
            timeout,
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run git in `workdir` and capture its output. A non-zero exit is not an
    /// error here; exceeding the timeout is, and the child's process group is
    /// killed.
    ///
    /// The deadline covers reading both pipes, so a helper that inherited
    /// them cannot hold the call open after git itself exits. The child runs
    /// in its own process group and never sees a terminal's Ctrl-C.
    pub fn run(&self, workdir: &Path, args: &[&str]) -> Result<GitOutput> {
        let command_line = args.join(" ");
        tracing::debug!("git {} (in {})", command_line, workdir.display());

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.run_async(workdir, args, command_line))
    }

    async fn run_async(
        &self,
        workdir: &Path,
        args: &[&str],
        command_line: String,
    ) -> Result<GitOutput> {
        let mut child = Command::new(&self.program)
            .args(args)
            .current_dir(workdir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SyncError::GitSpawn {
                command: command_line.clone(),
                workdir: workdir.to_path_buf(),
                source,
            })?;

        let group = child.id().map(|pid| Pid::from_raw(pid as i32));
        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();
        let collect = async {
            let mut stdout = Vec::new();
            let mut stderr = Vec::new();
            let (status, _, _) = tokio::join!(
                child.wait(),
                read_pipe(stdout_pipe.as_mut(), &mut stdout),
                read_pipe(stderr_pipe.as_mut(), &mut stderr),
            );
            status.map(|status| GitOutput::from_status(status, stdout, stderr))
        };

        let finished = tokio::time::timeout(self.timeout, collect).await;
        match finished {
            Ok(output) => Ok(output?),
            Err(_) => {
                kill_group(group, &mut child);
                if let Err(e) = child.wait().await {
                    tracing::warn!("Failed to reap timed out git process: {}", e);
                }
                Err(SyncError::GitTimeout {
                    command: command_line,
                    workdir: workdir.to_path_buf(),
                    secs: self.timeout.as_secs(),
                })
            }
        }
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<&mut R>, buf: &mut Vec<u8>) {
    if let Some(pipe) = pipe {
        let _ = pipe.read_to_end(buf).await;
    }
}

/// Kill everything left in the child's process group. Falls back to the child
/// alone when the group is already empty.
fn kill_group(group: Option<Pid>, child: &mut Child) {
    if let Some(pgid) = group {
        if signal::killpg(pgid, Signal::SIGKILL).is_ok() {
            return;
        }
    }
    if let Err(e) = child.start_kill() {
        tracing::debug!("Timed out git process already exited: {}", e);
    }
}

impl Vcs for GitCli {
    fn is_repository(&self, workdir: &Path) -> bool {
        workdir.join(".git").exists()
    }

    fn init(&self, workdir: &Path, initial_branch: Option<&str>) -> Result<GitOutput> {
        match initial_branch {
            Some(branch) => self.run(workdir, &["init", "-b", branch]),
            None => self.run(workdir, &["init"]),
        }
    }

    fn status_porcelain(&self, workdir: &Path) -> Result<String> {
        let output = self
            .run(workdir, &["status", "--porcelain"])?
            .into_result("Failed to check for uncommitted changes")?;
        Ok(output.stdout)
    }

    fn add_all(&self, workdir: &Path) -> Result<()> {
        self.run(workdir, &["add", "-A"])?
            .into_result("Failed to stage changes")?;
        Ok(())
    }

    fn commit(&self, workdir: &Path, message: &str) -> Result<GitOutput> {
        self.run(workdir, &["commit", "-m", message])
    }

    fn remotes(&self, workdir: &Path) -> Result<Vec<String>> {
        let output = self
            .run(workdir, &["remote"])?
            .into_result("Failed to list remotes")?;
        Ok(parse_remote_names(&output.stdout))
    }

    fn add_remote(&self, workdir: &Path, name: &str, url: &str) -> Result<GitOutput> {
        self.run(workdir, &["remote", "add", name, url])
    }

    fn current_branch(&self, workdir: &Path) -> Result<Option<String>> {
        let output = self.run(workdir, &["rev-parse", "--abbrev-ref", "HEAD"])?;
        if !output.success {
            return Ok(None);
        }
        let branch = output.stdout.trim();
        if branch.is_empty() {
            Ok(None)
        } else {
            Ok(Some(branch.to_string()))
        }
    }

    fn checkout_branch(&self, workdir: &Path, branch: &str) -> Result<GitOutput> {
        self.run(workdir, &["checkout", "-B", branch])
    }

    fn fetch(&self, workdir: &Path, remote: &str, branch: &str) -> Result<GitOutput> {
        self.run(workdir, &["fetch", "--prune", remote, branch])
    }

    fn rebase(&self, workdir: &Path, upstream: &str) -> Result<GitOutput> {
        self.run(workdir, &["rebase", upstream])
    }

    fn rebase_abort(&self, workdir: &Path) -> Result<GitOutput> {
        self.run(workdir, &["rebase", "--abort"])
    }

    fn push(&self, workdir: &Path, remote: &str, branch: &str) -> Result<GitOutput> {
        self.run(workdir, &["push", "-u", remote, branch])
    }

    fn has_ref(&self, workdir: &Path, refname: &str) -> Result<bool> {
        let output = self.run(workdir, &["show-ref", "--verify", "--quiet", refname])?;
        Ok(output.success)
    }

    fn ahead_behind(&self, workdir: &Path, upstream: &str, branch: &str) -> Result<(u32, u32)> {
        let range = format!("{}...{}", upstream, branch);
        let output = self
            .run(workdir, &["rev-list", "--left-right", "--count", &range])?
            .into_result("Failed to count commits")?;
        parse_left_right_count(&output.stdout)
    }

    fn has_commits(&self, workdir: &Path) -> Result<bool> {
        let output = self.run(workdir, &["rev-parse", "--verify", "--quiet", "HEAD"])?;
        Ok(output.success)
    }
}

pub fn parse_remote_names(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `rev-list --left-right --count upstream...branch` output into
/// `(ahead, behind)`. The left column counts commits only on `upstream`.
pub fn parse_left_right_count(stdout: &str) -> Result<(u32, u32)> {
    let mut columns = stdout.split_whitespace();
    let (Some(left), Some(right), None) = (columns.next(), columns.next(), columns.next()) else {
        return Err(SyncError::Git(format!(
            "Unexpected rev-list output: {:?}",
            stdout.trim()
        )));
    };

    let parse = |value: &str| {
        value.parse::<u32>().map_err(|_| {
            SyncError::Git(format!("Failed to parse commit count: {}", stdout.trim()))
        })
    };

    let behind = parse(left)?;
    let ahead = parse(right)?;
    Ok((ahead, behind))
}
