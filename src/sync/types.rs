use std::path::PathBuf;

/// Where the decision procedure stopped for one entry.
///
/// Every variant is a normal result; hard failures are reported as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Push disabled for this entry or this run.
    LocalOnly { committed: bool },
    /// Push enabled but the repository has no `origin` remote.
    NoRemote { committed: bool },
    /// The remote could not be reached; retried on the next pass.
    Offline { committed: bool },
    FetchFailed,
    /// The rebase stopped and was aborted; a commit made before it stays local.
    RebaseFailed { committed: bool },
    /// Nothing ahead of the remote-tracking branch.
    UpToDate { committed: bool },
    Pushed { committed: bool, rebased: bool },
    PushFailed { committed: bool },
}

impl SyncOutcome {
    pub fn committed(&self) -> bool {
        match self {
            SyncOutcome::LocalOnly { committed }
            | SyncOutcome::NoRemote { committed }
            | SyncOutcome::Offline { committed }
            | SyncOutcome::UpToDate { committed }
            | SyncOutcome::RebaseFailed { committed }
            | SyncOutcome::PushFailed { committed }
            | SyncOutcome::Pushed { committed, .. } => *committed,
            SyncOutcome::FetchFailed => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOutcome::LocalOnly { .. } => "local-only",
            SyncOutcome::NoRemote { .. } => "no-remote",
            SyncOutcome::Offline { .. } => "offline",
            SyncOutcome::FetchFailed => "fetch-failed",
            SyncOutcome::RebaseFailed { .. } => "rebase-failed",
            SyncOutcome::UpToDate { .. } => "up-to-date",
            SyncOutcome::Pushed { .. } => "pushed",
            SyncOutcome::PushFailed { .. } => "push-failed",
        }
    }
}

impl std::fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of one entry within a pass.
#[derive(Debug)]
pub struct EntryReport {
    pub path: PathBuf,
    pub result: std::result::Result<SyncOutcome, String>,
}

/// Everything that happened during one sync-all pass, in entry order.
#[derive(Debug, Default)]
pub struct PassSummary {
    pub reports: Vec<EntryReport>,
}

impl PassSummary {
    pub fn attempted(&self) -> usize {
        self.reports.len()
    }

    pub fn failed(&self) -> usize {
        self.reports.iter().filter(|r| r.result.is_err()).count()
    }

    pub fn committed(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.result, Ok(outcome) if outcome.committed()))
            .count()
    }

    pub fn pushed(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.result, Ok(SyncOutcome::Pushed { .. })))
            .count()
    }
}
