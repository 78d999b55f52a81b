use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "git-sync", version)]
#[command(
    about = "Keep tracked directories committed and pushed to their git remotes on a schedule"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Track a directory")]
    Add {
        #[arg(help = "Directory to sync")]
        path: String,

        #[arg(long, help = "Remote URL to push to")]
        remote: Option<String>,

        #[arg(long, default_value = "main", help = "Branch name")]
        branch: String,

        #[arg(long, default_value = "Auto-sync", help = "Base commit message")]
        commit_message: String,

        #[arg(long, help = "Do not push for this entry")]
        no_push: bool,
    },
    #[command(about = "Stop tracking a directory")]
    Remove {
        #[arg(help = "Directory to stop syncing")]
        path: String,
    },
    #[command(about = "List tracked directories")]
    List {
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    #[command(about = "Run one sync pass")]
    Sync {
        #[arg(long, help = "Disable pushes for this run")]
        no_push_all: bool,

        #[arg(long, help = "Lock file guarding against concurrent runs")]
        lock_file: Option<PathBuf>,
    },
    #[command(about = "Run the sync loop (for services)")]
    Run {
        #[arg(long, help = "Minutes between passes (default: config value)")]
        interval: Option<u64>,

        #[arg(long, help = "Disable pushes for this run")]
        no_push_all: bool,

        #[arg(long, help = "Run a single pass then exit")]
        once: bool,

        #[arg(long, help = "Detach and run in the background")]
        daemon: bool,

        #[arg(long, help = "Write the daemon's pid to this file")]
        pid_file: Option<PathBuf>,

        #[arg(long, help = "Append daemon output to this file")]
        log_file: Option<PathBuf>,

        #[arg(long, help = "Lock file guarding against concurrent runs")]
        lock_file: Option<PathBuf>,
    },
    #[command(about = "Stop a running daemon")]
    Stop {
        #[arg(long, help = "Pid file written by 'run --daemon'")]
        pid_file: Option<PathBuf>,
    },
    #[command(about = "Manage configuration")]
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    #[command(about = "Show current configuration values")]
    Show,
    #[command(about = "Show config file path")]
    Path,
}

impl Commands {
    /// `Some(false)` when pushes are disabled for the whole run.
    pub fn push_override(no_push_all: bool) -> Option<bool> {
        if no_push_all {
            Some(false)
        } else {
            None
        }
    }
}
