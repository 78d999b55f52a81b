use crate::config::default_pid_path;
use crate::daemon::{stop_daemon, StopReport};
use crate::error::Result;
use std::path::PathBuf;

/// Signal the daemon recorded in `pid_file` (or the default pid file).
pub fn stop(pid_file: Option<PathBuf>) -> Result<StopReport> {
    let pid_file = match pid_file {
        Some(path) => path,
        None => default_pid_path()?,
    };

    let report = stop_daemon(&pid_file);
    if report.is_success() {
        println!("{}", report);
    } else {
        eprintln!("{}", report);
    }
    Ok(report)
}
