pub mod cli;
pub mod commands;
pub mod config;
pub mod daemon;
pub mod error;
pub mod git;
pub mod lock;
pub mod network;
pub mod runner;
pub mod sync;

pub use config::{
    get_config_path, get_data_dir, load_config, resolve_entry_path, save_config, Config, Entry,
    NetworkSettings,
};

pub use error::{Result, SyncError};

pub use git::{GitCli, GitOutput, Vcs};
pub use lock::LockFile;
pub use network::{Probe, RemoteTarget, TcpProbe};
pub use runner::{LoopSettings, Shutdown};
pub use sync::{PassSummary, SyncOutcome, Syncer};
