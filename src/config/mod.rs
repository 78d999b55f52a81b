pub mod paths;
pub mod persistence;
pub mod schema;

pub use paths::*;
pub use persistence::*;
pub use schema::*;

fn default_branch() -> String {
    "main".to_string()
}

fn default_push() -> bool {
    true
}

fn default_commit_message() -> String {
    "Auto-sync".to_string()
}

fn default_interval_minutes() -> u64 {
    DEFAULT_INTERVAL_MINUTES
}

fn default_network_host() -> String {
    DEFAULT_NETWORK_HOST.to_string()
}

fn default_network_port() -> u16 {
    DEFAULT_NETWORK_PORT
}

fn default_git_timeout_secs() -> u64 {
    DEFAULT_GIT_TIMEOUT_SECS
}
