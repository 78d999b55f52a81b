use crate::cli::{validate_branch_name, validate_remote_url};
use crate::config::{load_config, resolve_entry_path, save_config, Entry};
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct AddOptions {
    pub remote: Option<String>,
    pub branch: String,
    pub commit_message: String,
    pub push: bool,
}

pub fn add_entry(raw_path: &str, options: AddOptions) -> Result<()> {
    validate_branch_name(&options.branch)?;
    if let Some(remote) = options.remote.as_deref() {
        validate_remote_url(remote)?;
    }

    let path = resolve_entry_path(raw_path)?;
    let mut entry = Entry::new(&path)
        .with_branch(options.branch)
        .with_commit_message(options.commit_message)
        .with_push(options.push);
    if let Some(remote) = options.remote {
        entry = entry.with_remote(remote);
    }

    let mut config = load_config()?;
    config.add_entry(entry)?;
    save_config(&config)?;

    println!("Added {}", path.display());
    Ok(())
}
