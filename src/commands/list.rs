use crate::config::{load_config, Entry};
use crate::error::Result;

/// One-line summary: `- <path> (remote=<url>, branch=<b>, push|no-push)`.
pub fn format_entry(entry: &Entry) -> String {
    let mut flags = Vec::with_capacity(3);
    if let Some(remote) = &entry.remote {
        flags.push(format!("remote={}", remote));
    }
    flags.push(format!("branch={}", entry.branch));
    flags.push(if entry.push { "push" } else { "no-push" }.to_string());
    format!("- {} ({})", entry.path.display(), flags.join(", "))
}

pub fn list_entries(json: bool) -> Result<()> {
    let config = load_config()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config.entries)?);
        return Ok(());
    }

    if config.entries.is_empty() {
        println!("No tracked paths yet. Use add <path> to start.");
        return Ok(());
    }

    for entry in &config.entries {
        println!("{}", format_entry(entry));
    }
    Ok(())
}
