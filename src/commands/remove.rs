use crate::config::{load_config, resolve_entry_path, save_config};
use crate::error::Result;

pub fn remove_entry(raw_path: &str) -> Result<()> {
    let path = resolve_entry_path(raw_path)?;
    let mut config = load_config()?;
    let removed = config.remove_entry(&path)?;
    save_config(&config)?;

    println!("Removed {}", removed.path.display());
    Ok(())
}
