use crate::cli::ConfigAction;
use crate::config::{get_config_path, get_data_dir, load_config};
use crate::error::Result;

pub fn handle_config_command(action: Option<ConfigAction>) -> Result<()> {
    match action {
        Some(ConfigAction::Path) => {
            println!("Config location: {}", get_config_path()?.display());
        }
        None | Some(ConfigAction::Show) => {
            let config_path = get_config_path()?;
            let config = load_config()?;
            println!("Config file: {}", config_path.display());
            println!("Data dir: {}", get_data_dir()?.display());
            println!();
            println!("Current configuration:");
            println!("  interval_minutes: {}", config.interval_minutes);
            println!("  network_host: {}", config.network_host);
            println!("  network_port: {}", config.network_port);
            println!("  git_timeout_secs: {}", config.git_timeout_secs);
            println!("  entries: {}", config.entries.len());
        }
    }
    Ok(())
}
