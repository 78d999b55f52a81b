pub mod add;
pub mod config;
pub mod list;
pub mod remove;
pub mod run;
pub mod stop;
pub mod sync;

pub use add::{add_entry, AddOptions};
pub use config::handle_config_command;
pub use list::list_entries;
pub use remove::remove_entry;
pub use run::{run_sync_loop, RunOptions};
pub use stop::stop;
pub use sync::{run_sync_pass, sync_once};
