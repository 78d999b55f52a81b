use clap::Parser;

use git_sync::cli::{Args, Commands};
use git_sync::commands::{self, AddOptions, RunOptions};
use git_sync::error;

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

// Synchronous on purpose: `run --daemon` forks before any runtime threads exist.
fn run() -> error::Result<i32> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("GIT_SYNC_LOG").unwrap_or_else(|_| "info".to_string()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Add {
            path,
            remote,
            branch,
            commit_message,
            no_push,
        } => {
            commands::add_entry(
                &path,
                AddOptions {
                    remote,
                    branch,
                    commit_message,
                    push: !no_push,
                },
            )?;
            Ok(0)
        }
        Commands::Remove { path } => {
            commands::remove_entry(&path)?;
            Ok(0)
        }
        Commands::List { json } => {
            commands::list_entries(json)?;
            Ok(0)
        }
        Commands::Sync {
            no_push_all,
            lock_file,
        } => {
            commands::run_sync_pass(Commands::push_override(no_push_all), lock_file)?;
            Ok(0)
        }
        Commands::Run {
            interval,
            no_push_all,
            once,
            daemon,
            pid_file,
            log_file,
            lock_file,
        } => {
            commands::run_sync_loop(RunOptions {
                interval,
                push_override: Commands::push_override(no_push_all),
                once,
                daemon,
                pid_file,
                log_file,
                lock_file,
            })?;
            Ok(0)
        }
        Commands::Stop { pid_file } => {
            let report = commands::stop(pid_file)?;
            Ok(if report.is_success() { 0 } else { 1 })
        }
        Commands::Config { action } => {
            commands::handle_config_command(action)?;
            Ok(0)
        }
    }
}
