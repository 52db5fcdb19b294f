//! Subcommand implementations.

use anyhow::Result;
use tsk_updater::{RunOutcome, UpdateError, UpdateService, UpdaterConfig};
use tsk_updater_cli::summary::{print_cleanup, print_run, status_table};

/// Runs one update and returns the process exit code.
pub fn run_update(config: &UpdaterConfig) -> Result<i32> {
    let service = UpdateService::new(config)?;
    let report = service.run();
    print_run(&report);
    Ok(report.outcome.exit_code())
}

pub fn run_cleanup(config: &UpdaterConfig) -> Result<i32> {
    let service = UpdateService::new(config)?;
    match service.cleanup() {
        Ok(report) => {
            print_cleanup(&report);
            Ok(if report.is_clean() { 0 } else { 1 })
        }
        Err(error @ UpdateError::LockContention { .. }) => {
            eprintln!("error: {}", error.user_message());
            Ok(RunOutcome::AnotherInstanceRunning.exit_code())
        }
        Err(error) => Err(error.into()),
    }
}

pub fn run_status(config: &UpdaterConfig) -> Result<i32> {
    let service = UpdateService::new(config)?;
    let installed = service.installed_version()?;
    let last = service.last_status()?;
    println!("Install root: {}", service.layout().root().display());
    println!("{}", status_table(installed.as_deref(), last.as_ref()));
    Ok(0)
}
