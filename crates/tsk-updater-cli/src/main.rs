//! TechnicalSketcher updater CLI.

use std::io::{self, IsTerminal};

use clap::{ColorChoice, Parser};
use tracing::level_filters::LevelFilter;
use tsk_updater_cli::logging::{LogConfig, LogFormat, init_logging};
use tsk_updater_cli::settings::resolve_config;

mod cli;
mod commands;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use crate::commands::{run_cleanup, run_status, run_update};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }

    let result = resolve_config(cli.root.as_deref(), cli.config.as_deref()).and_then(|config| {
        match cli.command.unwrap_or(Command::Run) {
            Command::Run => run_update(&config),
            Command::Cleanup => run_cleanup(&config),
            Command::Status => run_status(&config),
        }
    });
    let exit_code = match result {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file.clone_from(&cli.log_file);
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_is_default_command() {
        let cli = Cli::parse_from(["tsk-updater", "--root", "/opt/tsk"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.root.as_deref(), Some(std::path::Path::new("/opt/tsk")));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["tsk-updater", "status", "--config", "cfg.json", "-v"]);
        assert_eq!(cli.command, Some(Command::Status));
        assert!(cli.config.is_some());
        assert_eq!(log_config_from_cli(&cli).level_filter, LevelFilter::INFO);
    }

    #[test]
    fn test_log_level_overrides_env() {
        let cli = Cli::parse_from(["tsk-updater", "--log-level", "debug", "--log-format", "json"]);
        let config = log_config_from_cli(&cli);
        assert_eq!(config.level_filter, LevelFilter::DEBUG);
        assert!(!config.use_env_filter);
        assert_eq!(config.format, LogFormat::Json);
    }
}
