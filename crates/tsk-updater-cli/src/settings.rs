//! Resolution of the install root and the updater configuration.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tsk_updater::UpdaterConfig;
use tsk_updater::config::CONFIG_FILE_NAME;

/// Directory containing the running executable.
///
/// The updater ships next to `latest/`, so this is the default install root.
pub fn executable_dir() -> Result<PathBuf> {
    let exe = env::current_exe().context("cannot determine the updater's own path")?;
    exe.parent()
        .map(Path::to_path_buf)
        .with_context(|| format!("{} has no parent directory", exe.display()))
}

/// Builds the configuration from the command-line overrides.
///
/// The config file is `config` if given, else `updater.json` in the root when
/// it exists. A relative `install_root` in the file is taken relative to the
/// file; `root` overrides it.
pub fn resolve_config(root: Option<&Path>, config: Option<&Path>) -> Result<UpdaterConfig> {
    let base = match root {
        Some(root) => root.to_path_buf(),
        None => executable_dir()?,
    };

    let config_path = match config {
        Some(path) => Some(path.to_path_buf()),
        None => Some(base.join(CONFIG_FILE_NAME)).filter(|path| path.is_file()),
    };

    let Some(path) = config_path else {
        tracing::debug!("No config file, using defaults for {}", base.display());
        return Ok(UpdaterConfig::for_root(base));
    };

    let mut loaded = UpdaterConfig::from_file(&path)
        .with_context(|| format!("invalid configuration {}", path.display()))?;
    tracing::debug!("Loaded configuration from {}", path.display());

    loaded.install_root = match root {
        Some(root) => root.to_path_buf(),
        None => {
            let file_dir = path.parent().unwrap_or(Path::new("."));
            file_dir.join(&loaded.install_root)
        }
    };
    Ok(loaded)
}
