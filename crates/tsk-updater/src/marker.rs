//! Installed version marker.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Result, UpdateError};

/// The `version` file: its first line is the installed release tag.
#[derive(Debug, Clone)]
pub struct VersionMarker {
    path: PathBuf,
}

impl VersionMarker {
    /// Marker stored at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the marker file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the installed tag. A missing or blank file means nothing is installed.
    pub fn read(&self) -> Result<Option<String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(UpdateError::Io(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };

        let tag = content.lines().next().unwrap_or_default().trim();
        Ok((!tag.is_empty()).then(|| tag.to_string()))
    }

    /// Replaces the marker with `tag`.
    ///
    /// Writes a sibling temp file and renames it over the marker, so a reader
    /// sees either the old tag or the new one.
    pub fn write(&self, tag: &str) -> Result<()> {
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, format!("{}\n", tag.trim()))
            .map_err(|e| UpdateError::Io(format!("failed to write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            UpdateError::Io(format!("failed to replace {}: {e}", self.path.display()))
        })?;
        tracing::info!("Installed version is now {}", tag.trim());
        Ok(())
    }
}
