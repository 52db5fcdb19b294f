//! Unpacking the release package into the staging area.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use flate2::read::GzDecoder;
use tar::Archive;

use crate::error::{Result, UpdateError};

/// Unpacks a downloaded archive.
pub trait Extractor {
    /// Unpacks `archive` into `dest`, replacing anything already there.
    fn extract(&self, archive: &Path, dest: &Path) -> Result<()>;
}

/// Archive type for extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveType {
    /// tar.gz archive
    TarGz,
    /// ZIP archive
    Zip,
}

impl ArchiveType {
    /// Get a human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::TarGz => "tar.gz",
            Self::Zip => "ZIP",
        }
    }
}

impl std::fmt::Display for ArchiveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Detects the archive type from the file name.
#[must_use]
pub fn detect_archive_type(name: &str) -> Option<ArchiveType> {
    let name_lower = name.to_lowercase();

    if name_lower.ends_with(".tar.gz") || name_lower.ends_with(".tgz") {
        Some(ArchiveType::TarGz)
    } else if name_lower.ends_with(".zip") {
        Some(ArchiveType::Zip)
    } else {
        None
    }
}

/// [`Extractor`] for ZIP and tar.gz packages.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveExtractor;

impl Extractor for ArchiveExtractor {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        let name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let archive_type = detect_archive_type(&name)
            .ok_or_else(|| UpdateError::Extract(format!("unsupported archive type: {name}")))?;

        if dest.exists() {
            tracing::debug!("Removing stale staging directory {}", dest.display());
            fs::remove_dir_all(dest).map_err(|e| {
                UpdateError::Extract(format!("failed to clear {}: {e}", dest.display()))
            })?;
        }
        fs::create_dir_all(dest)
            .map_err(|e| UpdateError::Extract(format!("failed to create {}: {e}", dest.display())))?;

        tracing::info!("Extracting {archive_type} archive {name} into {}", dest.display());
        match archive_type {
            ArchiveType::Zip => extract_zip(archive, dest),
            ArchiveType::TarGz => extract_tar_gz(archive, dest),
        }
    }
}

fn open(archive: &Path) -> Result<BufReader<File>> {
    File::open(archive)
        .map(BufReader::new)
        .map_err(|e| UpdateError::Extract(format!("failed to open {}: {e}", archive.display())))
}

fn extract_zip(archive: &Path, dest: &Path) -> Result<()> {
    let mut zip = zip::ZipArchive::new(open(archive)?)?;
    tracing::debug!("ZIP archive has {} entries", zip.len());
    zip.extract(dest)?;
    Ok(())
}

fn extract_tar_gz(archive: &Path, dest: &Path) -> Result<()> {
    let decoder = GzDecoder::new(open(archive)?);
    Archive::new(decoder)
        .unpack(dest)
        .map_err(|e| UpdateError::Extract(format!("failed to unpack tar.gz: {e}")))
}
