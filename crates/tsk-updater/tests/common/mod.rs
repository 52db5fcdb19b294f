//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use tempfile::TempDir;
use tsk_updater::{
    Extractor, Fetcher, InstallLayout, ReleaseAsset, ReleaseInfo, ReleaseLocator, Result,
    UpdateError, UpdateService, UpdaterConfig,
};

pub use tsk_updater::fs_ops::testing::{FaultyFs, Op};

pub const ARCHIVE: &str = "AutomaticUpdaterRelease.zip";

/// Installation root in a temporary directory, with Windows-style binary names.
pub struct Fixture {
    dir: TempDir,
    pub config: UpdaterConfig,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = UpdaterConfig {
            updater_binary: "updater.exe".to_string(),
            uninstaller_binary: "uninstall.exe".to_string(),
            executable_suffix: ".exe".to_string(),
            ..UpdaterConfig::for_root(dir.path())
        };
        Self { dir, config }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn layout(&self) -> InstallLayout {
        InstallLayout::new(&self.config)
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.root().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.root().join(relative)).unwrap()
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.root().join(relative).exists()
    }

    /// Installs `files` under `latest/`, both self-binaries and the marker.
    pub fn install(&self, version: &str, files: &[(&str, &str)]) {
        for (name, content) in files {
            self.write(&format!("latest/{name}"), content);
        }
        self.write("updater.exe", &format!("updater {version}"));
        self.write("uninstall.exe", &format!("uninstall {version}"));
        self.write("version", &format!("{version}\n"));
    }

    pub fn service(&self, release: &str, package: Package) -> UpdateService {
        UpdateService::with_collaborators(
            &self.config,
            Box::new(FakeRelease::new(release)),
            Box::new(FakeFetcher::default()),
            Box::new(package),
        )
    }

    /// Every file under the root with its content, keyed by relative path.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<u8>> {
        snapshot(self.root())
    }

    pub fn snapshot_of(&self, relative: &str) -> BTreeMap<String, Vec<u8>> {
        snapshot(&self.root().join(relative))
    }
}

pub fn snapshot(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut files = BTreeMap::new();
    if dir.is_dir() {
        collect(dir, dir, &mut files);
    }
    files
}

fn collect(base: &Path, dir: &Path, files: &mut BTreeMap<String, Vec<u8>>) {
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            collect(base, &path, files);
        } else {
            let relative = path.strip_prefix(base).unwrap();
            let key = relative.to_string_lossy().replace('\\', "/");
            files.insert(key, fs::read(&path).unwrap());
        }
    }
}

/// Latest release with a single package asset.
pub struct FakeRelease {
    tag: String,
}

impl FakeRelease {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
        }
    }
}

impl ReleaseLocator for FakeRelease {
    fn latest_release(&self) -> Result<ReleaseInfo> {
        Ok(ReleaseInfo {
            version_tag: self.tag.clone(),
            assets: vec![ReleaseAsset {
                name: ARCHIVE.to_string(),
                download_url: format!("https://example.com/{}/{ARCHIVE}", self.tag),
                digest: None,
                size: 0,
            }],
        })
    }
}

/// Writes a placeholder archive and counts its calls.
#[derive(Clone, Default)]
pub struct FakeFetcher {
    pub calls: Rc<Cell<usize>>,
    pub fail: bool,
}

impl Fetcher for FakeFetcher {
    fn fetch(&self, _asset: &ReleaseAsset, dest: &Path) -> Result<u64> {
        self.calls.set(self.calls.get() + 1);
        if self.fail {
            return Err(UpdateError::Fetch("connection reset".to_string()));
        }
        fs::write(dest, b"archive")?;
        Ok(7)
    }
}

/// Release package as the extractor lays it out in `update/`.
#[derive(Clone, Default)]
pub struct Package {
    files: Vec<(String, String)>,
    dirs: Vec<String>,
    pub extracted: Rc<Cell<bool>>,
}

impl Package {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an application file under `update/latest/`.
    pub fn app(mut self, name: &str, content: &str) -> Self {
        self.files
            .push((format!("latest/{name}"), content.to_string()));
        self
    }

    /// Creates `update/latest/` even when no application file is added.
    pub fn empty_app(mut self) -> Self {
        self.dirs.push("latest".to_string());
        self
    }

    /// Adds both self-binaries.
    pub fn binaries(mut self, version: &str) -> Self {
        self.files
            .push(("updater.exe".to_string(), format!("updater {version}")));
        self.files
            .push(("uninstall.exe".to_string(), format!("uninstall {version}")));
        self
    }

    pub fn app_file_count(&self) -> usize {
        self.files
            .iter()
            .filter(|(name, _)| name.starts_with("latest/"))
            .count()
    }
}

impl Extractor for Package {
    fn extract(&self, _archive: &Path, dest: &Path) -> Result<()> {
        self.extracted.set(true);
        for dir in &self.dirs {
            fs::create_dir_all(dest.join(dir))?;
        }
        for (name, content) in &self.files {
            let path = dest.join(name);
            fs::create_dir_all(path.parent().unwrap_or(dest))?;
            fs::write(path, content)?;
        }
        Ok(())
    }
}
