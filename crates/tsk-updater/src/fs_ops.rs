//! Filesystem seam used by every mutating step of a transaction.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::Path;

/// The filesystem operations a transaction performs.
///
/// Rotation, payload apply, binary swap, recovery and cleanup all go through
/// this trait so a fault can be injected at any single step.
pub trait FileSystem {
    /// Renames `from` to `to`. Never copies.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Creates a directory and any missing parents.
    fn create_dir(&self, path: &Path) -> io::Result<()>;

    /// Removes a single file.
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Removes a directory tree.
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Lists the entry names of a directory, sorted.
    fn read_dir_names(&self, path: &Path) -> io::Result<Vec<OsString>>;

    /// Returns whether anything exists at `path`.
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    /// Returns whether `path` is a directory.
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    /// Returns whether `path` is a directory with at least one entry.
    fn has_entries(&self, path: &Path) -> bool {
        self.read_dir_names(path).is_ok_and(|names| !names.is_empty())
    }
}

/// [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path)
    }

    fn read_dir_names(&self, path: &Path) -> io::Result<Vec<OsString>> {
        let mut names = fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.file_name()))
            .collect::<io::Result<Vec<_>>>()?;
        names.sort();
        Ok(names)
    }
}

/// Fault injection for tests, also available to dependents through the
/// `test-util` feature.
#[cfg(any(test, feature = "test-util"))]
pub mod testing {
    use std::cell::RefCell;
    use std::path::PathBuf;

    use super::{FileSystem, OsString, Path, StdFileSystem, io};

    /// Operation a fault applies to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Op {
        /// [`FileSystem::rename`], matched on source and target.
        Rename,
        /// [`FileSystem::create_dir`]
        CreateDir,
        /// [`FileSystem::remove_file`]
        RemoveFile,
        /// [`FileSystem::remove_dir_all`]
        RemoveDirAll,
    }

    struct Fault {
        op: Op,
        dir: PathBuf,
        skip: usize,
    }

    /// Real filesystem that fails chosen operations touching a directory.
    #[derive(Default)]
    pub struct FaultyFs {
        faults: RefCell<Vec<Fault>>,
    }

    impl FaultyFs {
        /// Fails the `op` whose path (or rename source/target) lies directly in
        /// `dir` or is `dir` itself, after letting `skip` matching calls through.
        pub fn fail(self, op: Op, dir: impl Into<PathBuf>, skip: usize) -> Self {
            self.faults.borrow_mut().push(Fault {
                op,
                dir: dir.into(),
                skip,
            });
            self
        }

        /// Each fault fires once, then is removed.
        fn check(&self, op: Op, paths: &[&Path]) -> io::Result<()> {
            let mut faults = self.faults.borrow_mut();
            let mut fired = None;
            for (index, fault) in faults.iter_mut().enumerate() {
                let hit = fault.op == op
                    && paths
                        .iter()
                        .any(|p| *p == fault.dir || p.parent() == Some(fault.dir.as_path()));
                if !hit {
                    continue;
                }
                if fault.skip == 0 {
                    fired = Some(index);
                    break;
                }
                fault.skip -= 1;
            }
            match fired {
                Some(index) => {
                    faults.remove(index);
                    Err(io::Error::other(format!("injected {op:?} fault")))
                }
                None => Ok(()),
            }
        }
    }

    impl FileSystem for FaultyFs {
        fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
            self.check(Op::Rename, &[from, to])?;
            StdFileSystem.rename(from, to)
        }

        fn create_dir(&self, path: &Path) -> io::Result<()> {
            self.check(Op::CreateDir, &[path])?;
            StdFileSystem.create_dir(path)
        }

        fn remove_file(&self, path: &Path) -> io::Result<()> {
            self.check(Op::RemoveFile, &[path])?;
            StdFileSystem.remove_file(path)
        }

        fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
            self.check(Op::RemoveDirAll, &[path])?;
            StdFileSystem.remove_dir_all(path)
        }

        fn read_dir_names(&self, path: &Path) -> io::Result<Vec<OsString>> {
            StdFileSystem.read_dir_names(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_dir_names_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::create_dir(dir.path().join("c")).unwrap();

        let names = StdFileSystem.read_dir_names(dir.path()).unwrap();
        assert_eq!(names, vec!["a.txt", "b.txt", "c"]);
    }

    #[test]
    fn test_has_entries() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!StdFileSystem.has_entries(dir.path()));
        assert!(!StdFileSystem.has_entries(&dir.path().join("missing")));

        fs::write(dir.path().join("file"), "x").unwrap();
        assert!(StdFileSystem.has_entries(dir.path()));
    }
}
