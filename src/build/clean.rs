//! Artifact removal.
//!
//! Removal is best-effort: every path is attempted, a path that is already
//! gone is recorded as such rather than failing, and real failures are
//! collected for the caller to report.

use crate::error::CmError;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    AlreadyRemoved,
    /// Left in place on purpose (a directory that still has user files).
    Kept,
}

#[derive(Debug, Default)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    pub already_removed: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, io::Error)>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn record(&mut self, path: &Path, result: io::Result<Removal>) {
        match result {
            Ok(Removal::Removed) => self.removed.push(path.to_path_buf()),
            Ok(Removal::AlreadyRemoved) => self.already_removed.push(path.to_path_buf()),
            Ok(Removal::Kept) => {}
            Err(e) => self.failed.push((path.to_path_buf(), e)),
        }
    }

    /// `Err(CmError::Cleanup)` naming every path that could not be removed.
    pub fn into_result(self) -> Result<Self, CmError> {
        if self.failed.is_empty() {
            Ok(self)
        } else {
            Err(CmError::Cleanup(
                self.failed.into_iter().map(|(path, _)| path).collect(),
            ))
        }
    }
}

pub fn remove_file(path: &Path) -> io::Result<Removal> {
    match fs::remove_file(path) {
        Ok(()) => Ok(Removal::Removed),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Removal::AlreadyRemoved),
        Err(e) => Err(e),
    }
}

/// Remove `dir` only if it is empty; a non-empty directory is left alone.
pub fn remove_empty_dir(dir: &Path) -> io::Result<Removal> {
    match fs::read_dir(dir) {
        Ok(mut entries) => {
            if entries.next().is_some() {
                return Ok(Removal::Kept);
            }
        }
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Removal::AlreadyRemoved),
        Err(e) => return Err(e),
    }
    fs::remove_dir(dir).map(|_| Removal::Removed)
}

/// Attempt every removal in `paths`, in order.
pub fn remove_all<'a>(paths: impl IntoIterator<Item = &'a Path>) -> CleanupReport {
    let mut report = CleanupReport::default();
    for path in paths {
        report.record(path, remove_file(path));
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_twice_reports_already_removed() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("catch.hpp");
        fs::write(&file, "x").unwrap();

        assert_eq!(remove_file(&file).unwrap(), Removal::Removed);
        assert_eq!(remove_file(&file).unwrap(), Removal::AlreadyRemoved);
    }

    #[test]
    fn test_remove_all_attempts_every_path() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let blocked = dir.path().join("sub");
        let c = dir.path().join("c");
        fs::write(&a, "").unwrap();
        // a non-empty directory cannot be removed with remove_file
        fs::create_dir(&blocked).unwrap();
        fs::write(blocked.join("keep"), "").unwrap();
        fs::write(&c, "").unwrap();

        let report = remove_all([a.as_path(), blocked.as_path(), c.as_path()]);
        assert_eq!(report.removed, vec![a.clone(), c.clone()]);
        assert_eq!(report.failed.len(), 1);
        assert!(!c.exists());

        let err = report.into_result().unwrap_err();
        assert!(matches!(err, CmError::Cleanup(paths) if paths == vec![blocked.clone()]));
    }

    #[test]
    fn test_remove_empty_dir_keeps_user_files() {
        let dir = tempfile::tempdir().unwrap();
        let tests = dir.path().join("tests");
        fs::create_dir(&tests).unwrap();
        fs::write(tests.join("user_test.cpp"), "").unwrap();
        assert_eq!(remove_empty_dir(&tests).unwrap(), Removal::Kept);
        assert!(tests.exists());

        fs::remove_file(tests.join("user_test.cpp")).unwrap();
        assert_eq!(remove_empty_dir(&tests).unwrap(), Removal::Removed);
        assert!(!tests.exists());
    }
}
