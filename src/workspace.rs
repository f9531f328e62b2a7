//! Snapshot-based recovery for the working directory.
//!
//! The set of entry names is recorded once when the transaction opens. On
//! rollback every entry that was not in that set is deleted. Entries that
//! existed at snapshot time are never touched, so content changes to them are
//! not reverted. Running two transactions against one directory at the same
//! time is undefined: each would delete the other's output.

use std::collections::BTreeSet;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{Builder, TempPath};
use tracing::{debug, info, warn};

use crate::error::Result;

/// Name prefix of scratch files created inside the workspace
pub const SCRATCH_PREFIX: &str = ".cuetag-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Snapshot taken, nothing written yet
    Open,
    Running,
    Committed,
    RolledBack,
}

pub struct WorkspaceTransaction {
    dir: PathBuf,
    snapshot: BTreeSet<OsString>,
    scratch: Vec<TempPath>,
    state: TransactionState,
}

impl WorkspaceTransaction {
    /// Snapshot `dir`. Must happen before anything in it is modified.
    pub fn open(dir: &Path) -> Result<Self> {
        let snapshot = Self::list_entries(dir)?;
        info!(
            "Workspace snapshot of {} holds {} entries",
            dir.display(),
            snapshot.len()
        );
        Ok(Self {
            dir: dir.to_path_buf(),
            snapshot,
            scratch: Vec::new(),
            state: TransactionState::Open,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn snapshot(&self) -> &BTreeSet<OsString> {
        &self.snapshot
    }

    /// Mark the start of mutations
    pub fn begin(&mut self) {
        if self.state == TransactionState::Open {
            self.state = TransactionState::Running;
        }
    }

    /// Whether an entry name appeared after the snapshot
    pub fn is_new(&self, name: &OsStr) -> bool {
        !self.snapshot.contains(name)
    }

    /// Write a scratch file into the workspace. Scratch files are removed on
    /// commit and, like every other new entry, on rollback.
    pub fn create_scratch(&mut self, suffix: &str, contents: &str) -> Result<PathBuf> {
        self.begin();

        let mut file = Builder::new()
            .prefix(SCRATCH_PREFIX)
            .suffix(suffix)
            .tempfile_in(&self.dir)?;
        file.write_all(contents.as_bytes())?;
        file.flush()?;

        let temp_path = file.into_temp_path();
        let path = temp_path.to_path_buf();
        debug!("Created scratch file {}", path.display());
        self.scratch.push(temp_path);
        Ok(path)
    }

    /// Finish successfully: only scratch files are removed
    pub fn commit(mut self) {
        for temp_path in self.scratch.drain(..) {
            let name = temp_path.display().to_string();
            match temp_path.close() {
                Ok(()) => debug!("Removed scratch file {}", name),
                Err(e) => warn!("Failed to remove scratch file {}: {}", name, e),
            }
        }
        self.state = TransactionState::Committed;
        info!("Workspace transaction committed");
    }

    /// Delete every entry that is not part of the snapshot. Returns the
    /// paths that were removed.
    pub fn rollback(mut self) -> Vec<PathBuf> {
        self.rollback_in_place()
    }

    fn rollback_in_place(&mut self) -> Vec<PathBuf> {
        self.state = TransactionState::RolledBack;

        let current = match Self::list_entries(&self.dir) {
            Ok(current) => current,
            Err(e) => {
                warn!("Cannot list {} for rollback: {}", self.dir.display(), e);
                return Vec::new();
            }
        };

        let mut removed = Vec::new();
        for name in current.difference(&self.snapshot) {
            let path = self.dir.join(name);
            info!("deleting {}", path.display());

            let is_dir = fs::symlink_metadata(&path)
                .map(|meta| meta.is_dir())
                .unwrap_or(false);
            let result = if is_dir {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };

            match result {
                Ok(()) => removed.push(path),
                Err(e) => warn!("Failed to delete {}: {}", path.display(), e),
            }
        }

        // Already gone from disk, dropping them is a no-op
        self.scratch.clear();
        removed
    }

    fn list_entries(dir: &Path) -> Result<BTreeSet<OsString>> {
        let mut names = BTreeSet::new();
        for entry in fs::read_dir(dir)? {
            names.insert(entry?.file_name());
        }
        Ok(names)
    }
}

impl Drop for WorkspaceTransaction {
    fn drop(&mut self) {
        if self.state == TransactionState::Running {
            warn!("Workspace transaction dropped before commit, rolling back");
            self.rollback_in_place();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn seeded_dir() -> TempDir {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(temp_dir.path().join("a.cue"), "PERFORMER \"A\"\n").unwrap();
        fs::write(temp_dir.path().join("b.flac"), b"fLaC").unwrap();
        temp_dir
    }

    #[test]
    fn test_rollback_restores_snapshot() {
        let temp_dir = seeded_dir();
        let mut txn = WorkspaceTransaction::open(temp_dir.path()).unwrap();
        assert_eq!(txn.state(), TransactionState::Open);

        txn.begin();
        fs::write(temp_dir.path().join("c.tmp"), "c").unwrap();
        fs::write(temp_dir.path().join("d.tmp"), "d").unwrap();
        fs::create_dir(temp_dir.path().join("nested")).unwrap();
        fs::write(temp_dir.path().join("nested/e.tmp"), "e").unwrap();

        let removed = txn.rollback();

        assert_eq!(removed.len(), 3);
        assert_eq!(names(temp_dir.path()), vec!["a.cue", "b.flac"]);
    }

    #[test]
    fn test_rollback_keeps_modified_existing_files() {
        let temp_dir = seeded_dir();
        let mut txn = WorkspaceTransaction::open(temp_dir.path()).unwrap();
        txn.begin();
        fs::write(temp_dir.path().join("b.flac"), b"changed").unwrap();

        txn.rollback();

        assert_eq!(fs::read(temp_dir.path().join("b.flac")).unwrap(), b"changed");
    }

    #[test]
    fn test_commit_removes_only_scratch_files() {
        let temp_dir = seeded_dir();
        let mut txn = WorkspaceTransaction::open(temp_dir.path()).unwrap();

        let scratch = txn.create_scratch(".cue", "FILE \"b.flac\" WAVE\n").unwrap();
        assert_eq!(txn.state(), TransactionState::Running);
        assert!(scratch.exists());
        assert!(txn.is_new(scratch.file_name().unwrap()));
        assert!(!txn.is_new(OsStr::new("a.cue")));

        fs::write(temp_dir.path().join("Intro.mp3"), b"ID3").unwrap();
        txn.commit();

        assert!(!scratch.exists());
        assert_eq!(names(temp_dir.path()), vec!["Intro.mp3", "a.cue", "b.flac"]);
    }

    #[test]
    fn test_drop_while_running_rolls_back() {
        let temp_dir = seeded_dir();
        {
            let mut txn = WorkspaceTransaction::open(temp_dir.path()).unwrap();
            txn.create_scratch(".cue", "x").unwrap();
            fs::write(temp_dir.path().join("split-track01.flac"), b"x").unwrap();
        }
        assert_eq!(names(temp_dir.path()), vec!["a.cue", "b.flac"]);
    }

    #[test]
    fn test_snapshot_is_taken_at_open() {
        let temp_dir = seeded_dir();
        let txn = WorkspaceTransaction::open(temp_dir.path()).unwrap();
        fs::write(temp_dir.path().join("late.txt"), "x").unwrap();

        assert_eq!(txn.snapshot().len(), 2);
        assert!(txn.is_new(OsStr::new("late.txt")));
    }
}
