//! Scratch directory holding the declared state marker

use galera_sidecar::state_file::StateFile;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct StateDir {
    dir: TempDir,
}

impl StateDir {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn marker_path(&self) -> PathBuf {
        self.dir.path().join("state.txt")
    }

    pub fn state_file(&self) -> StateFile {
        StateFile::new(self.marker_path())
    }

    /// A state file whose parent directory does not exist, so writes fail
    pub fn unwritable_state_file(&self) -> StateFile {
        StateFile::new(self.dir.path().join("missing").join("state.txt"))
    }

    /// Marker content, or `None` if it was never written
    pub fn read_marker(&self) -> Option<String> {
        std::fs::read_to_string(self.marker_path()).ok()
    }

    pub fn is_empty(&self) -> bool {
        std::fs::read_dir(self.dir.path())
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(true)
    }
}

impl Default for StateDir {
    fn default() -> Self {
        Self::new()
    }
}
