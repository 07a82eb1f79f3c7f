//! Declared state marker persistence.
//!
//! The marker is a single token the database's startup scripts read on their
//! next launch to decide between bootstrapping, joining, or running alone.
//! Only the orchestrator writes it, always as a whole-file replace.

use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::intent::DeclaredState;

/// The startup scripts run as a different user than the sidecar.
#[cfg(unix)]
const STATE_FILE_MODE: u32 = 0o777;

#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically replace the marker with `state`.
    ///
    /// The token is written to a temp file beside the target and renamed over
    /// it, so readers observe either the old or the new token. The parent
    /// directory must already exist and be writable by the sidecar. The
    /// rename replaces the file itself, so after a write the marker is owned
    /// by the sidecar's user regardless of who owned the previous one.
    pub fn write(&self, state: DeclaredState) -> std::io::Result<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(STATE_FILE_MODE))?;
        }

        tmp.write_all(state.as_str().as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        debug!("Wrote declared state {} to {:?}", state, self.path);
        Ok(())
    }
}
