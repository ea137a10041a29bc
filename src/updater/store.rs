//! Persisted record of the last installed client version

use crate::error::AgentError;
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};

/// Version reported when no record has been written yet. Guaranteed older
/// than any published release.
pub const UNKNOWN_VERSION: &str = "0.0.0";

/// Single-value store holding the last version the agent recorded as
/// installed. The record is a bare version string in a plain-text file.
pub struct VersionStore {
    path: PathBuf,
}

impl VersionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the recorded version, falling back to [`UNKNOWN_VERSION`] when
    /// the record is missing, empty, or unreadable.
    pub fn read(&self) -> String {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let version = contents.trim();
                if version.is_empty() {
                    UNKNOWN_VERSION.to_string()
                } else {
                    version.to_string()
                }
            }
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to read version record {}: {}", self.path.display(), e);
                }
                UNKNOWN_VERSION.to_string()
            }
        }
    }

    /// Overwrite the recorded version.
    ///
    /// Writes a sibling temp file and renames it over the record, so a
    /// concurrent reader observes either the old or the new value.
    pub fn write(&self, version: &str) -> Result<(), AgentError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.storage_err(e))?;
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, version).map_err(|e| self.storage_err(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.storage_err(e))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn storage_err(&self, source: std::io::Error) -> AgentError {
        AgentError::Storage {
            path: self.path.clone(),
            source,
        }
    }
}
