//! Durable single-slot session persistence.
//!
//! Exactly one serialized `UserRecord` (or nothing) lives under a fixed
//! path, surviving process restarts. The one behavioral subtlety is the
//! recovery rule: a value that no longer deserializes is treated as
//! absent, never as a fatal error, so corrupt state can't brick startup.

use crate::error::{ClientError, Result};
use crate::record::UserRecord;
use std::fs;
use std::path::{Path, PathBuf};

/// File-backed store holding at most one session record.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Store backed by the given file path. The parent directory is
    /// created lazily on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted record, if any. A missing file is absence; an
    /// unreadable file is a `StorageRead` error; a file that fails to
    /// deserialize is logged and treated as absence.
    pub fn load(&self) -> Result<Option<UserRecord>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ClientError::StorageRead(e.to_string())),
        };

        match serde_json::from_str::<UserRecord>(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "persisted session is corrupt, treating as signed out"
                );
                Ok(None)
            }
        }
    }

    /// Persist the record, replacing any previous one.
    pub fn save(&self, record: &UserRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| ClientError::StorageWrite(e.to_string()))?;
            }
        }

        let json = serde_json::to_string(record)
            .map_err(|e| ClientError::StorageWrite(e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| ClientError::StorageWrite(e.to_string()))
    }

    /// Remove the persisted record. Absence is not an error.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ClientError::StorageWrite(e.to_string())),
        }
    }
}
