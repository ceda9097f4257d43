//! Session store file I/O. One JSON file holds the full session set, the
//! current-session pointer, and a generation counter used to detect
//! concurrent external writes. Writes are atomic (temp file + rename).

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Session;
use crate::error::SessionError;

pub(crate) const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoreFile {
    pub schema_version: u32,
    pub generation: u64,
    pub current: Option<String>,
    pub sessions: BTreeMap<String, Session>,
}

impl Default for StoreFile {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            generation: 0,
            current: None,
            sessions: BTreeMap::new(),
        }
    }
}

/// Load the store, treating a missing file as an empty store.
pub(crate) fn load(path: &Path) -> Result<StoreFile, SessionError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(StoreFile::default());
        }
        Err(e) => {
            return Err(SessionError::Io {
                operation: "read",
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    let store: StoreFile = serde_json::from_str(&contents).map_err(|e| SessionError::Malformed {
        path: path.to_path_buf(),
        source: e,
    })?;
    if store.schema_version > SCHEMA_VERSION {
        return Err(SessionError::UnsupportedVersion {
            path: path.to_path_buf(),
            found: store.schema_version,
        });
    }
    Ok(store)
}

pub(crate) fn save(path: &Path, store: &StoreFile) -> Result<(), SessionError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| SessionError::Io {
                operation: "create directory for",
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }

    let serialized = serde_json::to_string_pretty(store).map_err(|e| SessionError::Malformed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let temp_path = path.with_extension("json.tmp");
    let mut file = fs::File::create(&temp_path).map_err(|e| SessionError::Io {
        operation: "create",
        path: temp_path.clone(),
        source: e,
    })?;
    file.write_all(serialized.as_bytes())
        .map_err(|e| SessionError::Io {
            operation: "write",
            path: temp_path.clone(),
            source: e,
        })?;
    file.sync_all().map_err(|e| SessionError::Io {
        operation: "sync",
        path: temp_path.clone(),
        source: e,
    })?;
    fs::rename(&temp_path, path).map_err(|e| SessionError::Io {
        operation: "replace",
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

/// Best-effort read of the on-disk generation for conflict detection.
pub(crate) fn disk_generation(path: &Path) -> Option<u64> {
    let contents = fs::read_to_string(path).ok()?;
    let store: StoreFile = serde_json::from_str(&contents).ok()?;
    Some(store.generation)
}
