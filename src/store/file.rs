//! Flat-file codec for the ticket collection.
//!
//! The whole collection is persisted as a single JSON document:
//!
//! ```text
//! { "tickets": [ { "id": ..., "name": ..., "status": ..., "createdAt": ..., "redeemedAt": ... } ] }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

use super::error::PersistenceError;
use crate::model::Ticket;

/// The persisted document. Always read and written as a unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub tickets: Vec<Ticket>,
}

/// Read the document at `path`.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn read_document(path: &Path) -> Result<Option<Document>, PersistenceError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(PersistenceError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| PersistenceError::Json {
            path: path.to_path_buf(),
            source,
        })
}

/// Write the full document to `path`, creating parent directories as needed.
pub fn write_document(path: &Path, document: &Document) -> Result<(), PersistenceError> {
    let io_err = |source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let json = serde_json::to_string_pretty(document).map_err(|source| PersistenceError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    fs::write(path, json).map_err(io_err)
}
