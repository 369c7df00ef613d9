//! Error types for ticket store operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::model::TicketId;

/// Top-level error returned by [`TicketStore`](super::TicketStore) operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("ticket {0} not found")]
    NotFound(TicketId),

    #[error("persistence failed: {0}")]
    Persistence(#[from] PersistenceError),
}

/// A required field was missing or blank.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("name is required")]
    BlankName,
}

/// Failure reading or writing the backing file.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("{path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("{path}: malformed ticket document: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}
