use std::io;

use rusqlite;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    IoError(#[from] io::Error),
    #[error("connection poisoned")]
    ConnectionPoisoned,
    #[error("user {0} not found")]
    UnknownUser(String),
    #[error("another cycle holds the run lease ({holder}, acquired at {acquired_at})")]
    LeaseHeld { holder: String, acquired_at: String },
}
