use thiserror::Error;

use crate::quota::ReportError;
use crate::storage::StorageError;

/// Errors that abort a cycle. Notification failures never surface here.
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("quota report error: {0}")]
    Report(#[from] ReportError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
