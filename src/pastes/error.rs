use thiserror::Error;

use crate::models::ValidationError;
use crate::storage::StorageError;

/// Why a paste could not be served. Callers see the same not-found response
/// for all three; the distinction is kept for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReason {
    Absent,
    Expired,
    Exhausted,
}

impl NotFoundReason {
    pub fn as_str(self) -> &'static str {
        match self {
            NotFoundReason::Absent => "absent",
            NotFoundReason::Expired => "expired",
            NotFoundReason::Exhausted => "exhausted",
        }
    }
}

#[derive(Debug, Error)]
pub enum PasteError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("paste not found ({})", .0.as_str())]
    NotFound(NotFoundReason),
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
}

pub type PasteResult<T> = Result<T, PasteError>;
